//!
//! flatcms binary
//! --------------
//! `flatcms serve` runs the HTTP server; `flatcms hash-password` prints a
//! credential-file line for a new password.

use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use flatcms::config::{Cli, Command, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))?;
    fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    match cli.command {
        Command::Serve(args) => {
            let config = ServerConfig::from(args);
            let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "<unset>".to_string());
            info!(target: "flatcms", "flatcms starting: RUST_LOG='{}', addr={}", rust_log, config.socket_addr());
            flatcms::server::run(config).await
        }
        Command::HashPassword { user, password } => {
            let phc = flatcms::credentials::hash_password(&password)?;
            println!("{}: \"{}\"", user, phc);
            Ok(())
        }
    }
}
