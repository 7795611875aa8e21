//! Runtime configuration.
//!
//! Every value can come from a command-line flag or an environment variable;
//! flags win over the environment, which wins over the built-in default. The
//! resolved [`ServerConfig`] is handed to each component at construction.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

pub const DEFAULT_PORT: u16 = 4567;
pub const DEFAULT_COOKIE: &str = "flatcms_session";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind: IpAddr,
    pub port: u16,
    /// Directory holding the documents.
    pub data_dir: PathBuf,
    /// YAML file mapping usernames to password hashes.
    pub credentials_path: PathBuf,
    pub session_ttl: Duration,
    pub cookie_name: String,
    pub secure_cookies: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            data_dir: PathBuf::from("data"),
            credentials_path: PathBuf::from("users.yaml"),
            session_ttl: Duration::from_secs(3600),
            cookie_name: DEFAULT_COOKIE.to_string(),
            secure_cookies: false,
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> SocketAddr { SocketAddr::new(self.bind, self.port) }
}

#[derive(Debug, Parser)]
#[command(name = "flatcms", version, about = "Flat-file markdown/text CMS")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP server.
    Serve(ServeArgs),
    /// Print an Argon2 hash for a password, ready to paste into the credential file.
    HashPassword {
        /// Username to prefix the output line with.
        #[arg(long, default_value = "admin")]
        user: String,
        password: String,
    },
}

#[derive(Debug, Clone, Args)]
pub struct ServeArgs {
    /// Address to bind.
    #[arg(long, env = "FLATCMS_BIND", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub bind: IpAddr,
    #[arg(long, env = "FLATCMS_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,
    #[arg(long, env = "FLATCMS_DATA_DIR", default_value = "data")]
    pub data_dir: PathBuf,
    #[arg(long, env = "FLATCMS_CREDENTIALS", default_value = "users.yaml")]
    pub credentials: PathBuf,
    /// Idle lifetime of a session, in seconds.
    #[arg(long, env = "FLATCMS_SESSION_TTL_SECS", default_value_t = 3600)]
    pub session_ttl_secs: u64,
    #[arg(long, env = "FLATCMS_COOKIE_NAME", default_value = DEFAULT_COOKIE)]
    pub cookie_name: String,
    /// Mark the session cookie `Secure` (serve behind TLS).
    #[arg(long, env = "FLATCMS_SECURE_COOKIES")]
    pub secure_cookies: bool,
}

impl From<ServeArgs> for ServerConfig {
    fn from(a: ServeArgs) -> Self {
        Self {
            bind: a.bind,
            port: a.port,
            data_dir: a.data_dir,
            credentials_path: a.credentials,
            session_ttl: Duration::from_secs(a.session_ttl_secs),
            cookie_name: a.cookie_name,
            secure_cookies: a.secure_cookies,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn serve(args: &[&str]) -> ServerConfig {
        let mut argv = vec!["flatcms", "serve"];
        argv.extend_from_slice(args);
        match Cli::try_parse_from(argv).unwrap().command {
            Command::Serve(a) => a.into(),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn flags_override_defaults() {
        let cfg = serve(&[
            "--port", "9000",
            "--bind", "127.0.0.1",
            "--data-dir", "/srv/docs",
            "--credentials", "/etc/flatcms/users.yaml",
            "--session-ttl-secs", "120",
            "--secure-cookies",
        ]);
        assert_eq!(cfg.socket_addr(), "127.0.0.1:9000".parse().unwrap());
        assert_eq!(cfg.data_dir, PathBuf::from("/srv/docs"));
        assert_eq!(cfg.credentials_path, PathBuf::from("/etc/flatcms/users.yaml"));
        assert_eq!(cfg.session_ttl, Duration::from_secs(120));
        assert!(cfg.secure_cookies);
    }

    #[test]
    fn hash_password_subcommand_parses() {
        let cli = Cli::try_parse_from(["flatcms", "hash-password", "--user", "editor", "pw"]).unwrap();
        match cli.command {
            Command::HashPassword { user, password } => {
                assert_eq!(user, "editor");
                assert_eq!(password, "pw");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn bad_port_is_rejected() {
        assert!(Cli::try_parse_from(["flatcms", "serve", "--port", "70000"]).is_err());
    }
}
