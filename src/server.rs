//!
//! flatcms HTTP server
//! -------------------
//! Axum router binding the document, credential and session components to
//! their routes.
//!
//! Responsibilities:
//! - Cookie-backed server-side sessions (identity + one-shot flash).
//! - Sign-in/sign-out backed by the credential file.
//! - Document listing, viewing and the gated create/edit/update/delete flow.
//! - Startup logging and a background sweeper for expired sessions.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{routing::{get, post}, Router};
use tracing::info;

use crate::config::ServerConfig;
use crate::credentials::CredentialStore;
use crate::documents::DocumentStore;
use crate::session::SessionStore;

pub mod handlers;
pub mod views;

use views::Views;

/// Shared server state injected into all handlers.
#[derive(Clone)]
pub struct AppState {
    pub documents: DocumentStore,
    pub credentials: CredentialStore,
    pub sessions: SessionStore,
    pub views: Arc<Views>,
}

impl AppState {
    pub fn from_config(config: &ServerConfig) -> anyhow::Result<Self> {
        let documents = DocumentStore::open(&config.data_dir)
            .with_context(|| format!("Failed to create or access data directory: {}", config.data_dir.display()))?;
        let views = Views::new().context("While compiling templates")?;
        Ok(Self {
            documents,
            credentials: CredentialStore::new(&config.credentials_path),
            sessions: SessionStore::new(config.session_ttl, config.cookie_name.clone(), config.secure_cookies),
            views: Arc::new(views),
        })
    }
}

pub fn router(state: AppState) -> Router {
    use handlers::*;
    Router::new()
        .route("/", get(index))
        .route("/new", get(new_document))
        .route("/create", post(create_document))
        .route("/users/signin", get(signin_form).post(signin))
        .route("/users/signout", post(signout))
        .route("/{name}", get(show_document).post(update_document))
        .route("/{name}/edit", get(edit_document))
        .route("/{name}/delete", post(delete_document))
        .with_state(state)
}

fn log_startup(config: &ServerConfig) {
    let cwd = std::env::current_dir().ok();
    info!(
        target: "startup",
        "flatcms starting: cwd={:?}, addr={}, data_dir={:?}, credentials={:?}, session_ttl_secs={}",
        cwd, config.socket_addr(), config.data_dir, config.credentials_path, config.session_ttl.as_secs()
    );
    if !config.credentials_path.exists() {
        tracing::warn!(
            target: "startup",
            "credential file {:?} does not exist; sign-in will fail until it is created (see `flatcms hash-password`)",
            config.credentials_path
        );
    }
}

/// Start the HTTP server and block until it stops.
pub async fn run(config: ServerConfig) -> anyhow::Result<()> {
    log_startup(&config);
    let state = AppState::from_config(&config)?;

    // Background sweeper for expired sessions
    {
        let sessions = state.sessions.clone();
        let interval = (config.session_ttl / 4).max(Duration::from_secs(5));
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                let removed = sessions.sweep_expired();
                if removed > 0 { tracing::debug!(target: "flatcms::session", removed = removed, "session_sweep"); }
            }
        });
    }

    let app = router(state);
    let addr = config.socket_addr();
    info!(target: "flatcms::server", "Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("While binding {}", addr))?;
    axum::serve(listener, app).await?;
    Ok(())
}
