//! # haven-server
//!
//! HTTP and WebSocket server for Haven, a disaster-preparedness app.
//!
//! This binary provides:
//! - **Accounts**: registration, email verification, bearer sessions
//! - **Relationships**: friend and family requests, accept/reject, contacts
//! - **Check-ins** broadcast to every contact as notifications
//! - **Live feeds** over WebSocket for requests, check-ins and notifications
//! - **Profile photos** stored on disk and served back by URL
//! - A static **emergency hotline** directory

mod api;
mod auth;
mod blob_store;
mod config;
mod error;
mod ws;

use std::sync::Arc;

use haven_core::Haven;
use haven_store::Database;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::api::AppState;
use crate::blob_store::BlobStore;
use crate::config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("info,haven_server=debug,haven_core=debug")
        }))
        .init();

    info!("Starting Haven server v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(?config, "Loaded configuration");

    // -----------------------------------------------------------------------
    // 3. Initialize subsystems
    // -----------------------------------------------------------------------
    let db = match &config.database_path {
        Some(path) => Database::open_at(path)?,
        None => Database::new()?,
    };
    info!(path = ?db.path(), "Database opened");

    let haven = Haven::new(db, config.core_config());

    let blob_store = Arc::new(
        BlobStore::new(
            config.blob_storage_path.clone(),
            config.max_blob_size,
            config.public_base_url.clone(),
        )
        .await?,
    );

    let http_addr = config.http_addr;
    let app_state = AppState {
        haven: haven.clone(),
        blob_store,
        config: Arc::new(config),
    };

    // -----------------------------------------------------------------------
    // 4. Spawn background tasks
    // -----------------------------------------------------------------------

    // Expired session cleanup (hourly)
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(3600));
        loop {
            interval.tick().await;
            let haven = haven.clone();
            match tokio::task::spawn_blocking(move || haven.purge_expired_sessions()).await {
                Ok(Ok(n)) if n > 0 => info!(removed = n, "Purged expired sessions"),
                Ok(Err(e)) => tracing::warn!(error = %e, "Session purge failed"),
                _ => {}
            }
        }
    });

    // -----------------------------------------------------------------------
    // 5. Run the HTTP API server (blocks until shutdown)
    // -----------------------------------------------------------------------
    tokio::select! {
        result = api::serve(app_state, http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
