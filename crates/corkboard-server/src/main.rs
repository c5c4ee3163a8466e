//! # corkboard-server
//!
//! Local HTTP server for the corkboard note board.
//!
//! This binary provides:
//! - **REST API** (axum) for posting, editing, and deleting notes
//! - **Multipart upload** of file attachments, recorded against a note
//! - **Static serving** of stored files under `/shared/{name}`
//!
//! All storage semantics (filename safety, the JSON ledger, cascade
//! deletion) live in `corkboard-store`; this crate only wires HTTP to it.

mod api;
mod config;
mod error;

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use corkboard_store::SharedStorage;

use crate::api::AppState;
use crate::config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing (respects RUST_LOG env var)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,corkboard_server=debug")),
        )
        .init();

    info!("Starting corkboard server v{}", env!("CARGO_PKG_VERSION"));

    let config = ServerConfig::from_env();
    info!(
        instance = %config.instance_name,
        shared_dir = %config.shared_dir.display(),
        addr = %config.http_addr,
        "Loaded configuration"
    );

    // Shared storage (creates the shared directory if missing)
    let storage = Arc::new(SharedStorage::open(config.shared_dir.clone()).await?);

    let http_addr = config.http_addr;
    let app_state = AppState {
        storage,
        config: Arc::new(config),
    };

    // tokio::select! ensures that if either the HTTP server fails or a
    // shutdown signal arrives, we exit cleanly.
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
