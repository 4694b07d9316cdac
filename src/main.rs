//! socktalk server entry point.
//!
//! Starts the Axum HTTP server with REST and WebSocket endpoints.

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use socktalk::api::build_app;
use socktalk::app_state::AppState;
use socktalk::config::AppConfig;
use socktalk::domain::{AccountStore, InMemoryAccountStore};
use socktalk::persistence::PostgresAccountStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = AppConfig::from_env()?;
    tracing::info!(addr = %config.listen_addr, "starting socktalk");

    // Pick the account store
    let store: Arc<dyn AccountStore> = match &config.database_url {
        Some(url) => {
            let store = PostgresAccountStore::connect(
                url,
                config.database_max_connections,
                Duration::from_secs(config.database_connect_timeout_secs),
            )
            .await?;
            tracing::info!("using PostgreSQL account store");
            Arc::new(store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, accounts are kept in memory");
            Arc::new(InMemoryAccountStore::new())
        }
    };

    // Build application
    let app = build_app(AppState::new(store, &config));

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Resolves on Ctrl-C.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
