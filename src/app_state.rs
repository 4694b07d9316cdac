//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::domain::{AccountStore, AuthGateway, ConnectionRegistry};
use crate::service::{AccountService, Broadcaster};

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Account management for the REST API.
    pub accounts: AccountService,
    /// Per-message credential check for WebSocket sessions.
    pub auth: AuthGateway,
    /// Fan-out over the live connections.
    pub broadcaster: Broadcaster,
    /// Live connections.
    pub registry: Arc<ConnectionRegistry>,
    /// Frames buffered per connection.
    pub outbound_queue_capacity: usize,
}

impl AppState {
    /// Wires the core components around `store`.
    #[must_use]
    pub fn new(store: Arc<dyn AccountStore>, config: &AppConfig) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        Self {
            accounts: AccountService::new(Arc::clone(&store)),
            auth: AuthGateway::new(store, config.auth_lookup_timeout),
            broadcaster: Broadcaster::new(Arc::clone(&registry), config.send_timeout),
            registry,
            outbound_queue_capacity: config.outbound_queue_capacity,
        }
    }
}
