//! # socktalk
//!
//! Real-time chat broadcast server over WebSocket with a JSON account API.
//!
//! Peers connect to `/ws` and send JSON envelopes carrying their credential
//! key. Every message is authenticated on its own (no identity is cached per
//! connection), acknowledged to the sender, and fanned out best-effort to
//! every other live connection. Accounts and credential keys are managed
//! through the REST routes under `/api/v1`.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP, WebSocket)
//!     │
//!     ├── REST Handlers (api/)
//!     ├── WS Session Handler (ws/)
//!     │
//!     ├── AccountService, Broadcaster (service/)
//!     ├── AuthGateway, ConnectionRegistry (domain/)
//!     │
//!     └── AccountStore: in-memory or PostgreSQL (domain/, persistence/)
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod service;
pub mod ws;
