//! Domain layer: accounts, live connections, and the per-message auth gate.
//!
//! This module contains the account model and its store collaborator, the
//! connection handle, the shared connection registry, and the auth gateway
//! that resolves a credential key on every inbound message.

pub mod account;
pub mod account_id;
pub mod account_store;
pub mod auth_gateway;
pub mod connection;
pub mod connection_registry;

pub use account::{Account, generate_api_key};
pub use account_id::AccountId;
pub use account_store::{AccountStore, InMemoryAccountStore};
pub use auth_gateway::AuthGateway;
pub use connection::{ConnectionHandle, ConnectionId};
pub use connection_registry::{ConnectionRegistry, Registration};
