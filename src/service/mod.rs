//! Service layer: business logic orchestration.
//!
//! [`Broadcaster`] fans chat messages out over the connection registry.
//! [`AccountService`] backs the account management API.

pub mod account_service;
pub mod broadcaster;

pub use account_service::AccountService;
pub use broadcaster::{BroadcastReport, Broadcaster};
