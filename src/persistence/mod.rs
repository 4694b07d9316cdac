//! Persistence layer: PostgreSQL account store.
//!
//! [`PostgresAccountStore`] implements [`crate::domain::AccountStore`]
//! with `sqlx::PgPool`. It is selected at startup when `DATABASE_URL` is
//! set; otherwise the server runs on the in-memory store.

pub mod models;
pub mod postgres;

pub use postgres::PostgresAccountStore;
