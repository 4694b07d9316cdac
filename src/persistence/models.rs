//! Database models for the `accounts` table.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{Account, AccountId};

/// A stored row from the `accounts` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AccountRow {
    /// Auto-increment row ID.
    pub id: i64,
    /// Public account identifier.
    pub user_id: Uuid,
    /// Unique username.
    pub username: String,
    /// Current credential key.
    pub api_key: String,
    /// Salted password hash.
    pub password_hash: String,
    /// Signup timestamp.
    pub created_at: DateTime<Utc>,
}

impl From<AccountRow> for Account {
    fn from(row: AccountRow) -> Self {
        Self {
            user_id: AccountId::from_uuid(row.user_id),
            username: row.username,
            api_key: row.api_key,
            password_hash: row.password_hash,
        }
    }
}
