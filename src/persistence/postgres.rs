//! PostgreSQL implementation of the account store.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use super::models::AccountRow;
use crate::domain::{Account, AccountId, AccountStore};
use crate::error::StoreError;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS accounts (\
    id BIGSERIAL PRIMARY KEY, \
    user_id UUID NOT NULL UNIQUE, \
    username TEXT NOT NULL UNIQUE, \
    api_key TEXT NOT NULL UNIQUE, \
    password_hash TEXT NOT NULL, \
    created_at TIMESTAMPTZ NOT NULL DEFAULT now())";

const SELECT_ACCOUNT: &str =
    "SELECT id, user_id, username, api_key, password_hash, created_at FROM accounts";

/// PostgreSQL-backed account store using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresAccountStore {
    pool: PgPool,
}

impl PostgresAccountStore {
    /// Creates a store on top of an existing connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to `database_url` and ensures the `accounts` table exists.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] if the database is unreachable or
    /// the schema cannot be created.
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect(database_url)
            .await?;
        let store = Self::new(pool);
        store.ensure_schema().await?;
        Ok(store)
    }

    /// Creates the `accounts` table if it is missing.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] on database failure.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(SCHEMA).execute(&self.pool).await?;
        Ok(())
    }

    async fn fetch_one_by(&self, column: &str, value: &str) -> Result<Option<Account>, StoreError> {
        let row = sqlx::query_as::<_, AccountRow>(&format!("{SELECT_ACCOUNT} WHERE {column} = $1"))
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Account::from))
    }

    async fn update_column(
        &self,
        column: &str,
        user_id: AccountId,
        value: &str,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(&format!("UPDATE accounts SET {column} = $1 WHERE user_id = $2"))
            .bind(value)
            .bind(*user_id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| username_conflict(e, value))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(user_id));
        }
        Ok(())
    }
}

#[async_trait]
impl AccountStore for PostgresAccountStore {
    async fn lookup_by_credential_key(&self, key: &str) -> Result<Option<Account>, StoreError> {
        self.fetch_one_by("api_key", key).await
    }

    async fn lookup_by_username(&self, username: &str) -> Result<Option<Account>, StoreError> {
        self.fetch_one_by("username", username).await
    }

    async fn insert(&self, account: Account) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO accounts (user_id, username, api_key, password_hash) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(*account.user_id.as_uuid())
        .bind(&account.username)
        .bind(&account.api_key)
        .bind(&account.password_hash)
        .execute(&self.pool)
        .await
        .map_err(|e| username_conflict(e, &account.username))?;
        Ok(())
    }

    async fn update_username(
        &self,
        user_id: AccountId,
        username: &str,
    ) -> Result<(), StoreError> {
        self.update_column("username", user_id, username).await
    }

    async fn update_password(
        &self,
        user_id: AccountId,
        password_hash: &str,
    ) -> Result<(), StoreError> {
        self.update_column("password_hash", user_id, password_hash)
            .await
    }

    async fn update_credential_key(
        &self,
        user_id: AccountId,
        api_key: &str,
    ) -> Result<(), StoreError> {
        self.update_column("api_key", user_id, api_key).await
    }
}

/// Maps a unique violation on the username column to
/// [`StoreError::UsernameTaken`].
fn username_conflict(e: sqlx::Error, username: &str) -> StoreError {
    if let sqlx::Error::Database(db) = &e
        && db.is_unique_violation()
        && db.constraint().is_some_and(|c| c.contains("username"))
    {
        return StoreError::UsernameTaken(username.to_string());
    }
    StoreError::from(e)
}
