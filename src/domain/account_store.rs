//! Account store collaborator.
//!
//! [`AccountStore`] is the durable mapping from credential key to account.
//! The broadcast core only calls [`AccountStore::lookup_by_credential_key`];
//! the remaining operations back the account management API.
//!
//! [`InMemoryAccountStore`] keeps everything in a single
//! [`tokio::sync::RwLock`] and is used when no database is configured and
//! throughout the tests. The PostgreSQL backend lives in
//! [`crate::persistence`].

use std::collections::HashMap;
use std::fmt::Debug;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{Account, AccountId};
use crate::error::StoreError;

/// Durable account storage.
#[async_trait]
pub trait AccountStore: Send + Sync + Debug {
    /// Resolves the account currently holding `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] when the backing store fails.
    async fn lookup_by_credential_key(&self, key: &str) -> Result<Option<Account>, StoreError>;

    /// Resolves an account by its unique username.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] when the backing store fails.
    async fn lookup_by_username(&self, username: &str) -> Result<Option<Account>, StoreError>;

    /// Persists a new account.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UsernameTaken`] if the username is in use.
    async fn insert(&self, account: Account) -> Result<(), StoreError>;

    /// Renames an account.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UsernameTaken`] if another account holds the
    /// name, or [`StoreError::NotFound`] if the account no longer exists.
    async fn update_username(&self, user_id: AccountId, username: &str)
    -> Result<(), StoreError>;

    /// Replaces an account's password hash.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the account no longer exists.
    async fn update_password(&self, user_id: AccountId, password_hash: &str)
    -> Result<(), StoreError>;

    /// Replaces an account's credential key. The previous key stops
    /// resolving immediately.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the account no longer exists.
    async fn update_credential_key(&self, user_id: AccountId, api_key: &str)
    -> Result<(), StoreError>;
}

/// Process-local account store.
#[derive(Debug, Default)]
pub struct InMemoryAccountStore {
    accounts: RwLock<HashMap<AccountId, Account>>,
}

impl InMemoryAccountStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn lookup_by_credential_key(&self, key: &str) -> Result<Option<Account>, StoreError> {
        let map = self.accounts.read().await;
        Ok(map.values().find(|a| a.api_key == key).cloned())
    }

    async fn lookup_by_username(&self, username: &str) -> Result<Option<Account>, StoreError> {
        let map = self.accounts.read().await;
        Ok(map.values().find(|a| a.username == username).cloned())
    }

    async fn insert(&self, account: Account) -> Result<(), StoreError> {
        let mut map = self.accounts.write().await;
        if map.values().any(|a| a.username == account.username) {
            return Err(StoreError::UsernameTaken(account.username));
        }
        map.insert(account.user_id, account);
        Ok(())
    }

    async fn update_username(
        &self,
        user_id: AccountId,
        username: &str,
    ) -> Result<(), StoreError> {
        let mut map = self.accounts.write().await;
        if map
            .values()
            .any(|a| a.username == username && a.user_id != user_id)
        {
            return Err(StoreError::UsernameTaken(username.to_string()));
        }
        let account = map.get_mut(&user_id).ok_or(StoreError::NotFound(user_id))?;
        account.username = username.to_string();
        Ok(())
    }

    async fn update_password(
        &self,
        user_id: AccountId,
        password_hash: &str,
    ) -> Result<(), StoreError> {
        let mut map = self.accounts.write().await;
        let account = map.get_mut(&user_id).ok_or(StoreError::NotFound(user_id))?;
        account.password_hash = password_hash.to_string();
        Ok(())
    }

    async fn update_credential_key(
        &self,
        user_id: AccountId,
        api_key: &str,
    ) -> Result<(), StoreError> {
        let mut map = self.accounts.write().await;
        let account = map.get_mut(&user_id).ok_or(StoreError::NotFound(user_id))?;
        account.api_key = api_key.to_string();
        Ok(())
    }
}
