//! Account service: signup, login, profile changes and key rotation.
//!
//! The broadcast core never calls into this service. Rotating a key here
//! takes effect for open WebSocket sessions on their next message because
//! the auth gateway re-resolves the key every time.

use std::sync::Arc;

use crate::domain::account::{hash_password, is_valid_word};
use crate::domain::{Account, AccountStore, generate_api_key};
use crate::error::ApiError;

/// Orchestrates account management on top of an [`AccountStore`].
#[derive(Debug, Clone)]
pub struct AccountService {
    store: Arc<dyn AccountStore>,
}

impl AccountService {
    /// Creates a new `AccountService`.
    #[must_use]
    pub fn new(store: Arc<dyn AccountStore>) -> Self {
        Self { store }
    }

    /// Registers a new account and issues its first credential key.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidRequest`] for malformed input and
    /// [`ApiError::Conflict`] if the username is taken.
    pub async fn signup(&self, username: &str, password: &str) -> Result<Account, ApiError> {
        if !is_valid_word(username) || !is_valid_word(password) {
            return Err(ApiError::InvalidRequest(
                "username and password may only contain letters, digits and underscores"
                    .to_string(),
            ));
        }
        let account = Account::new(username.to_string(), password);
        self.store.insert(account.clone()).await?;
        tracing::info!(user_id = %account.user_id, username, "account created");
        Ok(account)
    }

    /// Checks a username/password pair and returns the account.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unauthorized`] if the pair does not match.
    pub async fn login(&self, username: &str, password: &str) -> Result<Account, ApiError> {
        match self.store.lookup_by_username(username).await? {
            Some(account) if account.verify_password(password) => Ok(account),
            _ => Err(ApiError::Unauthorized(
                "invalid username or password".to_string(),
            )),
        }
    }

    /// Resolves the account holding `api_key`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unauthorized`] if the key is unknown.
    pub async fn profile(&self, api_key: &str) -> Result<Account, ApiError> {
        self.store
            .lookup_by_credential_key(api_key)
            .await?
            .ok_or_else(|| ApiError::Unauthorized("invalid API key".to_string()))
    }

    /// Renames the account holding `api_key`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidRequest`] for a malformed name,
    /// [`ApiError::Conflict`] if it is taken, or [`ApiError::Unauthorized`]
    /// for an unknown key.
    pub async fn change_username(
        &self,
        api_key: &str,
        new_username: &str,
    ) -> Result<Account, ApiError> {
        if !is_valid_word(new_username) {
            return Err(ApiError::InvalidRequest("invalid username".to_string()));
        }
        let mut account = self.profile(api_key).await?;
        self.store
            .update_username(account.user_id, new_username)
            .await?;
        tracing::info!(user_id = %account.user_id, old = %account.username, new = new_username, "username changed");
        account.username = new_username.to_string();
        Ok(account)
    }

    /// Replaces the password after checking the current one.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unauthorized`] if the key or old password is
    /// wrong and [`ApiError::InvalidRequest`] for a malformed new password.
    pub async fn change_password(
        &self,
        api_key: &str,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), ApiError> {
        let account = self.profile(api_key).await?;
        if !account.verify_password(old_password) {
            return Err(ApiError::Unauthorized("invalid password".to_string()));
        }
        if !is_valid_word(new_password) {
            return Err(ApiError::InvalidRequest("invalid new password".to_string()));
        }
        self.store
            .update_password(account.user_id, &hash_password(new_password))
            .await?;
        tracing::info!(user_id = %account.user_id, "password changed");
        Ok(())
    }

    /// Issues a new credential key. The old key stops authenticating
    /// immediately, including for messages on already-open connections.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unauthorized`] if `api_key` is unknown.
    pub async fn rotate_api_key(&self, api_key: &str) -> Result<Account, ApiError> {
        let mut account = self.profile(api_key).await?;
        let new_key = generate_api_key();
        self.store
            .update_credential_key(account.user_id, &new_key)
            .await?;
        tracing::info!(user_id = %account.user_id, "credential key rotated");
        account.api_key = new_key;
        Ok(account)
    }
}
