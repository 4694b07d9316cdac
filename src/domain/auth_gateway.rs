//! Per-message credential check.
//!
//! [`AuthGateway`] resolves a credential key to an [`Account`] on every
//! call. Nothing is cached, so a rotated key stops working on the very next
//! message that carries it.

use std::sync::Arc;
use std::time::Duration;

use super::{Account, AccountStore};
use crate::error::AuthError;

/// Stateless authenticator in front of an [`AccountStore`].
#[derive(Debug, Clone)]
pub struct AuthGateway {
    store: Arc<dyn AccountStore>,
    lookup_timeout: Duration,
}

impl AuthGateway {
    /// Creates a gateway that bounds each store lookup by `lookup_timeout`.
    #[must_use]
    pub fn new(store: Arc<dyn AccountStore>, lookup_timeout: Duration) -> Self {
        Self {
            store,
            lookup_timeout,
        }
    }

    /// Resolves the account currently holding `credential_key`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError`] if the key is missing, unknown or revoked, or
    /// if the lookup fails or exceeds the configured timeout.
    pub async fn authenticate(&self, credential_key: Option<&str>) -> Result<Account, AuthError> {
        let key = credential_key
            .filter(|k| !k.is_empty())
            .ok_or(AuthError::MissingKey)?;

        let lookup = self.store.lookup_by_credential_key(key);
        match tokio::time::timeout(self.lookup_timeout, lookup).await {
            Ok(Ok(Some(account))) => Ok(account),
            Ok(Ok(None)) => Err(AuthError::UnknownKey),
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "account lookup failed");
                Err(AuthError::Lookup(e))
            }
            Err(_) => {
                tracing::warn!(timeout = ?self.lookup_timeout, "account lookup timed out");
                Err(AuthError::TimedOut(self.lookup_timeout))
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::domain::{AccountId, InMemoryAccountStore, generate_api_key};
    use crate::error::StoreError;

    const TIMEOUT: Duration = Duration::from_millis(100);

    async fn gateway_with_account() -> (AuthGateway, Arc<InMemoryAccountStore>, Account) {
        let store = Arc::new(InMemoryAccountStore::new());
        let account = Account::new("alice".to_string(), "pw");
        let Ok(()) = store.insert(account.clone()).await else {
            panic!("insert failed");
        };
        let gateway = AuthGateway::new(Arc::clone(&store) as Arc<dyn AccountStore>, TIMEOUT);
        (gateway, store, account)
    }

    #[tokio::test]
    async fn valid_key_resolves_account() {
        let (gateway, _, account) = gateway_with_account().await;
        let found = tokio_test::assert_ok!(gateway.authenticate(Some(&account.api_key)).await);
        assert_eq!(found.username, "alice");
    }

    #[tokio::test]
    async fn unknown_key_rejected() {
        let (gateway, _, _) = gateway_with_account().await;
        let err = tokio_test::assert_err!(gateway.authenticate(Some("bogus")).await);
        assert!(matches!(err, AuthError::UnknownKey));
    }

    #[tokio::test]
    async fn missing_or_empty_key_rejected() {
        let (gateway, _, _) = gateway_with_account().await;
        assert!(matches!(
            gateway.authenticate(None).await,
            Err(AuthError::MissingKey)
        ));
        assert!(matches!(
            gateway.authenticate(Some("")).await,
            Err(AuthError::MissingKey)
        ));
    }

    #[tokio::test]
    async fn rotation_takes_effect_on_next_call() {
        let (gateway, store, account) = gateway_with_account().await;
        assert!(gateway.authenticate(Some(&account.api_key)).await.is_ok());

        let new_key = generate_api_key();
        let _ = store.update_credential_key(account.user_id, &new_key).await;

        assert!(gateway.authenticate(Some(&account.api_key)).await.is_err());
        assert!(gateway.authenticate(Some(&new_key)).await.is_ok());
    }

    #[derive(Debug)]
    struct StalledStore;

    #[async_trait]
    impl AccountStore for StalledStore {
        async fn lookup_by_credential_key(&self, _: &str) -> Result<Option<Account>, StoreError> {
            std::future::pending().await
        }
        async fn lookup_by_username(&self, _: &str) -> Result<Option<Account>, StoreError> {
            Ok(None)
        }
        async fn insert(&self, _: Account) -> Result<(), StoreError> {
            Ok(())
        }
        async fn update_username(&self, _: AccountId, _: &str) -> Result<(), StoreError> {
            Ok(())
        }
        async fn update_password(&self, _: AccountId, _: &str) -> Result<(), StoreError> {
            Ok(())
        }
        async fn update_credential_key(&self, _: AccountId, _: &str) -> Result<(), StoreError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn stalled_lookup_times_out() {
        let gateway = AuthGateway::new(Arc::new(StalledStore), Duration::from_millis(20));
        let result = gateway.authenticate(Some("any")).await;
        assert!(matches!(result, Err(AuthError::TimedOut(_))));
    }
}
