//! Account DTOs for signup, login and profile operations.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{Account, AccountId};

/// Request body for `POST /accounts` and `POST /login`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CredentialsRequest {
    /// Word characters only.
    pub username: String,
    /// Word characters only.
    pub password: String,
}

/// Request body for `PUT /accounts/me/username`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ChangeUsernameRequest {
    /// Desired username.
    pub new_username: String,
}

/// Request body for `PUT /accounts/me/password`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ChangePasswordRequest {
    /// Current password.
    pub old_password: String,
    /// Replacement password.
    pub new_password: String,
}

/// Account as returned to its owner. Never includes the password hash.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AccountResponse {
    /// Stable account identifier.
    #[schema(value_type = String, format = Uuid)]
    pub user_id: AccountId,
    /// Current username.
    pub username: String,
    /// Current credential key for the WebSocket `api_key` field.
    pub api_key: String,
}

impl From<Account> for AccountResponse {
    fn from(account: Account) -> Self {
        Self {
            user_id: account.user_id,
            username: account.username,
            api_key: account.api_key,
        }
    }
}
