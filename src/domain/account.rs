//! Account record and credential helpers.
//!
//! The [`Account`] is owned by the account store. The broadcast core only
//! ever reads it: every inbound message re-resolves the account from the
//! credential key it carries.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use rand::RngCore;
use rand::seq::SliceRandom;
use sha2::{Digest, Sha256};

use super::AccountId;

/// Salt length in bytes for password hashes.
const SALT_LEN: usize = 16;

/// A registered chat account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    /// Stable public identifier.
    pub user_id: AccountId,
    /// Unique display name shown to peers as the sender.
    pub username: String,
    /// Current credential key. Rotating it invalidates the previous value.
    pub api_key: String,
    /// Salted password hash, see [`hash_password`].
    pub password_hash: String,
}

impl Account {
    /// Creates a fresh account with a new identifier and credential key.
    #[must_use]
    pub fn new(username: String, password: &str) -> Self {
        Self {
            user_id: AccountId::new(),
            username,
            api_key: generate_api_key(),
            password_hash: hash_password(password),
        }
    }

    /// Returns `true` if `password` matches the stored hash.
    #[must_use]
    pub fn verify_password(&self, password: &str) -> bool {
        verify_password(password, &self.password_hash)
    }
}

/// Generates a new opaque credential key.
///
/// Three UUID v4 strings are concatenated in shuffled order and the result
/// is base64-encoded.
#[must_use]
pub fn generate_api_key() -> String {
    let mut parts: Vec<String> = (0..3).map(|_| uuid::Uuid::new_v4().to_string()).collect();
    parts.shuffle(&mut rand::thread_rng());
    STANDARD.encode(parts.concat())
}

/// Hashes a password with a random salt as `<salt-hex>$<sha256-hex>`.
#[must_use]
pub fn hash_password(password: &str) -> String {
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);
    format!("{}${}", hex::encode(salt), digest(&salt, password))
}

/// Checks `password` against a hash produced by [`hash_password`].
///
/// Malformed stored hashes never verify.
#[must_use]
pub fn verify_password(password: &str, stored: &str) -> bool {
    let Some((salt_hex, expected)) = stored.split_once('$') else {
        return false;
    };
    let Ok(salt) = hex::decode(salt_hex) else {
        return false;
    };
    digest(&salt, password) == expected
}

/// Returns `true` if `value` is non-empty and made of word characters only
/// (alphanumerics and `_`). Applies to usernames and passwords.
#[must_use]
pub fn is_valid_word(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|c| c.is_alphanumeric() || c == '_')
}

fn digest(salt: &[u8], password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}
