//! Error types for every layer of the server.
//!
//! - [`StoreError`]: account store failures.
//! - [`AuthError`]: why a credential key did not resolve.
//! - [`TransportError`]: a send to one connection failed.
//! - [`SessionError`]: per-message outcomes reported back to the sender as
//!   an ack envelope. None of them end the session.
//! - [`ApiError`]: REST failures with HTTP status mapping and a structured
//!   JSON body.

use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::domain::AccountId;

/// Account store failure.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Another account already uses the username.
    #[error("username already exists: {0}")]
    UsernameTaken(String),

    /// The account does not exist (anymore).
    #[error("account not found: {0}")]
    NotFound(AccountId),

    /// The backing database failed.
    #[error("store backend error: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        Self::Backend(e.to_string())
    }
}

/// Credential key did not resolve to an account.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No key was supplied, or it was empty.
    #[error("missing credential key")]
    MissingKey,

    /// The key matches no account, including keys revoked by rotation.
    #[error("unknown credential key")]
    UnknownKey,

    /// The store lookup failed.
    #[error("credential lookup failed: {0}")]
    Lookup(#[from] StoreError),

    /// The store lookup exceeded its deadline.
    #[error("credential lookup timed out after {0:?}")]
    TimedOut(Duration),
}

/// Delivery to a single connection failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The connection's writer is gone.
    #[error("connection closed")]
    Closed,

    /// The connection's outbound queue stayed full past the deadline.
    #[error("send timed out after {0:?}")]
    TimedOut(Duration),
}

/// Outcome of one inbound message that is reported to the sender.
///
/// The `Display` text is the exact human-readable ack message.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Credential key unknown, revoked, or not checkable.
    #[error("Invalid API key.")]
    Auth(#[from] AuthError),

    /// `send_message` without a non-empty `message`.
    #[error("Message field is required.")]
    MissingMessage,

    /// Action tag absent or not recognised.
    #[error("Unsupported action.")]
    UnsupportedAction(Option<String>),

    /// Frame is not a JSON object matching the envelope schema.
    #[error("Malformed payload.")]
    Protocol(String),
}

impl SessionError {
    /// Returns the numeric ack status for this error.
    #[must_use]
    pub const fn status(&self) -> u16 {
        match self {
            Self::Auth(_) => 401,
            Self::MissingMessage | Self::UnsupportedAction(_) | Self::Protocol(_) => 400,
        }
    }
}

/// Structured JSON error response body.
///
/// ```json
/// { "error": { "code": 409, "message": "username already exists: alice" } }
/// ```
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    /// Numeric error code (mirrors the HTTP status).
    pub code: u16,
    /// Human-readable error message.
    pub message: String,
}

/// REST error with HTTP status code mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Request validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Username/password pair or credential key not accepted.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Account referenced by the credential key is gone.
    #[error("account not found")]
    NotFound,

    /// Username already in use.
    #[error("username already exists")]
    Conflict,

    /// Internal failure, typically the account store.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Conflict => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::UsernameTaken(_) => Self::Conflict,
            StoreError::NotFound(_) => Self::NotFound,
            StoreError::Backend(msg) => Self::Internal(msg),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if let Self::Internal(msg) = &self {
            tracing::error!(error = %msg, "request failed");
        }
        let body = ErrorResponse {
            error: ErrorBody {
                code: status.as_u16(),
                message: self.to_string(),
            },
        };
        (status, axum::Json(body)).into_response()
    }
}
