//! Account handlers: signup, login, profile, rename, password, key rotation.
//!
//! Authenticated routes read the credential key from the `x-api-key`
//! header.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::{Json, Router};

use crate::api::dto::{
    AccountResponse, ChangePasswordRequest, ChangeUsernameRequest, CredentialsRequest,
};
use crate::app_state::AppState;
use crate::error::{ApiError, ErrorResponse};

/// Header carrying the credential key on authenticated routes.
pub const API_KEY_HEADER: &str = "x-api-key";

fn api_key(headers: &HeaderMap) -> Result<&str, ApiError> {
    headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::Unauthorized(format!("missing {API_KEY_HEADER} header")))
}

/// `POST /accounts` — Create an account.
///
/// # Errors
///
/// Returns [`ApiError`] on invalid input or a taken username.
#[utoipa::path(
    post,
    path = "/api/v1/accounts",
    tag = "Accounts",
    summary = "Sign up",
    description = "Creates an account and returns its first credential key.",
    request_body = CredentialsRequest,
    responses(
        (status = 201, description = "Account created", body = AccountResponse),
        (status = 400, description = "Invalid username or password", body = ErrorResponse),
        (status = 409, description = "Username already exists", body = ErrorResponse),
    )
)]
pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<CredentialsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let account = state.accounts.signup(&req.username, &req.password).await?;
    Ok((StatusCode::CREATED, Json(AccountResponse::from(account))))
}

/// `POST /login` — Exchange username and password for the credential key.
///
/// # Errors
///
/// Returns [`ApiError::Unauthorized`] on a bad pair.
#[utoipa::path(
    post,
    path = "/api/v1/login",
    tag = "Accounts",
    summary = "Log in",
    request_body = CredentialsRequest,
    responses(
        (status = 200, description = "Credentials accepted", body = AccountResponse),
        (status = 401, description = "Invalid username or password", body = ErrorResponse),
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<CredentialsRequest>,
) -> Result<Json<AccountResponse>, ApiError> {
    let account = state.accounts.login(&req.username, &req.password).await?;
    Ok(Json(account.into()))
}

/// `GET /accounts/me` — Current profile.
///
/// # Errors
///
/// Returns [`ApiError::Unauthorized`] for an unknown key.
#[utoipa::path(
    get,
    path = "/api/v1/accounts/me",
    tag = "Accounts",
    summary = "Get profile",
    params(("x-api-key" = String, Header, description = "Credential key")),
    responses(
        (status = 200, description = "Profile", body = AccountResponse),
        (status = 401, description = "Invalid API key", body = ErrorResponse),
    )
)]
pub async fn profile(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<AccountResponse>, ApiError> {
    let account = state.accounts.profile(api_key(&headers)?).await?;
    Ok(Json(account.into()))
}

/// `PUT /accounts/me/username` — Rename the account.
///
/// # Errors
///
/// Returns [`ApiError`] on an invalid or taken username or unknown key.
#[utoipa::path(
    put,
    path = "/api/v1/accounts/me/username",
    tag = "Accounts",
    summary = "Change username",
    params(("x-api-key" = String, Header, description = "Credential key")),
    request_body = ChangeUsernameRequest,
    responses(
        (status = 200, description = "Renamed", body = AccountResponse),
        (status = 400, description = "Invalid username", body = ErrorResponse),
        (status = 401, description = "Invalid API key", body = ErrorResponse),
        (status = 409, description = "Username already exists", body = ErrorResponse),
    )
)]
pub async fn change_username(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ChangeUsernameRequest>,
) -> Result<Json<AccountResponse>, ApiError> {
    let account = state
        .accounts
        .change_username(api_key(&headers)?, &req.new_username)
        .await?;
    Ok(Json(account.into()))
}

/// `PUT /accounts/me/password` — Change the password.
///
/// # Errors
///
/// Returns [`ApiError`] on a wrong old password, invalid new password, or
/// unknown key.
#[utoipa::path(
    put,
    path = "/api/v1/accounts/me/password",
    tag = "Accounts",
    summary = "Change password",
    params(("x-api-key" = String, Header, description = "Credential key")),
    request_body = ChangePasswordRequest,
    responses(
        (status = 204, description = "Password changed"),
        (status = 400, description = "Invalid new password", body = ErrorResponse),
        (status = 401, description = "Invalid API key or password", body = ErrorResponse),
    )
)]
pub async fn change_password(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<StatusCode, ApiError> {
    state
        .accounts
        .change_password(api_key(&headers)?, &req.old_password, &req.new_password)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /accounts/me/api-key` — Rotate the credential key.
///
/// The old key stops authenticating WebSocket messages immediately; open
/// connections are left alone.
///
/// # Errors
///
/// Returns [`ApiError::Unauthorized`] for an unknown key.
#[utoipa::path(
    post,
    path = "/api/v1/accounts/me/api-key",
    tag = "Accounts",
    summary = "Rotate credential key",
    params(("x-api-key" = String, Header, description = "Credential key")),
    responses(
        (status = 200, description = "New key issued", body = AccountResponse),
        (status = 401, description = "Invalid API key", body = ErrorResponse),
    )
)]
pub async fn rotate_api_key(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<AccountResponse>, ApiError> {
    let account = state.accounts.rotate_api_key(api_key(&headers)?).await?;
    Ok(Json(account.into()))
}

/// Account routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/accounts", post(signup))
        .route("/login", post(login))
        .route("/accounts/me", get(profile))
        .route("/accounts/me/username", put(change_username))
        .route("/accounts/me/password", put(change_password))
        .route("/accounts/me/api-key", post(rotate_api_key))
}
