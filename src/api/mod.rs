//! REST API layer: route handlers, DTOs, OpenAPI document, router
//! composition.
//!
//! Account endpoints are mounted under `/api/v1`; `/health` and `/ws` at
//! the root.

pub mod dto;
pub mod handlers;

use std::time::Duration;

use axum::Router;
use axum::http::StatusCode;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::app_state::AppState;

/// Upper bound for one REST request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// OpenAPI document for the REST surface.
#[derive(Debug, OpenApi)]
#[openapi(
    paths(
        handlers::accounts::signup,
        handlers::accounts::login,
        handlers::accounts::profile,
        handlers::accounts::change_username,
        handlers::accounts::change_password,
        handlers::accounts::rotate_api_key,
        handlers::system::health_handler,
    ),
    components(schemas(
        dto::CredentialsRequest,
        dto::ChangeUsernameRequest,
        dto::ChangePasswordRequest,
        dto::AccountResponse,
        handlers::system::HealthResponse,
        crate::error::ErrorResponse,
        crate::error::ErrorBody,
    )),
    tags(
        (name = "Accounts", description = "Signup, login and credential key management"),
        (name = "System", description = "Operational endpoints"),
    )
)]
pub struct ApiDoc;

/// Builds the complete API router with all REST endpoints.
pub fn build_router() -> Router<AppState> {
    let router = Router::new()
        .nest("/api/v1", handlers::routes())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            REQUEST_TIMEOUT,
        ))
        .merge(handlers::system::routes());

    #[cfg(feature = "swagger-ui")]
    let router = router.merge(
        utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
            .url("/api-docs/openapi.json", ApiDoc::openapi()),
    );

    router
}

/// Builds the full application: REST routes, the `/ws` endpoint, and the
/// HTTP tracing and CORS layers.
pub fn build_app(state: AppState) -> Router {
    Router::new()
        .merge(build_router())
        .merge(crate::ws::handler::routes())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_account_routes() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/v1/accounts"));
        assert!(doc.paths.paths.contains_key("/api/v1/accounts/me/api-key"));
        assert!(doc.paths.paths.contains_key("/health"));
    }
}
