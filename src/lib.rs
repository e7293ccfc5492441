use axum::{Router, extract::FromRef, http::HeaderName};
use utoipa::OpenApi;

use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod auth;
pub mod config;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod repository;
pub mod routes;

use routes::{docs, ratings};

// --- Public Re-exports ---

pub use auth::{AuthError, Authenticator, AuthenticatorState, MockAuthenticator, VerifierClient};
pub use config::AppConfig;
pub use repository::{
    InMemoryRatingRepository, PostgresRatingRepository, RatingRepository, RepositoryState,
};

/// ApiDoc
///
/// OpenAPI description of the rating endpoints, served at
/// `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(handlers::get_ratings, handlers::get_rating, handlers::put_rating),
    components(schemas(models::AvgRating, models::Rating, models::RatingRequest)),
    tags((name = "game-ratings", description = "Per-user game ratings"))
)]
pub struct ApiDoc;

/// AppState
///
/// Everything a request needs, shared by all of them: the rating store and the
/// authenticator. Both are trait objects so tests can swap in the in-memory
/// implementations.
#[derive(Clone)]
pub struct AppState {
    pub repo: RepositoryState,
    pub authenticator: AuthenticatorState,
}

impl AppState {
    pub fn new(repo: RepositoryState, authenticator: AuthenticatorState) -> Self {
        Self {
            repo,
            authenticator,
        }
    }
}

// Lets extractors and middleware pull a single component out of `AppState`.

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for AuthenticatorState {
    fn from_ref(app_state: &AppState) -> AuthenticatorState {
        app_state.authenticator.clone()
    }
}

/// create_router
///
/// Assembles the routing table and the middleware chain around it.
///
/// From the outside in: request id, trace span, request logging, then (rating
/// routes only) authentication and JSON content type.
pub fn create_router(state: AppState) -> Router {
    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(docs::docs_routes())
        .merge(ratings::rating_routes(state.clone()))
        .with_state(state);

    base_router
        .layer(axum::middleware::from_fn(middleware::log_requests))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
}

/// trace_span_logger
///
/// Span for one request, tagged with the `x-request-id` set by the outer layer
/// so every log line of a request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
