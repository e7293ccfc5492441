use crate::{AppState, ApiDoc};
use axum::{Json, Router, routing::get};
use utoipa::OpenApi;

/// Docs Router Module
///
/// Serves the generated OpenAPI document. Left outside the authentication
/// chain so that tooling can fetch it without a token.
pub fn docs_routes() -> Router<AppState> {
    Router::new().route(
        "/api-docs/openapi.json",
        get(|| async { Json(ApiDoc::openapi()) }),
    )
}
