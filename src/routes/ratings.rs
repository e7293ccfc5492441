use crate::{
    AppState, handlers,
    middleware::{json_content_type, require_user},
};
use axum::{Router, middleware, routing::get};

/// Rating Router Module
///
/// The three rating endpoints, wrapped in the authentication and content-type
/// stages of the middleware chain. `route_layer` keeps the chain on matched
/// routes only, so unknown paths answer 404 without a verifier round-trip.
///
/// Layer order: the last `route_layer` call is the outermost, hence
/// authentication runs before the content-type stage and a refused request
/// never reaches a handler.
pub fn rating_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // GET /
        // Average rating of every rated game, highest first.
        .route("/", get(handlers::get_ratings))
        // GET/PUT /{id}
        // Read or replace the authenticated user's rating of one game.
        .route(
            "/{id}",
            get(handlers::get_rating).put(handlers::put_rating),
        )
        .route_layer(middleware::from_fn(json_content_type))
        .route_layer(middleware::from_fn_with_state(state, require_user))
}
