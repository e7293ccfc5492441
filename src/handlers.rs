use crate::{
    AppState,
    models::{AvgRating, Rating, RatingRequest, User},
};
use axum::{
    Extension, Json,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
};

// --- Handlers ---

/// get_ratings
///
/// Average rating of every rated game, highest first. An empty store yields
/// `[]`.
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Average rating per game", body = [AvgRating]),
        (status = 403, description = "Not authenticated"),
        (status = 500, description = "Store failure")
    )
)]
pub async fn get_ratings(
    State(state): State<AppState>,
) -> Result<Json<Vec<AvgRating>>, StatusCode> {
    state
        .repo
        .get_avg_ratings()
        .await
        .map(Json)
        .map_err(|e| {
            tracing::error!("get_ratings error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })
}

/// get_rating
///
/// The authenticated user's rating for game `id`. A game the user never rated
/// reports a rating of 0.
#[utoipa::path(
    get,
    path = "/{id}",
    params(("id" = String, Path, description = "Game ID")),
    responses(
        (status = 200, description = "Rating of the current user", body = Rating),
        (status = 403, description = "Not authenticated"),
        (status = 500, description = "Store failure")
    )
)]
pub async fn get_rating(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(game_id): Path<String>,
) -> Result<Json<Rating>, StatusCode> {
    state
        .repo
        .get_rating(&game_id, &user.id)
        .await
        .map(Json)
        .map_err(|e| {
            tracing::error!("get_rating error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })
}

/// put_rating
///
/// Sets the authenticated user's rating for game `id`, replacing any previous
/// one, then answers exactly like `get_rating`.
///
/// The body must be `{"rating": n}` with `n` an integer between 1 and 5. A body
/// that is not such an object, a fractional score, an out-of-range score or a
/// store failure all yield `400 Bad Request`.
#[utoipa::path(
    put,
    path = "/{id}",
    params(("id" = String, Path, description = "Game ID")),
    request_body = RatingRequest,
    responses(
        (status = 200, description = "Rating after the update", body = Rating),
        (status = 400, description = "Invalid rating or store failure"),
        (status = 403, description = "Not authenticated")
    )
)]
pub async fn put_rating(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(game_id): Path<String>,
    body: Bytes,
) -> Result<Json<Rating>, StatusCode> {
    let request: RatingRequest = serde_json::from_slice(&body).map_err(|e| {
        tracing::info!(game_id = %game_id, "Malformed rating body: {}", e);
        StatusCode::BAD_REQUEST
    })?;

    let rating = request.into_rating(&game_id, &user.id).ok_or_else(|| {
        tracing::info!(game_id = %game_id, "Rating out of integer range");
        StatusCode::BAD_REQUEST
    })?;

    state.repo.put_rating(rating).await.map_err(|e| {
        tracing::warn!("put_rating error: {}", e);
        StatusCode::BAD_REQUEST
    })?;

    get_rating(State(state), Extension(user), Path(game_id)).await
}
