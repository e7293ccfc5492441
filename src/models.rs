use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Lowest score a user can give a game.
pub const MIN_RATING: i32 = 1;
/// Highest score a user can give a game.
pub const MAX_RATING: i32 = 5;

// --- Identity ---

/// User
///
/// The identity returned by the external verifier for an authenticated token.
/// Only `id` takes part in business logic (it is the join key for ratings); the
/// remaining fields are carried through as received. Rebuilt on every request,
/// never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub profile_photo: Option<String>,
}

impl User {
    /// Builds a user carrying nothing but its identifier.
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: None,
            nickname: None,
            profile_photo: None,
        }
    }
}

// --- Ratings ---

/// Rating
///
/// A single user's score for a single game. The storage key is the pair
/// `(game_id, user_id)`, so a user holds at most one rating per game.
///
/// `user_id` is internal: it is never written to a response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema, FromRow, Default)]
pub struct Rating {
    #[serde(skip)]
    pub user_id: String,
    pub game_id: String,
    pub rating: i32,
}

impl Rating {
    pub fn new(game_id: impl Into<String>, user_id: impl Into<String>, rating: i32) -> Self {
        Self {
            user_id: user_id.into(),
            game_id: game_id.into(),
            rating,
        }
    }

    /// unrated
    ///
    /// The value reported for a game the user never rated: score 0 and no owner.
    pub fn unrated(game_id: impl Into<String>) -> Self {
        Self {
            user_id: String::new(),
            game_id: game_id.into(),
            rating: 0,
        }
    }

    /// valid
    ///
    /// A rating may be stored only if its score lies in `MIN_RATING..=MAX_RATING`.
    pub fn valid(&self) -> bool {
        (MIN_RATING..=MAX_RATING).contains(&self.rating)
    }
}

/// AvgRating
///
/// Mean score of one game across every user who rated it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, FromRow)]
pub struct AvgRating {
    pub game_id: String,
    pub rating: f64,
}

// --- Request Payloads ---

/// RatingRequest
///
/// Body of `PUT /{id}`. The score must be written as a JSON integer: `4.5`,
/// `3.0` and `5e0` all fail to decode.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RatingRequest {
    #[schema(example = 4)]
    pub rating: i64,
}

impl RatingRequest {
    /// score
    ///
    /// Returns the score as an `i32`, or `None` when it does not fit. The range
    /// is checked later, by the repository, together with the rest of the
    /// rating.
    pub fn score(&self) -> Option<i32> {
        i32::try_from(self.rating).ok()
    }

    /// into_rating
    ///
    /// Attaches the game and the owner to the submitted score.
    pub fn into_rating(self, game_id: &str, user_id: &str) -> Option<Rating> {
        self.score().map(|score| Rating::new(game_id, user_id, score))
    }
}
