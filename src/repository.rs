use crate::models::{AvgRating, Rating};
use async_trait::async_trait;
use sqlx::{
    PgPool,
    postgres::{PgConnectOptions, PgPoolOptions},
};
use std::{
    collections::HashMap,
    str::FromStr,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

/// Deadline for the liveness check run by `initialize`.
pub const STARTUP_TIMEOUT: Duration = Duration::from_secs(5);

/// RepositoryError
///
/// Failure of a repository operation. A missing rating is not an error; see
/// `RatingRepository::get_rating`.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Invalid rating update: {rating} for game {game_id}")]
    InvalidRating { game_id: String, rating: i32 },
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Database did not respond within {0:?}")]
    Timeout(Duration),
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// RatingRepository
///
/// Read/write access to stored ratings. Handlers only ever see this trait, so
/// the backing store can be replaced without touching them.
///
/// **Send + Sync + async_trait** make `Arc<dyn RatingRepository>` shareable
/// across Axum's request tasks.
#[async_trait]
pub trait RatingRepository: Send + Sync {
    /// Verifies the store is reachable and ready. Must succeed before any
    /// traffic is served.
    async fn initialize(&self) -> RepositoryResult<()>;

    /// Mean rating of every rated game, highest first. Empty when nothing has
    /// been rated.
    async fn get_avg_ratings(&self) -> RepositoryResult<Vec<AvgRating>>;

    /// The rating `user_id` gave `game_id`, or `Rating::unrated(game_id)`.
    async fn get_rating(&self, game_id: &str, user_id: &str) -> RepositoryResult<Rating>;

    /// Validates `rating` and upserts it under `(game_id, user_id)`. Invalid
    /// ratings never reach the store.
    async fn put_rating(&self, rating: Rating) -> RepositoryResult<()>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn RatingRepository>;

fn check(rating: &Rating) -> RepositoryResult<()> {
    if rating.valid() {
        return Ok(());
    }
    tracing::warn!(
        game_id = %rating.game_id,
        user_id = %rating.user_id,
        rating = rating.rating,
        "Invalid rating update"
    );
    Err(RepositoryError::InvalidRating {
        game_id: rating.game_id.clone(),
        rating: rating.rating,
    })
}

/// PostgresRatingRepository
///
/// `RatingRepository` backed by a single Postgres table with primary key
/// `(game_id, user_id)`.
pub struct PostgresRatingRepository {
    pool: PgPool,
    table: String,
}

impl PostgresRatingRepository {
    /// new
    ///
    /// Builds a lazily connecting pool bound to `db_name`, whatever database
    /// `db_url` names. No connection is attempted until `initialize`.
    ///
    /// `table` must be a plain identifier; `AppConfig::load` enforces this.
    pub fn new(db_url: &str, db_name: &str, table: &str) -> RepositoryResult<Self> {
        let options = PgConnectOptions::from_str(db_url)?.database(db_name);
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(STARTUP_TIMEOUT)
            .connect_lazy_with(options);

        Ok(Self::with_pool(pool, table))
    }

    /// Wraps an existing pool.
    pub fn with_pool(pool: PgPool, table: &str) -> Self {
        Self {
            pool,
            table: table.to_string(),
        }
    }

    async fn ping(&self) -> RepositoryResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        self.ensure_table().await
    }

    async fn ensure_table(&self) -> RepositoryResult<()> {
        let ddl = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                game_id TEXT NOT NULL,
                user_id TEXT NOT NULL,
                rating INTEGER NOT NULL CHECK (rating BETWEEN 1 AND 5),
                PRIMARY KEY (game_id, user_id)
            )
            "#,
            self.table
        );
        sqlx::query(&ddl).execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl RatingRepository for PostgresRatingRepository {
    /// initialize
    ///
    /// Pings the database and makes sure the ratings table exists, all within
    /// `STARTUP_TIMEOUT`.
    async fn initialize(&self) -> RepositoryResult<()> {
        tokio::time::timeout(STARTUP_TIMEOUT, self.ping())
            .await
            .map_err(|_| RepositoryError::Timeout(STARTUP_TIMEOUT))??;

        tracing::info!(table = %self.table, "Successfully connected to the rating store");
        Ok(())
    }

    /// get_avg_ratings
    ///
    /// `AVG` over an integer column yields NUMERIC, hence the cast to FLOAT8.
    async fn get_avg_ratings(&self) -> RepositoryResult<Vec<AvgRating>> {
        let query = format!(
            r#"
            SELECT game_id, AVG(rating)::FLOAT8 AS rating
            FROM {}
            GROUP BY game_id
            ORDER BY rating DESC
            "#,
            self.table
        );

        sqlx::query_as::<_, AvgRating>(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Error retrieving ratings: {:?}", e);
                RepositoryError::from(e)
            })
    }

    async fn get_rating(&self, game_id: &str, user_id: &str) -> RepositoryResult<Rating> {
        let query = format!(
            "SELECT user_id, game_id, rating FROM {} WHERE game_id = $1 AND user_id = $2",
            self.table
        );

        let found = sqlx::query_as::<_, Rating>(&query)
            .bind(game_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Error retrieving rating: {:?}", e);
                RepositoryError::from(e)
            })?;

        Ok(found.unwrap_or_else(|| Rating::unrated(game_id)))
    }

    /// put_rating
    ///
    /// Single-statement upsert; the primary key makes concurrent writers for
    /// the same pair collapse into one row.
    async fn put_rating(&self, rating: Rating) -> RepositoryResult<()> {
        check(&rating)?;

        let query = format!(
            r#"
            INSERT INTO {} (game_id, user_id, rating)
            VALUES ($1, $2, $3)
            ON CONFLICT (game_id, user_id) DO UPDATE SET rating = EXCLUDED.rating
            "#,
            self.table
        );

        sqlx::query(&query)
            .bind(&rating.game_id)
            .bind(&rating.user_id)
            .bind(rating.rating)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Error updating rating: {:?}", e);
                RepositoryError::from(e)
            })?;

        Ok(())
    }
}

/// InMemoryRatingRepository
///
/// A `RatingRepository` living in process memory, used by the test-suite to
/// exercise handlers and the router without a database. Follows the same
/// contract as `PostgresRatingRepository`.
///
/// Every trait call is counted, so tests can assert that a request was
/// rejected before reaching the store.
#[derive(Default)]
pub struct InMemoryRatingRepository {
    ratings: Mutex<HashMap<(String, String), i32>>,
    calls: AtomicUsize,
}

impl InMemoryRatingRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of repository operations served so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of stored ratings.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<(String, String), i32>> {
        // Recovers the map from a poisoned lock.
        self.ratings
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn record_call(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl RatingRepository for InMemoryRatingRepository {
    async fn initialize(&self) -> RepositoryResult<()> {
        Ok(())
    }

    async fn get_avg_ratings(&self) -> RepositoryResult<Vec<AvgRating>> {
        self.record_call();

        let mut totals: HashMap<String, (i64, i64)> = HashMap::new();
        for ((game_id, _), rating) in self.lock().iter() {
            let entry = totals.entry(game_id.clone()).or_default();
            entry.0 += i64::from(*rating);
            entry.1 += 1;
        }

        let mut averages: Vec<AvgRating> = totals
            .into_iter()
            .map(|(game_id, (sum, count))| AvgRating {
                game_id,
                rating: sum as f64 / count as f64,
            })
            .collect();
        averages.sort_by(|a, b| b.rating.total_cmp(&a.rating));

        Ok(averages)
    }

    async fn get_rating(&self, game_id: &str, user_id: &str) -> RepositoryResult<Rating> {
        self.record_call();

        let key = (game_id.to_string(), user_id.to_string());
        Ok(match self.lock().get(&key) {
            Some(score) => Rating::new(game_id, user_id, *score),
            None => Rating::unrated(game_id),
        })
    }

    async fn put_rating(&self, rating: Rating) -> RepositoryResult<()> {
        self.record_call();
        check(&rating)?;

        self.lock()
            .insert((rating.game_id, rating.user_id), rating.rating);
        Ok(())
    }
}
