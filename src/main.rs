use game_ratings::{
    AppState,
    auth::{AuthenticatorState, VerifierClient},
    config::{AppConfig, Env},
    create_router,
    repository::{PostgresRatingRepository, RatingRepository, RepositoryState},
};
use std::{process, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Startup order: configuration, logging, rating store, verifier client, HTTP
/// server. Any failure before the listener is bound ends the process with a
/// non-zero status, so a misconfigured instance never serves traffic.
#[tokio::main]
async fn main() {
    // 1. Configuration (fail-fast)
    dotenv::dotenv().ok();
    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("FATAL: {e}");
            process::exit(1);
        }
    };

    // 2. Logging
    // RUST_LOG wins; otherwise debug for this crate and request summaries from tower_http.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "game_ratings=debug,tower_http=info".into());

    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    // 3. Rating store
    let repo = match PostgresRatingRepository::new(
        &config.db_url,
        &config.db_name,
        &config.ratings_table,
    ) {
        Ok(repo) => repo,
        Err(e) => fatal("Invalid database configuration", e),
    };

    if let Err(e) = repo.initialize().await {
        fatal("Cannot connect to database", e);
    }

    let repo = Arc::new(repo) as RepositoryState;

    // 4. Verifier client
    let authenticator = match VerifierClient::new(config.verifier_uri.clone()) {
        Ok(client) => {
            tracing::info!("Authenticating requests against {}", client.verifier_uri());
            Arc::new(client) as AuthenticatorState
        }
        Err(e) => fatal("Cannot build the verifier client", e),
    };

    // 5. Router and server
    let app = create_router(AppState::new(repo, authenticator));

    let address = config.bind_address();
    let listener = match TcpListener::bind(&address).await {
        Ok(listener) => listener,
        Err(e) => fatal("Cannot bind listener", e),
    };

    tracing::info!("Listening on {}", address);

    if let Err(e) = axum::serve(listener, app).await {
        fatal("Server error", e);
    }
}

fn fatal(context: &str, error: impl std::fmt::Display) -> ! {
    tracing::error!("{}: {}", context, error);
    process::exit(1);
}
