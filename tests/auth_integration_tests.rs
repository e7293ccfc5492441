use axum::{
    Json, Router,
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
    routing::get,
};
use game_ratings::{
    auth::{AuthError, Authenticator, MockAuthenticator, VerifierClient},
    models::User,
};
use tokio::net::TcpListener;

// --- Fake verifier ---

const GOOD_TOKEN: &str = "Bearer good-token";

/// Accepts `GOOD_TOKEN` only and echoes the received header back in the
/// user's nickname, so tests can check it arrives unmodified.
async fn verify(headers: HeaderMap) -> impl IntoResponse {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();

    if token != GOOD_TOKEN {
        return (StatusCode::UNAUTHORIZED, "nope").into_response();
    }

    Json(serde_json::json!({
        "id": "user-1",
        "email": "player@example.com",
        "nickname": token,
    }))
    .into_response()
}

async fn spawn_verifier() -> String {
    let router = Router::new()
        .route("/verify", get(verify))
        .route("/garbage", get(|| async { "this is not json" }))
        .route(
            "/no-id",
            get(|| async { Json(serde_json::json!({ "email": "a@b.c" })) }),
        )
        .route(
            "/created",
            get(|| async { (StatusCode::CREATED, Json(serde_json::json!({ "id": "u" }))) }),
        );

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let address = format!("http://{}", listener.local_addr().unwrap());

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    address
}

// --- VerifierClient ---

#[tokio::test]
async fn test_verifier_accepts_good_token() {
    let base = spawn_verifier().await;
    let client = VerifierClient::new(format!("{base}/verify")).unwrap();

    let user = client.authenticate(GOOD_TOKEN).await.unwrap();

    assert_eq!(user.id, "user-1");
    assert_eq!(user.email.as_deref(), Some("player@example.com"));
    // The token reached the verifier exactly as the caller sent it.
    assert_eq!(user.nickname.as_deref(), Some(GOOD_TOKEN));
    assert_eq!(user.profile_photo, None);
}

#[tokio::test]
async fn test_verifier_refusal_is_auth_error() {
    let base = spawn_verifier().await;
    let client = VerifierClient::new(format!("{base}/verify")).unwrap();

    assert_eq!(client.authenticate("Bearer bad").await, Err(AuthError));
    assert_eq!(client.authenticate("").await, Err(AuthError));
}

#[tokio::test]
async fn test_non_200_success_status_is_auth_error() {
    let base = spawn_verifier().await;
    let client = VerifierClient::new(format!("{base}/created")).unwrap();

    assert_eq!(client.authenticate(GOOD_TOKEN).await, Err(AuthError));
}

#[tokio::test]
async fn test_undecodable_payload_is_auth_error() {
    let base = spawn_verifier().await;

    let client = VerifierClient::new(format!("{base}/garbage")).unwrap();
    assert_eq!(client.authenticate(GOOD_TOKEN).await, Err(AuthError));

    let client = VerifierClient::new(format!("{base}/no-id")).unwrap();
    assert_eq!(client.authenticate(GOOD_TOKEN).await, Err(AuthError));
}

#[tokio::test]
async fn test_unreachable_verifier_is_auth_error() {
    // Bind then drop a listener to get a port nobody listens on.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    drop(listener);

    let client = VerifierClient::new(format!("http://{address}/verify")).unwrap();

    assert_eq!(client.authenticate(GOOD_TOKEN).await, Err(AuthError));
}

#[tokio::test]
async fn test_verifier_client_keeps_uri() {
    let client = VerifierClient::new("http://verifier.local/verify").unwrap();
    assert_eq!(client.verifier_uri(), "http://verifier.local/verify");
}

#[test]
fn test_auth_error_is_opaque() {
    assert_eq!(AuthError.to_string(), "Authentication failed");
}

// --- MockAuthenticator ---

#[tokio::test]
async fn test_mock_authenticator_accepts_registered_tokens_only() {
    let mock = MockAuthenticator::new()
        .accepting("t1", User::with_id("u1"))
        .accepting("t2", User::with_id("u2"));

    assert_eq!(mock.authenticate("t1").await.unwrap().id, "u1");
    assert_eq!(mock.authenticate("t2").await.unwrap().id, "u2");
    assert_eq!(mock.authenticate("t3").await, Err(AuthError));
    assert_eq!(MockAuthenticator::new().authenticate("t1").await, Err(AuthError));
}
