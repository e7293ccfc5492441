use async_trait::async_trait;
use axum::http::{StatusCode, header};
use std::{collections::HashMap, sync::Arc, time::Duration};

use crate::models::User;

/// Upper bound on a single round-trip to the verifier.
pub const VERIFIER_TIMEOUT: Duration = Duration::from_secs(5);

/// AuthError
///
/// The only failure the authentication layer reports. Whether the verifier
/// refused the token, was unreachable or answered with garbage is logged
/// server side and not carried by this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Authentication failed")]
pub struct AuthError;

/// Authenticator
///
/// Resolves a raw `Authorization` header value into the `User` it belongs to.
/// Implemented by the real verifier client and by `MockAuthenticator` for tests.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, token: &str) -> Result<User, AuthError>;
}

/// AuthenticatorState
///
/// The concrete type used to share the authenticator across the application state.
pub type AuthenticatorState = Arc<dyn Authenticator>;

/// VerifierClient
///
/// Delegates authentication to the external verifier service. The token is
/// forwarded untouched in the outbound `Authorization` header; only a `200 OK`
/// carrying a decodable `User` counts as success.
#[derive(Clone)]
pub struct VerifierClient {
    client: reqwest::Client,
    verifier_uri: String,
}

impl VerifierClient {
    /// new
    ///
    /// Builds the HTTP client with `VERIFIER_TIMEOUT` applied to every call.
    pub fn new(verifier_uri: impl Into<String>) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(VERIFIER_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            verifier_uri: verifier_uri.into(),
        })
    }

    pub fn verifier_uri(&self) -> &str {
        &self.verifier_uri
    }
}

#[async_trait]
impl Authenticator for VerifierClient {
    async fn authenticate(&self, token: &str) -> Result<User, AuthError> {
        let response = self
            .client
            .get(&self.verifier_uri)
            .header(header::AUTHORIZATION, token)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(
                    uri = %self.verifier_uri,
                    token,
                    "Error reading authentication response: {}",
                    e
                );
                AuthError
            })?;

        if response.status() != StatusCode::OK {
            tracing::info!(
                uri = %self.verifier_uri,
                status = %response.status(),
                token,
                "Authentication failed"
            );
            return Err(AuthError);
        }

        let user = response.json::<User>().await.map_err(|e| {
            tracing::warn!(uri = %self.verifier_uri, token, "Error decoding authentication response JSON: {}", e);
            AuthError
        })?;

        tracing::debug!(token, user_id = %user.id, "Authentication passed");
        Ok(user)
    }
}

/// MockAuthenticator
///
/// A fixed token table standing in for the verifier in tests. Unknown tokens
/// fail exactly like a refusal from the real service.
#[derive(Clone, Default)]
pub struct MockAuthenticator {
    users: HashMap<String, User>,
}

impl MockAuthenticator {
    /// Rejects every token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Accepts `token` as `user`, in addition to previously registered tokens.
    pub fn accepting(mut self, token: impl Into<String>, user: User) -> Self {
        self.users.insert(token.into(), user);
        self
    }
}

#[async_trait]
impl Authenticator for MockAuthenticator {
    async fn authenticate(&self, token: &str) -> Result<User, AuthError> {
        self.users.get(token).cloned().ok_or(AuthError)
    }
}
