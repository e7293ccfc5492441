use axum::{
    extract::{Request, State},
    http::{HeaderValue, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::auth::AuthenticatorState;

/// log_requests
///
/// Outermost stage of the chain: records every request URI, including the ones
/// the authentication stage will reject.
pub async fn log_requests(request: Request, next: Next) -> Response {
    tracing::info!(method = %request.method(), uri = %request.uri(), "request received");
    next.run(request).await
}

/// require_user
///
/// Resolves the `Authorization` header through the configured `Authenticator`.
///
/// On success the `User` is stored in the request extensions, where handlers
/// pick it up as `Extension<User>`. On failure the chain stops here with
/// `403 Forbidden`; the handler is never called. A request without a usable
/// header is refused without contacting the verifier.
pub async fn require_user(
    State(authenticator): State<AuthenticatorState>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = match request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
    {
        Some(token) => token.to_owned(),
        None => {
            tracing::info!(uri = %request.uri(), "Missing or unreadable Authorization header");
            return StatusCode::FORBIDDEN.into_response();
        }
    };

    match authenticator.authenticate(&token).await {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(_) => StatusCode::FORBIDDEN.into_response(),
    }
}

/// json_content_type
///
/// Marks every response produced below this stage as JSON, error responses
/// with an empty body included.
pub async fn json_content_type(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    response
}
