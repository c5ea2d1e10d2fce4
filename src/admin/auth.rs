use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::Response,
};

use crate::http::server::AppState;

/// Gate for `/admin/*`: 404 when the surface is disabled, 401 without the
/// configured bearer token.
pub async fn admin_auth_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let inner = state.inner.load_full();

    if !inner.config.admin.enabled {
        return Err(StatusCode::NOT_FOUND);
    }

    let authorized = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .is_some_and(|token| key_matches(inner.config.admin.api_key.trim(), token));

    if authorized {
        return Ok(next.run(request).await);
    }

    tracing::warn!(path = %request.uri().path(), "Rejected unauthenticated admin request");
    Err(StatusCode::UNAUTHORIZED)
}

/// Constant-time comparison of the presented token against the configured key.
/// An empty key never matches.
fn key_matches(expected: &str, presented: &str) -> bool {
    !expected.is_empty()
        && expected.len() == presented.len()
        && expected
            .as_bytes()
            .iter()
            .zip(presented.as_bytes())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}
