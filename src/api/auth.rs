//! Authentication middleware for the admin endpoints

use super::AppState;
use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

/// Admin authentication middleware
///
/// If `api_key` is configured in AppState, validates the Authorization header.
/// Expected format: `Authorization: Bearer <api_key>`
///
/// If no `api_key` is configured, all requests are allowed (local mode).
pub async fn auth_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let Some(expected_key) = &state.api_key else {
        return next.run(request).await;
    };

    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let error = match auth_header.map(bearer_token) {
        Some(Some(provided_key)) if provided_key == expected_key => {
            return next.run(request).await;
        }
        Some(Some(_)) => "Invalid API key",
        Some(None) => "Invalid Authorization header format. Expected: Bearer <api_key>",
        None => "API key required. Set Authorization: Bearer <api_key>",
    };

    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({ "error": error })),
    )
        .into_response()
}

fn bearer_token(header: &str) -> Option<&str> {
    header.strip_prefix("Bearer ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_token_extraction() {
        assert_eq!(bearer_token("Bearer my-secret-key"), Some("my-secret-key"));
        assert_eq!(bearer_token("Basic abc"), None);
    }
}
