//! Session middleware: binds each request to a session and executes the
//! manager's cookie instruction on the response.

use super::AppState;
use crate::cookie::{self, SetCookie};
use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

/// Resolve the request's session and expose it as `Extension<Session>`.
///
/// A request without a usable session cookie gets a new session and the
/// response gets the `Set-Cookie` for it. If no identifier can be generated
/// the request fails with 500 rather than continuing without a session.
pub async fn session_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let incoming = cookie_value(request.headers(), state.manager.cookie_name());

    let (session, set_cookie) = match state.manager.start(incoming.as_deref()) {
        Ok(resolved) => resolved,
        Err(e) => {
            tracing::error!("Failed to start session: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": e.to_string() })),
            )
                .into_response();
        }
    };

    request.extensions_mut().insert(session);
    let mut response = next.run(request).await;

    if let Some(set_cookie) = set_cookie {
        append_set_cookie(&mut response, &set_cookie);
    }
    response
}

/// Value of cookie `name` across all `Cookie` headers of a request
pub(crate) fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .find_map(|h| cookie::find(h, name))
        .map(str::to_string)
}

pub(crate) fn append_set_cookie(response: &mut Response, set_cookie: &SetCookie) {
    match HeaderValue::from_str(&set_cookie.to_header_value()) {
        Ok(value) => {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
        Err(e) => tracing::warn!("Dropping unencodable Set-Cookie header: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cookie_value_across_headers() {
        let mut headers = HeaderMap::new();
        headers.append(header::COOKIE, HeaderValue::from_static("a=1"));
        headers.append(header::COOKIE, HeaderValue::from_static("b=2; sid=xyz"));

        assert_eq!(cookie_value(&headers, "sid").as_deref(), Some("xyz"));
        assert_eq!(cookie_value(&headers, "a").as_deref(), Some("1"));
        assert_eq!(cookie_value(&headers, "zzz"), None);
    }
}
