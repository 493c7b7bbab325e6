//! HTTP route handlers for the API

use super::session_layer::{append_set_cookie, cookie_value};
use super::AppState;
use crate::store::Session;
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde_json::Value;

// ============================================================================
// Health Check
// ============================================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

// ============================================================================
// Session data
// ============================================================================

pub async fn get_session(Extension(session): Extension<Session>) -> impl IntoResponse {
    Json(serde_json::json!({
        "id": session.id(),
        "created_at": session.created_at().to_rfc3339(),
        "data": session.snapshot(),
    }))
}

pub async fn get_value(
    Extension(session): Extension<Session>,
    Path(key): Path<String>,
) -> impl IntoResponse {
    match session.get_value(&key) {
        Some(value) => Json(serde_json::json!({ "key": key, "value": value })).into_response(),
        None => not_found(&key),
    }
}

pub async fn put_value(
    Extension(session): Extension<Session>,
    Path(key): Path<String>,
    Json(value): Json<Value>,
) -> impl IntoResponse {
    match session.set(key.clone(), &value) {
        Ok(()) => Json(serde_json::json!({ "key": key, "value": value })).into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": e.to_string() })),
        )
            .into_response(),
    }
}

pub async fn delete_value(
    Extension(session): Extension<Session>,
    Path(key): Path<String>,
) -> impl IntoResponse {
    match session.delete(&key) {
        Some(value) => Json(serde_json::json!({ "key": key, "removed": value })).into_response(),
        None => not_found(&key),
    }
}

fn not_found(key: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "error": format!("Session key not found: {}", key) })),
    )
        .into_response()
}

// ============================================================================
// Logout
// ============================================================================

pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    let incoming = cookie_value(&headers, state.manager.cookie_name());

    match state.manager.destroy(incoming.as_deref()) {
        Ok(Some(removal)) => {
            let mut response = Json(serde_json::json!({ "logged_out": true })).into_response();
            append_set_cookie(&mut response, &removal);
            response
        }
        Ok(None) => Json(serde_json::json!({ "logged_out": false })).into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": e.to_string() })),
        )
            .into_response(),
    }
}

// ============================================================================
// Admin
// ============================================================================

pub async fn admin_stats(State(state): State<AppState>) -> impl IntoResponse {
    let manager = &state.manager;
    Json(serde_json::json!({
        "provider": manager.provider_name(),
        "sessions": manager.session_count(),
        "cookie_name": manager.cookie_name(),
        "max_lifetime_secs": manager.max_lifetime().as_secs(),
    }))
}

pub async fn admin_gc(State(state): State<AppState>) -> impl IntoResponse {
    match state.manager.gc() {
        Ok(removed) => {
            tracing::info!("Manual GC removed {} expired sessions", removed);
            Json(serde_json::json!({ "removed": removed })).into_response()
        }
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": e.to_string() })),
        )
            .into_response(),
    }
}
