//! HTTP API module for sessiond
//!
//! Exposes the current session's data, logout, and admin endpoints.

mod auth;
pub mod routes;
pub mod session_layer;

use crate::error::{Result, SessionError};
use crate::manager::Manager;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Session manager
    pub manager: Arc<Manager>,
    /// Optional API key for the admin endpoints
    pub api_key: Option<String>,
}

/// Start the HTTP API server
pub async fn serve(addr: SocketAddr, state: AppState) -> Result<()> {
    let app = create_router(state);

    // Check if port is already in use (another sessiond instance running)
    if tokio::net::TcpStream::connect(addr).await.is_ok() {
        tracing::error!(
            "Port {} is already in use; another sessiond instance may be running. \
             Use `curl http://{}/health` to check.",
            addr.port(),
            addr
        );
        return Err(SessionError::Api(format!("Port {} already in use", addr.port())));
    }

    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| SessionError::Api(e.to_string()))?;

    Ok(())
}

/// Create the API router with all routes
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Routes bound to the caller's session
    let session_routes = Router::new()
        .route("/session", get(routes::get_session))
        .route(
            "/session/data/:key",
            get(routes::get_value)
                .put(routes::put_value)
                .delete(routes::delete_value),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            session_layer::session_middleware,
        ));

    let admin_routes = Router::new()
        .route("/admin/stats", get(routes::admin_stats))
        .route("/admin/gc", post(routes::admin_gc))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        ));

    // Logout must not start a session of its own
    let api_routes = session_routes
        .merge(admin_routes)
        .route("/logout", post(routes::logout));

    Router::new()
        // Health check (public, no auth required)
        .route("/health", get(routes::health))
        .nest("/api", api_routes)
        // Global middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ProviderRegistry;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use axum::response::Response;
    use tower::ServiceExt;

    fn test_app(api_key: Option<&str>) -> (Router, Arc<Manager>) {
        let registry = ProviderRegistry::with_memory(None);
        let manager = Arc::new(Manager::new(&registry, "memory", "sid", 3600).unwrap());
        let state = AppState {
            manager: manager.clone(),
            api_key: api_key.map(str::to_string),
        };
        (create_router(state), manager)
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn set_cookie(response: &Response) -> Option<String> {
        response
            .headers()
            .get(header::SET_COOKIE)
            .map(|v| v.to_str().unwrap().to_string())
    }

    /// "sid=<value>" pair from a Set-Cookie header
    fn cookie_pair(set_cookie: &str) -> String {
        set_cookie.split(';').next().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _) = test_app(None);
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_session_roundtrip_over_http() {
        let (app, manager) = test_app(None);

        // First request: no cookie, new session issued
        let response = app
            .clone()
            .oneshot(Request::get("/api/session").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let issued = set_cookie(&response).expect("expected Set-Cookie");
        assert!(issued.starts_with("sid="));
        assert!(issued.contains("Path=/"));
        assert!(issued.contains("HttpOnly"));
        assert!(issued.contains("Max-Age=3600"));
        let cookie = cookie_pair(&issued);
        let id = body_json(response).await["id"].as_str().unwrap().to_string();
        assert!(!id.is_empty());

        // Store a value with the cookie: no new cookie
        let response = app
            .clone()
            .oneshot(
                Request::put("/api/session/data/user")
                    .header(header::COOKIE, &cookie)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"name":"alice"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(set_cookie(&response).is_none());

        // Read it back
        let response = app
            .clone()
            .oneshot(
                Request::get("/api/session/data/user")
                    .header(header::COOKIE, &cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["value"]["name"], "alice");

        let response = app
            .clone()
            .oneshot(
                Request::get("/api/session")
                    .header(header::COOKIE, &cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(body_json(response).await["id"], id);

        // Missing key
        let response = app
            .clone()
            .oneshot(
                Request::delete("/api/session/data/nope")
                    .header(header::COOKIE, &cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        // Logout clears the cookie and the session
        let response = app
            .clone()
            .oneshot(
                Request::post("/api/logout")
                    .header(header::COOKIE, &cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let cleared = set_cookie(&response).expect("expected removal cookie");
        assert!(cleared.starts_with("sid=;"));
        assert!(cleared.contains("Max-Age=0"));
        assert_eq!(manager.session_count(), 0);
    }

    #[tokio::test]
    async fn test_logout_without_cookie_is_noop() {
        let (app, manager) = test_app(None);
        let response = app
            .oneshot(Request::post("/api/logout").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(set_cookie(&response).is_none());
        assert_eq!(body_json(response).await["logged_out"], false);
        assert_eq!(manager.session_count(), 0);
    }

    #[tokio::test]
    async fn test_admin_requires_api_key() {
        let (app, _) = test_app(Some("secret"));

        let response = app
            .clone()
            .oneshot(Request::get("/api/admin/stats").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app
            .clone()
            .oneshot(
                Request::get("/api/admin/stats")
                    .header(header::AUTHORIZATION, "Bearer wrong")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app
            .clone()
            .oneshot(
                Request::get("/api/admin/stats")
                    .header(header::AUTHORIZATION, "Bearer secret")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let stats = body_json(response).await;
        assert_eq!(stats["provider"], "memory");
        assert_eq!(stats["cookie_name"], "sid");
        assert_eq!(stats["sessions"], 0);

        let response = app
            .oneshot(
                Request::post("/api/admin/gc")
                    .header(header::AUTHORIZATION, "Bearer secret")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["removed"], 0);
    }
}
