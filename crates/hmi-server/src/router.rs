//! Axum router construction for the HMI API.
//!
//! Assembles all routes (REST + `WebSocket`) into a single [`Router`]
//! with CORS enabled for the dashboard, request tracing, and a panic
//! guard that turns a handler panic into a plain 500 response.

use std::any::Any;
use std::sync::Arc;

use axum::Router;
use axum::http::StatusCode;
use axum::middleware;
use axum::response::Response;
use axum::routing::{get, post};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any as AnyOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth;
use crate::error::error_response;
use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the complete Axum router.
///
/// The router includes:
/// - `POST /api/v1/sensor/update` -- sensor ingestion (never gated)
/// - `POST /api/login` -- session token issue
/// - `GET /api/v1/status` -- current snapshot
/// - `GET /api/v1/readings` -- persisted reading log
/// - `GET /api/v1/alerts/history` -- alert history
/// - `POST /api/v1/alerts/history/{id}/acknowledge` -- acknowledge a record
/// - `GET /ws` -- `WebSocket` snapshot stream
///
/// The last five sit behind [`auth::require_session`], which only
/// enforces anything when `auth.require_token` is set.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AnyOrigin)
        .allow_methods(AnyOrigin)
        .allow_headers(AnyOrigin);

    let gated = Router::new()
        .route("/api/v1/status", get(handlers::get_status))
        .route("/api/v1/readings", get(handlers::list_readings))
        .route("/api/v1/alerts/history", get(handlers::list_alert_history))
        .route(
            "/api/v1/alerts/history/{id}/acknowledge",
            post(handlers::acknowledge_alert),
        )
        .route("/ws", get(ws::ws_updates))
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            auth::require_session,
        ));

    Router::new()
        .route("/api/v1/sensor/update", post(handlers::sensor_update))
        .route("/api/login", post(auth::login))
        .merge(gated)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(panic_response))
        .with_state(state)
}

/// Convert a handler panic into the standard 500 error body.
///
/// The snapshot is replaced whole on commit, so a panic inside a handler
/// cannot leave it half-updated.
fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!(panic = detail, "Request handler panicked");
    error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn panic_becomes_generic_500() {
        for payload in [
            Box::new("boom") as Box<dyn Any + Send>,
            Box::new(String::from("boom")),
            Box::new(42_u8),
        ] {
            let response = panic_response(payload);
            assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

            let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .ok()
                .unwrap_or_default();
            let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap_or_default();
            assert_eq!(
                json,
                serde_json::json!({"error": "internal server error", "status": 500})
            );
        }
    }
}
