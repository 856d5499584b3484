//! Login and the optional opaque-token gate.
//!
//! `POST /api/login` checks the configured credentials and issues a random
//! token. Tokens are opaque: the gate only checks membership in the
//! in-memory [`SessionStore`], so every token is invalidated by a restart.
//!
//! When `auth.require_token` is set, [`require_session`] guards the read
//! routes and the real-time channel. The token is taken from an
//! `Authorization: Bearer <token>` header or, for browser `WebSocket`
//! clients that cannot set headers, a `token` query parameter. Sensor
//! ingestion is never gated.

use std::collections::HashSet;
use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

/// In-memory set of issued session tokens.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    tokens: Arc<RwLock<HashSet<Uuid>>>,
}

impl SessionStore {
    /// Create an empty session store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue and remember a new token.
    pub async fn issue(&self) -> Uuid {
        let token = Uuid::new_v4();
        self.tokens.write().await.insert(token);
        token
    }

    /// Whether `token` was issued by this process.
    pub async fn contains(&self, token: &Uuid) -> bool {
        self.tokens.read().await.contains(token)
    }
}

/// Request body for `POST /api/login`.
#[derive(Debug, serde::Deserialize)]
pub struct LoginRequest {
    /// User name.
    pub username: String,
    /// Password.
    pub password: String,
}

/// Response body for a successful login.
#[derive(Debug, serde::Serialize)]
pub struct LoginResponse {
    /// Opaque session token.
    pub token: Uuid,
}

/// `POST /api/login` -- exchange credentials for a session token.
pub async fn login(
    State(state): State<Arc<AppState>>,
    req: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = req.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;

    let Some(expected) = state.auth.password.as_deref() else {
        tracing::warn!(username = %req.username, "Login attempted but no password is configured");
        return Err(ApiError::Unauthorized(String::from("login is disabled")));
    };

    if req.username != state.auth.username || req.password != expected {
        tracing::warn!(username = %req.username, "Rejected login");
        return Err(ApiError::Unauthorized(String::from("invalid credentials")));
    }

    let token = state.sessions.issue().await;
    tracing::info!(username = %req.username, "Issued session token");
    Ok(Json(LoginResponse { token }))
}

/// Middleware rejecting requests without an issued token when the gate
/// is enabled. A no-op otherwise.
pub async fn require_session(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if !state.auth.require_token {
        return Ok(next.run(req).await);
    }

    let token = bearer_token(&req)
        .or_else(|| query_token(&req))
        .ok_or_else(|| ApiError::Unauthorized(String::from("missing token")))?;
    let token = Uuid::parse_str(token)
        .map_err(|e| ApiError::Unauthorized(format!("malformed token: {e}")))?;

    if !state.sessions.contains(&token).await {
        return Err(ApiError::Unauthorized(String::from("unknown token")));
    }

    Ok(next.run(req).await)
}

fn bearer_token(req: &Request) -> Option<&str> {
    req.headers()
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
}

fn query_token(req: &Request) -> Option<&str> {
    req.uri()
        .query()?
        .split('&')
        .find_map(|pair| pair.strip_prefix("token="))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http;

    use super::*;

    #[tokio::test]
    async fn issued_tokens_are_remembered() {
        let sessions = SessionStore::new();
        let token = sessions.issue().await;
        assert!(sessions.contains(&token).await);
        assert!(!sessions.contains(&Uuid::new_v4()).await);
    }

    #[test]
    fn token_from_header_or_query() {
        let req = http::Request::builder()
            .uri("/api/v1/status")
            .header(AUTHORIZATION, "Bearer abc")
            .body(Body::empty())
            .unwrap_or_default();
        assert_eq!(bearer_token(&req), Some("abc"));

        let req = http::Request::builder()
            .uri("/ws?foo=1&token=xyz")
            .body(Body::empty())
            .unwrap_or_default();
        assert_eq!(bearer_token(&req), None);
        assert_eq!(query_token(&req), Some("xyz"));
    }
}
