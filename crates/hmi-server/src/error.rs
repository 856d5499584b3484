//! Error types for the HTTP API.
//!
//! [`ApiError`] unifies all failure modes into a single enum that
//! can be converted into an Axum HTTP response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation. Every
//! error body has the shape `{"error": <message>, "status": <code>}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use hmi_db::DbError;

/// Errors that can occur in the API layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// The request body or query could not be used.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// A UUID could not be parsed from the request path.
    #[error("invalid UUID: {0}")]
    InvalidUuid(String),

    /// Missing or unknown credentials.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The entity store failed.
    #[error("database error: {0}")]
    Database(#[from] DbError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Self::BadRequest(msg) | Self::InvalidUuid(msg) => {
                (StatusCode::BAD_REQUEST, msg.clone())
            }
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            Self::Database(e) => {
                tracing::error!(error = %e, "Database error while serving request");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    String::from("internal server error"),
                )
            }
        };

        error_response(status, &message)
    }
}

/// Build the standard JSON error body for `status`.
pub fn error_response(status: StatusCode, message: &str) -> Response {
    let body = serde_json::json!({
        "error": message,
        "status": status.as_u16(),
    });

    (status, axum::Json(body)).into_response()
}
