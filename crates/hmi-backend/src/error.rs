//! Error types for the backend binary.
//!
//! [`BackendError`] is the top-level error type that wraps all possible
//! failure modes during startup and serving.

/// Top-level error for the backend binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// Configuration loading or validation failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: hmi_core::config::ConfigError,
    },

    /// The entity store could not be opened, initialized, or loaded.
    #[error("database error: {source}")]
    Database {
        /// The underlying database error.
        #[from]
        source: hmi_db::DbError,
    },

    /// The HTTP server failed to bind or serve.
    #[error("server error: {source}")]
    Server {
        /// The underlying server error.
        #[from]
        source: hmi_server::ServerError,
    },

    /// The logging subscriber could not be installed.
    #[error("logging error: {message}")]
    Logging {
        /// Description of the failure.
        message: String,
    },
}
