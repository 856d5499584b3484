//! Error types for the data layer.
//!
//! All errors are propagated via [`DbError`] which wraps the underlying
//! [`sqlx`] error with context about which operation failed.

/// Errors that can occur in the data layer.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A `SQLite` operation failed.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] sqlx::Error),

    /// A statement affected no row where one was expected.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Table-level entity name (`tank`, `pump`).
        entity: &'static str,
        /// The id that matched nothing.
        id: String,
    },

    /// A configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}
