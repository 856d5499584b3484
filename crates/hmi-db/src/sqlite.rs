//! `SQLite` connection pool and configuration.
//!
//! `SQLite` is the entity store for the HMI backend. It holds the durable
//! tank and pump fields and the append-only reading log.
//!
//! Uses [`sqlx`] with runtime query construction (not compile-time checked)
//! to avoid requiring a database at build time. All queries are
//! parameterized.

use std::str::FromStr;
use std::time::Duration;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};

use crate::error::DbError;
use crate::schema;

/// Default maximum number of connections in the pool.
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Default connection acquire timeout in seconds.
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;

/// How long a writer waits on a locked database before failing.
const DEFAULT_BUSY_TIMEOUT_SECS: u64 = 5;

/// Where the database lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqliteLocation {
    /// A file on disk, created if missing.
    File(String),
    /// A private in-memory database, lost when the pool closes.
    Memory,
}

/// Configuration for the `SQLite` connection pool.
#[derive(Debug, Clone)]
pub struct SqliteConfig {
    /// Database location.
    pub location: SqliteLocation,
    /// Maximum number of connections in the pool.
    pub max_connections: u32,
    /// Connection acquire timeout.
    pub connect_timeout: Duration,
}

impl SqliteConfig {
    /// Configuration for a database file at `path`.
    pub fn new(path: &str) -> Self {
        Self {
            location: SqliteLocation::File(path.to_owned()),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        }
    }

    /// Configuration for an in-memory database.
    ///
    /// Every pooled connection to `:memory:` would open its own empty
    /// database, so the pool is pinned to a single connection that never
    /// expires.
    pub const fn in_memory() -> Self {
        Self {
            location: SqliteLocation::Memory,
            max_connections: 1,
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        }
    }

    /// Set the maximum number of connections. Ignored for in-memory databases.
    #[must_use]
    pub const fn with_max_connections(mut self, max: u32) -> Self {
        if matches!(self.location, SqliteLocation::File(_)) {
            self.max_connections = max;
        }
        self
    }
}

/// Connection pool handle to the entity store.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open the database described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Config`] if the location cannot be turned into
    /// connect options, or [`DbError::Sqlite`] if the connection fails.
    pub async fn connect(config: &SqliteConfig) -> Result<Self, DbError> {
        let busy = Duration::from_secs(DEFAULT_BUSY_TIMEOUT_SECS);
        let pool = match &config.location {
            SqliteLocation::File(path) => {
                let options = SqliteConnectOptions::new()
                    .filename(path)
                    .create_if_missing(true)
                    .journal_mode(SqliteJournalMode::Wal)
                    .busy_timeout(busy);
                SqlitePoolOptions::new()
                    .max_connections(config.max_connections)
                    .acquire_timeout(config.connect_timeout)
                    .connect_with(options)
                    .await?
            }
            SqliteLocation::Memory => {
                let options = SqliteConnectOptions::from_str("sqlite::memory:")
                    .map_err(|e| DbError::Config(format!("Invalid in-memory options: {e}")))?
                    .busy_timeout(busy);
                SqlitePoolOptions::new()
                    .max_connections(1)
                    .min_connections(1)
                    .idle_timeout(None)
                    .max_lifetime(None)
                    .acquire_timeout(config.connect_timeout)
                    .connect_with(options)
                    .await?
            }
        };

        tracing::info!(
            location = ?config.location,
            max_connections = config.max_connections,
            "Connected to SQLite"
        );

        Ok(Self { pool })
    }

    /// Create tables, evolve older layouts, and insert seed rows.
    ///
    /// Safe to run on every start against a fresh or populated database.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlite`] if any statement fails; the whole
    /// setup is rolled back in that case.
    pub async fn init_schema(&self) -> Result<(), DbError> {
        schema::init(&self.pool).await?;
        tracing::info!("Database schema ready");
        Ok(())
    }

    /// Return a reference to the underlying [`SqlitePool`].
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close all connections in the pool gracefully.
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::info!("SQLite pool closed");
    }
}
