//! Data layer for the HMI backend (`SQLite`).
//!
//! `SQLite` holds the durable subset of plant state: tank levels and
//! descriptive fields, pump state, and an append-only log of readings.
//! It seeds the live snapshot once at startup and is otherwise only
//! written to, through the [`PersistenceWriter`].
//!
//! # Architecture
//!
//! ```text
//! Startup
//!     |
//!     +-- SqliteStore::init_schema --> create / evolve / seed
//!     +-- PlantStore::load_state ----> initial HmiState
//!
//! Each commit (StateCoordinator)
//!     |
//!     +-- PersistenceWriter (queue) --> background task
//!         |-- PlantStore   (tank level, pump state)
//!         +-- ReadingStore (append-only readings)
//! ```
//!
//! # Modules
//!
//! - [`sqlite`] -- Connection pool and configuration
//! - [`schema`] -- Idempotent schema setup and seed rows
//! - [`plant_store`] -- Tank and pump rows
//! - [`reading_store`] -- Reading log insert and query
//! - [`writer`] -- Queued best-effort write-through
//! - [`error`] -- Shared error types
//!
//! [`PersistenceWriter`]: writer::PersistenceWriter

pub mod error;
pub mod plant_store;
pub mod reading_store;
pub mod schema;
pub mod sqlite;
pub mod writer;

// Re-export primary types for convenience.
pub use error::DbError;
pub use plant_store::{PlantStore, PumpRow, TankRow};
pub use reading_store::{DEFAULT_READINGS_LIMIT, MAX_READINGS_LIMIT, ReadingRow, ReadingStore};
pub use sqlite::{SqliteConfig, SqliteLocation, SqliteStore};
pub use writer::{PersistJob, PersistenceWriter, StateSink};
