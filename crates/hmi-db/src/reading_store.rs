//! The append-only `readings` log.
//!
//! One row per accepted sensor update. Rows are written by the
//! persistence writer and only ever read back for the history query;
//! they never feed the live snapshot.

use chrono::{DateTime, Utc};
use hmi_types::TankId;
use serde::Serialize;
use sqlx::SqlitePool;

use crate::error::DbError;

/// Default number of rows returned by [`ReadingStore::recent`].
pub const DEFAULT_READINGS_LIMIT: u32 = 100;

/// Upper bound on rows returned by [`ReadingStore::recent`].
pub const MAX_READINGS_LIMIT: u32 = 1000;

/// A row from the `readings` table.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ReadingRow {
    /// Auto-incremented row id.
    pub id: i64,
    /// Tank the reading belongs to.
    pub tank_id: String,
    /// Level at the time of the reading.
    pub level: f64,
    /// Flow at the time of the reading (0 when the sensor sent none).
    pub flow: f64,
    /// When the reading was applied.
    pub timestamp: DateTime<Utc>,
}

/// Operations on the `readings` table.
pub struct ReadingStore<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ReadingStore<'a> {
    /// Create a new reading store bound to a connection pool.
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Append a reading. A missing flow is stored as `0.0`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlite`] if the insert fails.
    pub async fn insert(
        &self,
        tank_id: &TankId,
        level: f64,
        flow: Option<f64>,
        timestamp: DateTime<Utc>,
    ) -> Result<(), DbError> {
        sqlx::query("INSERT INTO readings (tank_id, level, flow, timestamp) VALUES (?1, ?2, ?3, ?4)")
            .bind(tank_id.as_str())
            .bind(level)
            .bind(flow.unwrap_or(0.0))
            .bind(timestamp)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Most recent readings, newest first, optionally for one tank.
    ///
    /// `limit` is clamped to `1..=MAX_READINGS_LIMIT`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlite`] if the query fails.
    pub async fn recent(
        &self,
        tank_id: Option<&TankId>,
        limit: u32,
    ) -> Result<Vec<ReadingRow>, DbError> {
        let limit = i64::from(limit.clamp(1, MAX_READINGS_LIMIT));
        let rows = match tank_id {
            Some(id) => {
                sqlx::query_as::<_, ReadingRow>(
                    r"SELECT id, tank_id, level, flow, timestamp
                      FROM readings
                      WHERE tank_id = ?1
                      ORDER BY id DESC
                      LIMIT ?2",
                )
                .bind(id.as_str())
                .bind(limit)
                .fetch_all(self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, ReadingRow>(
                    r"SELECT id, tank_id, level, flow, timestamp
                      FROM readings
                      ORDER BY id DESC
                      LIMIT ?1",
                )
                .bind(limit)
                .fetch_all(self.pool)
                .await?
            }
        };
        Ok(rows)
    }
}
