//! Tank and pump rows: startup load and single-row updates.

use hmi_types::{HmiState, Pump, PumpId, Tank, TankCategory, TankId};
use sqlx::SqlitePool;

use crate::error::DbError;

/// A row of the `tanks` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TankRow {
    /// Tank tag.
    pub id: String,
    /// Last persisted level.
    pub level: f64,
    /// Building block.
    pub bloco: Option<String>,
    /// Stored category (`inferior` / `superior`).
    pub categoria: Option<String>,
    /// Installation site.
    pub local: Option<String>,
}

impl From<TankRow> for Tank {
    fn from(row: TankRow) -> Self {
        let category = row.categoria.as_deref().and_then(|value| {
            let parsed = TankCategory::parse(value);
            if parsed.is_none() {
                tracing::warn!(tank_id = %row.id, value, "Ignoring unknown tank category");
            }
            parsed
        });
        let mut tank = Self::new(row.id, row.level);
        tank.block = row.bloco;
        tank.category = category;
        tank.location = row.local;
        tank
    }
}

/// A row of the `pumps` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PumpRow {
    /// Pump tag.
    pub id: String,
    /// Stored as 0 or 1.
    pub is_on: i64,
    /// Last persisted flow.
    pub flow: Option<f64>,
}

impl From<PumpRow> for Pump {
    fn from(row: PumpRow) -> Self {
        Self {
            id: PumpId::new(row.id),
            on: row.is_on != 0,
            flow: row.flow,
        }
    }
}

/// Operations on the `tanks` and `pumps` tables.
pub struct PlantStore<'a> {
    pool: &'a SqlitePool,
}

impl<'a> PlantStore<'a> {
    /// Create a new plant store bound to a connection pool.
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Load every tank and pump, ordered by id, with no active alerts.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlite`] if either query fails.
    pub async fn load_state(&self) -> Result<HmiState, DbError> {
        let tanks = sqlx::query_as::<_, TankRow>(
            "SELECT id, level, bloco, categoria, local FROM tanks ORDER BY id",
        )
        .fetch_all(self.pool)
        .await?;

        let pumps = sqlx::query_as::<_, PumpRow>("SELECT id, is_on, flow FROM pumps ORDER BY id")
            .fetch_all(self.pool)
            .await?;

        tracing::info!(tanks = tanks.len(), pumps = pumps.len(), "Loaded plant state");

        Ok(HmiState {
            tanks: tanks.into_iter().map(Tank::from).collect(),
            pumps: pumps.into_iter().map(Pump::from).collect(),
            active_alerts: Vec::new(),
        })
    }

    /// Overwrite a tank's level.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if no row has this id, or
    /// [`DbError::Sqlite`] if the statement fails.
    pub async fn update_tank_level(&self, id: &TankId, level: f64) -> Result<(), DbError> {
        let result = sqlx::query("UPDATE tanks SET level = ?1 WHERE id = ?2")
            .bind(level)
            .bind(id.as_str())
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::NotFound {
                entity: "tank",
                id: id.to_string(),
            });
        }
        Ok(())
    }

    /// Overwrite a pump's running state and flow.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if no row has this id, or
    /// [`DbError::Sqlite`] if the statement fails.
    pub async fn update_pump_state(
        &self,
        id: &PumpId,
        on: bool,
        flow: Option<f64>,
    ) -> Result<(), DbError> {
        let result = sqlx::query("UPDATE pumps SET is_on = ?1, flow = ?2 WHERE id = ?3")
            .bind(i64::from(on))
            .bind(flow)
            .bind(id.as_str())
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::NotFound {
                entity: "pump",
                id: id.to_string(),
            });
        }
        Ok(())
    }
}
