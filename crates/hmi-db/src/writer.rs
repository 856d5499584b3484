//! Best-effort write-through of committed state to the entity store.
//!
//! The [`PersistenceWriter`] is registered as a [`CommitListener`] on the
//! state coordinator. Each commit is turned into [`PersistJob`]s and pushed
//! onto an unbounded queue, so the coordinator never waits on disk. A
//! single background task drains the queue in order. Failures are logged
//! with the entity id and operation and then dropped: the live snapshot
//! stays authoritative and nothing is rolled back.

use std::future::Future;

use chrono::{DateTime, Utc};
use hmi_core::coordinator::{Commit, CommitListener};
use hmi_types::{PumpId, TankId};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::DbError;
use crate::plant_store::PlantStore;
use crate::reading_store::ReadingStore;
use crate::sqlite::SqliteStore;

/// Destination for persisted state.
///
/// Implemented by [`SqliteStore`]; tests substitute their own sink.
pub trait StateSink: Send + Sync + 'static {
    /// Overwrite a tank's stored level.
    fn save_tank_level(
        &self,
        tank_id: &TankId,
        level: f64,
    ) -> impl Future<Output = Result<(), DbError>> + Send;

    /// Append one row to the reading log.
    fn append_reading(
        &self,
        tank_id: &TankId,
        level: f64,
        flow: Option<f64>,
        recorded_at: DateTime<Utc>,
    ) -> impl Future<Output = Result<(), DbError>> + Send;

    /// Overwrite a pump's stored state.
    fn save_pump_state(
        &self,
        pump_id: &PumpId,
        on: bool,
        flow: Option<f64>,
    ) -> impl Future<Output = Result<(), DbError>> + Send;
}

impl StateSink for SqliteStore {
    async fn save_tank_level(&self, tank_id: &TankId, level: f64) -> Result<(), DbError> {
        PlantStore::new(self.pool()).update_tank_level(tank_id, level).await
    }

    async fn append_reading(
        &self,
        tank_id: &TankId,
        level: f64,
        flow: Option<f64>,
        recorded_at: DateTime<Utc>,
    ) -> Result<(), DbError> {
        ReadingStore::new(self.pool())
            .insert(tank_id, level, flow, recorded_at)
            .await
    }

    async fn save_pump_state(
        &self,
        pump_id: &PumpId,
        on: bool,
        flow: Option<f64>,
    ) -> Result<(), DbError> {
        PlantStore::new(self.pool())
            .update_pump_state(pump_id, on, flow)
            .await
    }
}

/// One unit of queued persistence work.
#[derive(Debug, Clone, PartialEq)]
pub enum PersistJob {
    /// Store a tank's new level and append a reading row.
    TankLevel {
        /// Tank to update.
        tank_id: TankId,
        /// New level.
        level: f64,
        /// Flow from the payload.
        flow: Option<f64>,
        /// When the reading was applied.
        recorded_at: DateTime<Utc>,
    },
    /// Store a pump's derived state.
    PumpState {
        /// Pump to update.
        pump_id: PumpId,
        /// New running state.
        on: bool,
        /// New flow.
        flow: Option<f64>,
    },
}

impl PersistJob {
    /// Jobs implied by one coordinator commit: always the tank, plus the
    /// pump when the tank drives one.
    pub fn from_commit(commit: &Commit) -> Vec<Self> {
        let tank = Self::TankLevel {
            tank_id: commit.reading.tank_id.clone(),
            level: commit.reading.level,
            flow: commit.reading.flow,
            recorded_at: commit.reading.recorded_at,
        };
        let pump = commit.pump.as_ref().map(|p| Self::PumpState {
            pump_id: p.pump_id.clone(),
            on: p.on,
            flow: p.flow,
        });
        std::iter::once(tank).chain(pump).collect()
    }
}

/// Queue handle feeding the background persistence task.
#[derive(Debug, Clone)]
pub struct PersistenceWriter {
    tx: mpsc::UnboundedSender<PersistJob>,
}

impl PersistenceWriter {
    /// Spawn the drain task over `sink`.
    ///
    /// The task exits once every clone of the returned writer has been
    /// dropped and the queue is empty; await the handle to flush on
    /// shutdown.
    pub fn spawn<S: StateSink>(sink: S) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<PersistJob>();
        let handle = tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                run_job(&sink, job).await;
            }
            tracing::info!("Persistence writer drained");
        });
        (Self { tx }, handle)
    }

    /// Queue a job. Never blocks.
    pub fn enqueue(&self, job: PersistJob) {
        if let Err(err) = self.tx.send(job) {
            tracing::error!(job = ?err.0, "Persistence writer stopped; dropping job");
        }
    }
}

impl CommitListener for PersistenceWriter {
    fn on_commit(&self, commit: &Commit) {
        for job in PersistJob::from_commit(commit) {
            self.enqueue(job);
        }
    }
}

async fn run_job<S: StateSink>(sink: &S, job: PersistJob) {
    match job {
        PersistJob::TankLevel {
            tank_id,
            level,
            flow,
            recorded_at,
        } => {
            if let Err(err) = sink.save_tank_level(&tank_id, level).await {
                tracing::error!(
                    tank_id = %tank_id,
                    operation = "update_tank_level",
                    error = %err,
                    "Failed to persist tank level"
                );
            }
            if let Err(err) = sink.append_reading(&tank_id, level, flow, recorded_at).await {
                tracing::error!(
                    tank_id = %tank_id,
                    operation = "insert_reading",
                    error = %err,
                    "Failed to append reading"
                );
            }
        }
        PersistJob::PumpState { pump_id, on, flow } => {
            if let Err(err) = sink.save_pump_state(&pump_id, on, flow).await {
                tracing::error!(
                    pump_id = %pump_id,
                    operation = "update_pump_state",
                    error = %err,
                    "Failed to persist pump state"
                );
            }
        }
    }
}
