//! The state coordinator: single writer of the live plant snapshot.
//!
//! Every accepted sensor reading passes through [`StateCoordinator::apply_reading`],
//! which mutates a private copy of the snapshot, re-evaluates alerts, swaps
//! the copy in, and hands the resulting [`Commit`] to each registered
//! [`CommitListener`]. Readers get a cheap `Arc` clone of the latest
//! committed snapshot and never observe a partially applied reading.
//!
//! Listeners run while the write lock is still held, so the order in which
//! they see commits is the order in which commits were applied. They must
//! only enqueue work (a broadcast send, a channel push) and return.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use hmi_types::{HmiState, PumpId, PumpStatus, TankId};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::alerts::{self, AlertThresholds};
use crate::history::{AlertHistory, AlertRecord};

/// Errors returned by [`StateCoordinator::apply_reading`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CoordinatorError {
    /// No tank with this id exists in the snapshot.
    #[error("unknown tank: {tank_id}")]
    UnknownEntity {
        /// The id that was not found.
        tank_id: TankId,
    },

    /// A numeric field is NaN or infinite.
    #[error("invalid {field} for tank {tank_id}: {value}")]
    InvalidReading {
        /// The tank the reading was addressed to.
        tank_id: TankId,
        /// Name of the offending field.
        field: &'static str,
        /// The rejected value.
        value: f64,
    },
}

/// One sensor payload addressed to a tank.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorReading {
    /// Target tank.
    pub tank_id: TankId,
    /// Fill level in percent. Not clamped.
    pub level: f64,
    /// Signed flow, if the sensor reported one.
    pub flow: Option<f64>,
    /// Pump status as observed by the sensor.
    pub pump_status: Option<PumpStatus>,
}

/// The tank-side effect of an applied reading.
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedReading {
    /// The tank that was updated.
    pub tank_id: TankId,
    /// New level.
    pub level: f64,
    /// Flow from the payload.
    pub flow: Option<f64>,
    /// When the coordinator applied the reading.
    pub recorded_at: DateTime<Utc>,
}

/// The pump-side effect of an applied reading, when the tank drives a pump.
#[derive(Debug, Clone, PartialEq)]
pub struct PumpChange {
    /// The pump that was updated.
    pub pump_id: PumpId,
    /// New running state.
    pub on: bool,
    /// New flow.
    pub flow: Option<f64>,
}

/// Everything that changed in one successful apply.
#[derive(Debug, Clone)]
pub struct Commit {
    /// The snapshot as of this commit.
    pub snapshot: Arc<HmiState>,
    /// The tank update.
    pub reading: AppliedReading,
    /// The derived pump update, if any.
    pub pump: Option<PumpChange>,
}

/// Receives every successful commit, in commit order.
pub trait CommitListener: Send + Sync {
    /// Called once per commit while the coordinator's write lock is held.
    /// Implementations must not block.
    fn on_commit(&self, commit: &Commit);
}

/// Coordinator policy.
#[derive(Debug, Clone, Default)]
pub struct CoordinatorConfig {
    /// Alert thresholds.
    pub thresholds: AlertThresholds,
    /// Which pump is driven by which tank's sensor.
    pub pump_map: BTreeMap<TankId, PumpId>,
}

#[derive(Debug)]
struct Inner {
    state: Arc<HmiState>,
    history: AlertHistory,
}

/// Serializes all mutations of the live snapshot.
pub struct StateCoordinator {
    inner: RwLock<Inner>,
    config: CoordinatorConfig,
    listeners: Vec<Arc<dyn CommitListener>>,
}

impl std::fmt::Debug for StateCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateCoordinator")
            .field("config", &self.config)
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}

impl StateCoordinator {
    /// Create a coordinator around an initial snapshot.
    ///
    /// The initial `active_alerts` are kept as given; the first accepted
    /// reading recomputes them.
    pub fn new(
        initial: HmiState,
        config: CoordinatorConfig,
        listeners: Vec<Arc<dyn CommitListener>>,
    ) -> Self {
        Self {
            inner: RwLock::new(Inner {
                state: Arc::new(initial),
                history: AlertHistory::new(),
            }),
            config,
            listeners,
        }
    }

    /// The latest committed snapshot.
    pub async fn snapshot(&self) -> Arc<HmiState> {
        Arc::clone(&self.inner.read().await.state)
    }

    /// Apply one sensor reading.
    ///
    /// On success the new snapshot is visible to [`StateCoordinator::snapshot`]
    /// and every listener has been handed the commit before this returns.
    /// On error nothing is mutated and no listener is called.
    pub async fn apply_reading(&self, reading: SensorReading) -> Result<Commit, CoordinatorError> {
        check_finite(&reading.tank_id, "level", reading.level)?;
        if let Some(flow) = reading.flow {
            check_finite(&reading.tank_id, "flow", flow)?;
        }

        let mut inner = self.inner.write().await;
        let now = Utc::now();

        let mut next = HmiState::clone(&inner.state);
        let tank = next
            .tanks
            .iter_mut()
            .find(|t| t.id == reading.tank_id)
            .ok_or_else(|| CoordinatorError::UnknownEntity {
                tank_id: reading.tank_id.clone(),
            })?;
        tank.level = reading.level;
        tank.flow_rate = reading.flow;
        tank.pump_status = reading.pump_status;

        let pump = self.config.pump_map.get(&reading.tank_id).and_then(|pump_id| {
            let pump = next.pumps.iter_mut().find(|p| &p.id == pump_id)?;
            pump.on = reading.pump_status.is_some_and(PumpStatus::is_running);
            pump.flow = reading.flow;
            Some(PumpChange {
                pump_id: pump.id.clone(),
                on: pump.on,
                flow: pump.flow,
            })
        });

        let active = alerts::evaluate(&next.tanks, &self.config.thresholds, now);
        alerts::annotate_tanks(&mut next.tanks, &active);
        let previous = std::mem::take(&mut next.active_alerts);
        inner
            .history
            .record_transition(&previous, &active, &next.tanks, now);
        next.active_alerts = active;

        let snapshot = Arc::new(next);
        inner.state = Arc::clone(&snapshot);

        let commit = Commit {
            snapshot,
            reading: AppliedReading {
                tank_id: reading.tank_id,
                level: reading.level,
                flow: reading.flow,
                recorded_at: now,
            },
            pump,
        };
        for listener in &self.listeners {
            listener.on_commit(&commit);
        }
        drop(inner);

        Ok(commit)
    }

    /// A copy of the alert history, newest first.
    pub async fn alert_history(&self) -> Vec<AlertRecord> {
        self.inner.read().await.history.all().to_vec()
    }

    /// Acknowledge a history record. Returns `false` if the id is unknown.
    pub async fn acknowledge_alert(&self, id: Uuid) -> bool {
        self.inner.write().await.history.acknowledge(id)
    }
}

fn check_finite(tank_id: &TankId, field: &'static str, value: f64) -> Result<(), CoordinatorError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(CoordinatorError::InvalidReading {
            tank_id: tank_id.clone(),
            field,
            value,
        })
    }
}
