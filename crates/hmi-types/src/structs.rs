//! Core entity structs for the plant model.
//!
//! Covers [`Tank`], [`Pump`], [`Alert`], and the aggregate [`HmiState`]
//! that is served by `GET /api/v1/status` and pushed with every
//! `hmi_update` broadcast. Field names are camelCase on the wire to match
//! the dashboard.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{AlertLevel, PumpStatus, TankCategory};
use crate::ids::{PumpId, TankId};

// ---------------------------------------------------------------------------
// Tank
// ---------------------------------------------------------------------------

/// A monitored reservoir with a percentage fill level.
///
/// `level` is not clamped: sensors have been observed reporting up to
/// ~110%, and out-of-range values are left for the alert evaluator to flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct Tank {
    /// Stable tag name.
    pub id: TankId,
    /// Fill level in percent.
    pub level: f64,
    /// Signed flow reported by the tank's sensor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub flow_rate: Option<f64>,
    /// Pump status as last reported by the tank's sensor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub pump_status: Option<PumpStatus>,
    /// Building block the tank belongs to.
    #[serde(rename = "bloco")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub block: Option<String>,
    /// Position in the distribution chain.
    #[serde(rename = "categoria")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub category: Option<TankCategory>,
    /// Free-form installation site.
    #[serde(rename = "local")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub location: Option<String>,
    /// Message of the alert currently raised for this tank, if any.
    ///
    /// Transient: set and cleared by alert evaluation, never persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub alert: Option<String>,
}

impl Tank {
    /// Create a tank with only an id and level; every optional field empty.
    pub fn new(id: impl Into<TankId>, level: f64) -> Self {
        Self {
            id: id.into(),
            level,
            flow_rate: None,
            pump_status: None,
            block: None,
            category: None,
            location: None,
            alert: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Pump
// ---------------------------------------------------------------------------

/// A pump whose state is derived from its tank's sensor payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct Pump {
    /// Stable tag name.
    pub id: PumpId,
    /// Whether the pump is running.
    pub on: bool,
    /// Signed flow: positive is inflow to the tank, negative is consumption.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub flow: Option<f64>,
}

impl Pump {
    /// Create a stopped pump with no flow reading.
    pub fn new(id: impl Into<PumpId>) -> Self {
        Self {
            id: id.into(),
            on: false,
            flow: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Alert
// ---------------------------------------------------------------------------

/// A derived threshold violation for one tank.
///
/// Alerts are recomputed from scratch on every evaluation. `active_at` is
/// the time of the most recent evaluation that confirmed the condition,
/// not the time it was first detected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct Alert {
    /// Deterministic id: `{tank_id}-LOW` or `{tank_id}-HIGH`.
    pub id: String,
    /// Human-readable message.
    pub message: String,
    /// Severity.
    pub level: AlertLevel,
    /// Last-confirmed-at timestamp.
    pub active_at: DateTime<Utc>,
    /// Tank that triggered the alert.
    pub tank_id: TankId,
}

// ---------------------------------------------------------------------------
// HmiState
// ---------------------------------------------------------------------------

/// Complete in-memory plant state at one instant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct HmiState {
    /// All provisioned tanks, ordered by id.
    pub tanks: Vec<Tank>,
    /// All provisioned pumps, ordered by id.
    pub pumps: Vec<Pump>,
    /// Alerts produced by the latest evaluation.
    pub active_alerts: Vec<Alert>,
}

impl HmiState {
    /// Look up a tank by id.
    pub fn tank(&self, id: &TankId) -> Option<&Tank> {
        self.tanks.iter().find(|t| &t.id == id)
    }

    /// Look up a pump by id.
    pub fn pump(&self, id: &PumpId) -> Option<&Pump> {
        self.pumps.iter().find(|p| &p.id == id)
    }
}
