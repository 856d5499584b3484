//! Enumeration types for the plant model.
//!
//! Variant spellings on the wire follow what field devices and the
//! dashboard already exchange: pump status is reported in Portuguese
//! (`Ligada` / `Desligada`), alert levels are `Warning` / `Critical`.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Pump status (as reported by the tank sensor)
// ---------------------------------------------------------------------------

/// Pump running state as reported in a sensor payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum PumpStatus {
    /// The pump is running.
    Ligada,
    /// The pump is stopped.
    Desligada,
}

impl PumpStatus {
    /// Whether this status means the pump is running.
    pub const fn is_running(self) -> bool {
        matches!(self, Self::Ligada)
    }
}

// ---------------------------------------------------------------------------
// Alert levels
// ---------------------------------------------------------------------------

/// Severity of an active alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum AlertLevel {
    /// Level is high but not yet dangerous.
    Warning,
    /// Immediate attention required.
    Critical,
}

// ---------------------------------------------------------------------------
// Tank category
// ---------------------------------------------------------------------------

/// Position of a tank in the distribution chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum TankCategory {
    /// Ground-level reservoir (cistern).
    Inferior,
    /// Elevated reservoir fed by a pump.
    Superior,
}

impl TankCategory {
    /// The stored column value for this category.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Inferior => "inferior",
            Self::Superior => "superior",
        }
    }

    /// Parse a stored column value. Unknown values yield `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "inferior" => Some(Self::Inferior),
            "superior" => Some(Self::Superior),
            _ => None,
        }
    }
}
