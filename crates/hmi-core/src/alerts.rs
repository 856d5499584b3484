//! Threshold-based alert evaluation.
//!
//! Alerts are a pure function of the current tank levels: every pass
//! recomputes the full list from scratch and stamps each alert with the
//! evaluation time. A tank contributes at most one alert, because the
//! low and high conditions cannot both hold while `low < high`.

use chrono::{DateTime, Utc};
use hmi_types::{Alert, AlertLevel, Tank};

/// Default level (percent) at or below which a tank is critically low.
pub const LOW_THRESHOLD: f64 = 40.0;

/// Default level (percent) at or above which a tank is considered high.
pub const HIGH_THRESHOLD: f64 = 95.0;

/// Errors raised when constructing [`AlertThresholds`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ThresholdError {
    /// A threshold is NaN or infinite.
    #[error("threshold must be a finite number, got {value}")]
    NotFinite {
        /// The rejected value.
        value: f64,
    },

    /// The low threshold does not sit below the high threshold.
    #[error("low threshold {low} must be below high threshold {high}")]
    Inverted {
        /// Configured low threshold.
        low: f64,
        /// Configured high threshold.
        high: f64,
    },
}

/// A validated pair of alert thresholds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlertThresholds {
    low: f64,
    high: f64,
}

impl AlertThresholds {
    /// Build a threshold pair.
    ///
    /// # Errors
    ///
    /// Returns [`ThresholdError`] if either value is not finite or if
    /// `low >= high`.
    pub fn new(low: f64, high: f64) -> Result<Self, ThresholdError> {
        for value in [low, high] {
            if !value.is_finite() {
                return Err(ThresholdError::NotFinite { value });
            }
        }
        if low >= high {
            return Err(ThresholdError::Inverted { low, high });
        }
        Ok(Self { low, high })
    }

    /// The critical-low threshold.
    pub const fn low(&self) -> f64 {
        self.low
    }

    /// The high-warning threshold.
    pub const fn high(&self) -> f64 {
        self.high
    }
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            low: LOW_THRESHOLD,
            high: HIGH_THRESHOLD,
        }
    }
}

/// Evaluate a single tank against the thresholds.
///
/// Returns a Critical `{id}-LOW` alert when `level <= low`, otherwise a
/// Warning `{id}-HIGH` alert when `level >= high`, otherwise nothing.
pub fn evaluate_tank(tank: &Tank, thresholds: &AlertThresholds, now: DateTime<Utc>) -> Option<Alert> {
    if tank.level <= thresholds.low {
        Some(Alert {
            id: format!("{}-LOW", tank.id),
            message: format!("Critical low level - tank {}", tank.id),
            level: AlertLevel::Critical,
            active_at: now,
            tank_id: tank.id.clone(),
        })
    } else if tank.level >= thresholds.high {
        Some(Alert {
            id: format!("{}-HIGH", tank.id),
            message: format!("High level warning - tank {}", tank.id),
            level: AlertLevel::Warning,
            active_at: now,
            tank_id: tank.id.clone(),
        })
    } else {
        None
    }
}

/// Evaluate every tank and return the complete active-alert list, in
/// tank order.
pub fn evaluate(tanks: &[Tank], thresholds: &AlertThresholds, now: DateTime<Utc>) -> Vec<Alert> {
    tanks
        .iter()
        .filter_map(|tank| evaluate_tank(tank, thresholds, now))
        .collect()
}

/// Set each tank's transient `alert` message from the evaluation output,
/// clearing it on tanks that no longer have an alert.
pub fn annotate_tanks(tanks: &mut [Tank], alerts: &[Alert]) {
    for tank in tanks {
        tank.alert = alerts
            .iter()
            .find(|a| a.tank_id == tank.id)
            .map(|a| a.message.clone());
    }
}
