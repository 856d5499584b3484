//! Bounded in-memory log of alert occurrences.
//!
//! The active-alert list in the snapshot has no memory: it is recomputed
//! on every reading. The history keeps what the operator needs on top of
//! that, one record per raise with the time it cleared and whether it was
//! acknowledged. Records are derived by diffing consecutive evaluation
//! outputs, so a condition that stays true across many readings produces
//! a single record.

use chrono::{DateTime, Utc};
use hmi_types::{Alert, AlertLevel, Tank, TankId};
use serde::Serialize;
use uuid::Uuid;

/// Maximum records kept in memory.
pub const MAX_HISTORY: usize = 500;

/// One alert occurrence, from the reading that raised it to the reading
/// that cleared it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertRecord {
    /// Unique record identifier.
    pub id: Uuid,
    /// Deterministic alert id (for example `T-100-LOW`).
    pub alert_id: String,
    /// Tank that raised the alert.
    pub tank_id: TankId,
    /// Severity at the time it was raised.
    pub level: AlertLevel,
    /// Message at the time it was raised.
    pub message: String,
    /// Tank level that raised the alert.
    pub tank_level: f64,
    /// When the condition was first detected.
    pub raised_at: DateTime<Utc>,
    /// Whether an operator has acknowledged this record.
    pub acknowledged: bool,
    /// When the condition stopped holding, if it has.
    pub cleared_at: Option<DateTime<Utc>>,
}

impl AlertRecord {
    /// Whether the condition is still active.
    pub const fn is_open(&self) -> bool {
        self.cleared_at.is_none()
    }
}

/// In-memory alert history, newest first.
#[derive(Debug, Clone, Default)]
pub struct AlertHistory {
    records: Vec<AlertRecord>,
}

impl AlertHistory {
    /// Create an empty history.
    pub const fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    /// Add a record at the front.
    ///
    /// If the history exceeds [`MAX_HISTORY`], the oldest record is dropped.
    pub fn push(&mut self, record: AlertRecord) {
        self.records.insert(0, record);
        if self.records.len() > MAX_HISTORY {
            self.records.truncate(MAX_HISTORY);
        }
    }

    /// All records, newest first.
    pub fn all(&self) -> &[AlertRecord] {
        &self.records
    }

    /// Acknowledge a record by id.
    ///
    /// Returns `true` if the record was found.
    pub fn acknowledge(&mut self, id: Uuid) -> bool {
        self.records
            .iter_mut()
            .find(|r| r.id == id)
            .is_some_and(|r| {
                r.acknowledged = true;
                true
            })
    }

    /// Diff two consecutive evaluation outputs into the history.
    ///
    /// Alerts present in `next` but not in `previous` open a new record.
    /// Alerts present in `previous` but not in `next` close the most
    /// recent open record with the same alert id.
    pub fn record_transition(
        &mut self,
        previous: &[Alert],
        next: &[Alert],
        tanks: &[Tank],
        now: DateTime<Utc>,
    ) {
        for cleared in previous.iter().filter(|p| !next.iter().any(|n| n.id == p.id)) {
            if let Some(record) = self
                .records
                .iter_mut()
                .find(|r| r.alert_id == cleared.id && r.is_open())
            {
                record.cleared_at = Some(now);
            }
        }

        for raised in next.iter().filter(|n| !previous.iter().any(|p| p.id == n.id)) {
            let tank_level = tanks
                .iter()
                .find(|t| t.id == raised.tank_id)
                .map_or(f64::NAN, |t| t.level);
            self.push(AlertRecord {
                id: Uuid::now_v7(),
                alert_id: raised.id.clone(),
                tank_id: raised.tank_id.clone(),
                level: raised.level,
                message: raised.message.clone(),
                tank_level,
                raised_at: now,
                acknowledged: false,
                cleared_at: None,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::{AlertThresholds, evaluate};

    fn eval(tanks: &[Tank]) -> Vec<Alert> {
        evaluate(tanks, &AlertThresholds::default(), Utc::now())
    }

    #[test]
    fn raise_opens_one_record() {
        let mut history = AlertHistory::new();
        let tanks = vec![Tank::new("T-100", 35.0)];
        let alerts = eval(&tanks);

        history.record_transition(&[], &alerts, &tanks, Utc::now());

        assert_eq!(history.all().len(), 1);
        let record = history.all().first();
        assert_eq!(record.map(|r| r.alert_id.as_str()), Some("T-100-LOW"));
        assert!(record.is_some_and(AlertRecord::is_open));
        assert!(record.is_some_and(|r| (r.tank_level - 35.0).abs() < f64::EPSILON));
    }

    #[test]
    fn persisting_condition_does_not_duplicate() {
        let mut history = AlertHistory::new();
        let tanks = vec![Tank::new("T-100", 35.0)];
        let first = eval(&tanks);
        let second = eval(&tanks);

        history.record_transition(&[], &first, &tanks, Utc::now());
        history.record_transition(&first, &second, &tanks, Utc::now());

        assert_eq!(history.all().len(), 1);
    }

    #[test]
    fn clearing_closes_the_open_record() {
        let mut history = AlertHistory::new();
        let low = vec![Tank::new("T-100", 35.0)];
        let normal = vec![Tank::new("T-100", 60.0)];
        let raised = eval(&low);
        let cleared = eval(&normal);

        history.record_transition(&[], &raised, &low, Utc::now());
        history.record_transition(&raised, &cleared, &normal, Utc::now());

        assert_eq!(history.all().len(), 1);
        assert!(history.all().first().is_some_and(|r| r.cleared_at.is_some()));

        // A fresh raise opens a second record, newest first.
        history.record_transition(&cleared, &raised, &low, Utc::now());
        assert_eq!(history.all().len(), 2);
        assert!(history.all().first().is_some_and(AlertRecord::is_open));
    }

    #[test]
    fn low_to_high_swaps_records() {
        let mut history = AlertHistory::new();
        let low = vec![Tank::new("T-100", 10.0)];
        let high = vec![Tank::new("T-100", 99.0)];
        let a = eval(&low);
        let b = eval(&high);

        history.record_transition(&[], &a, &low, Utc::now());
        history.record_transition(&a, &b, &high, Utc::now());

        let ids: Vec<&str> = history.all().iter().map(|r| r.alert_id.as_str()).collect();
        assert_eq!(ids, vec!["T-100-HIGH", "T-100-LOW"]);
        assert!(history.all().get(1).is_some_and(|r| !r.is_open()));
    }

    #[test]
    fn acknowledge_by_id() {
        let mut history = AlertHistory::new();
        let tanks = vec![Tank::new("T-100", 35.0)];
        history.record_transition(&[], &eval(&tanks), &tanks, Utc::now());

        let id = history.all().first().map(|r| r.id).unwrap_or_default();
        assert!(history.acknowledge(id));
        assert!(history.all().iter().all(|r| r.acknowledged));
        assert!(!history.acknowledge(Uuid::now_v7()));
    }

    #[test]
    fn record_serializes_camel_case() {
        let mut history = AlertHistory::new();
        let tanks = vec![Tank::new("T-200", 97.5)];
        history.record_transition(&[], &eval(&tanks), &tanks, Utc::now());

        let json = serde_json::to_value(history.all()).unwrap_or_default();
        assert_eq!(json[0]["alertId"], "T-200-HIGH");
        assert_eq!(json[0]["tankId"], "T-200");
        assert_eq!(json[0]["level"], "Warning");
        assert_eq!(json[0]["tankLevel"], 97.5);
        assert_eq!(json[0]["acknowledged"], false);
        assert!(json[0]["clearedAt"].is_null());
    }

    #[test]
    fn history_is_capped() {
        let mut history = AlertHistory::new();
        let tanks = vec![Tank::new("T-100", 35.0)];
        let alerts = eval(&tanks);
        for _ in 0..(MAX_HISTORY + 10) {
            history.record_transition(&[], &alerts, &tanks, Utc::now());
        }
        assert_eq!(history.all().len(), MAX_HISTORY);
    }
}
