//! REST API endpoint handlers.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/v1/sensor/update` | Ingest one sensor reading |
//! | `GET` | `/api/v1/status` | Current plant snapshot |
//! | `GET` | `/api/v1/readings` | Persisted reading log, newest first |
//! | `GET` | `/api/v1/alerts/history` | Alert history with filters |
//! | `POST` | `/api/v1/alerts/history/{id}/acknowledge` | Acknowledge a history record |

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use hmi_core::coordinator::{CoordinatorError, SensorReading};
use hmi_core::history::AlertRecord;
use hmi_db::{DEFAULT_READINGS_LIMIT, ReadingStore};
use hmi_types::{PumpStatus, TankId};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

/// Default number of history records returned.
const DEFAULT_HISTORY_LIMIT: usize = 100;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Body of `POST /api/v1/sensor/update`.
#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorPayload {
    /// Target tank.
    pub id: TankId,
    /// Fill level in percent.
    pub level: f64,
    /// Signed flow.
    #[serde(default)]
    pub flow: Option<f64>,
    /// Pump status seen by the sensor.
    #[serde(default)]
    pub pump_status: Option<PumpStatus>,
}

impl From<SensorPayload> for SensorReading {
    fn from(payload: SensorPayload) -> Self {
        Self {
            tank_id: payload.id,
            level: payload.level,
            flow: payload.flow,
            pump_status: payload.pump_status,
        }
    }
}

/// Query parameters for `GET /api/v1/readings`.
#[derive(Debug, serde::Deserialize)]
pub struct ReadingsQuery {
    /// Only readings for this tank.
    pub tank_id: Option<String>,
    /// Maximum rows (default 100, capped at 1000).
    pub limit: Option<u32>,
}

/// Query parameters for `GET /api/v1/alerts/history`.
#[derive(Debug, serde::Deserialize)]
pub struct HistoryQuery {
    /// Only records for this tank.
    pub tank_id: Option<String>,
    /// Filter by acknowledged status (`true` or `false`).
    pub acknowledged: Option<String>,
    /// Maximum number of records to return (default 100).
    pub limit: Option<usize>,
}

// ---------------------------------------------------------------------------
// POST /api/v1/sensor/update
// ---------------------------------------------------------------------------

/// Apply one sensor reading.
///
/// Responds only after the snapshot has been updated and the commit handed
/// to the broadcast hub and persistence queue, so a status read issued
/// after this response reflects the reading.
pub async fn sensor_update(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SensorPayload>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload.map_err(|rejection| {
        tracing::warn!(error = %rejection.body_text(), "Rejected malformed sensor payload");
        ApiError::BadRequest(rejection.body_text())
    })?;

    match state.coordinator.apply_reading(payload.into()).await {
        Ok(commit) => {
            tracing::info!(
                tank_id = %commit.reading.tank_id,
                level = commit.reading.level,
                flow = ?commit.reading.flow,
                alerts = commit.snapshot.active_alerts.len(),
                "Accepted sensor reading"
            );
            Ok(Json(serde_json::json!({
                "message": "reading accepted",
            })))
        }
        Err(CoordinatorError::UnknownEntity { tank_id }) => {
            tracing::warn!(tank_id = %tank_id, "Sensor reading for unknown tank");
            Err(ApiError::NotFound(format!("tank {tank_id}")))
        }
        Err(err @ CoordinatorError::InvalidReading { .. }) => {
            tracing::warn!(error = %err, "Rejected sensor reading");
            Err(ApiError::BadRequest(err.to_string()))
        }
    }
}

// ---------------------------------------------------------------------------
// GET /api/v1/status
// ---------------------------------------------------------------------------

/// Return the latest committed snapshot.
pub async fn get_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.coordinator.snapshot().await)
}

// ---------------------------------------------------------------------------
// GET /api/v1/readings
// ---------------------------------------------------------------------------

/// Return persisted readings, newest first.
pub async fn list_readings(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ReadingsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let tank_id = params.tank_id.map(TankId::new);
    let limit = params.limit.unwrap_or(DEFAULT_READINGS_LIMIT);

    let readings = ReadingStore::new(state.store.pool())
        .recent(tank_id.as_ref(), limit)
        .await?;

    Ok(Json(serde_json::json!({
        "count": readings.len(),
        "readings": readings,
    })))
}

// ---------------------------------------------------------------------------
// Alert history
// ---------------------------------------------------------------------------

/// `GET /api/v1/alerts/history` -- list history records with optional filtering.
pub async fn list_alert_history(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HistoryQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let limit = params.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);

    let acknowledged_filter: Option<bool> = match params.acknowledged.as_deref() {
        None => None,
        Some("true") => Some(true),
        Some("false") => Some(false),
        Some(other) => {
            return Err(ApiError::BadRequest(format!(
                "acknowledged must be true or false, got {other}"
            )));
        }
    };

    let history = state.coordinator.alert_history().await;
    let alerts: Vec<&AlertRecord> = history
        .iter()
        .filter(|r| {
            if let Some(tank) = params.tank_id.as_deref()
                && r.tank_id.as_str() != tank
            {
                return false;
            }
            if let Some(ack) = acknowledged_filter
                && r.acknowledged != ack
            {
                return false;
            }
            true
        })
        .take(limit)
        .collect();

    Ok(Json(serde_json::json!({
        "count": alerts.len(),
        "alerts": alerts,
    })))
}

/// `POST /api/v1/alerts/history/{id}/acknowledge` -- acknowledge a record.
pub async fn acknowledge_alert(
    State(state): State<Arc<AppState>>,
    Path(id_str): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = id_str
        .parse::<Uuid>()
        .map_err(|e| ApiError::InvalidUuid(format!("{id_str}: {e}")))?;

    if state.coordinator.acknowledge_alert(id).await {
        tracing::info!(%id, "Alert acknowledged");
        Ok(Json(serde_json::json!({
            "ok": true,
            "message": format!("Alert {id} acknowledged"),
        })))
    } else {
        Err(ApiError::NotFound(format!("alert {id}")))
    }
}
