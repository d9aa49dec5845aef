//! Sensor telemetry handlers.

use axum::extract::State;
use axum::Json;
use farm_models::{SensorReading, SensorReadingCreate};
use tracing::debug;
use validator::Validate;

use crate::auth::Identity;
use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

/// POST /farms/sensor
pub async fn ingest_sensor_reading(
    State(state): State<AppState>,
    user: Identity,
    Json(request): Json<SensorReadingCreate>,
) -> ApiResult<Json<SensorReading>> {
    request
        .validate()
        .map_err(|e| ApiError::validation(e.to_string()))?;

    let farm_id = user.require_farm()?;
    let stored = state
        .sensors
        .insert(SensorReading::new(farm_id, request))
        .await?;

    metrics::record_sensor_reading(farm_id);
    debug!(farm_id = %farm_id, reading_id = %stored.id, "Sensor reading stored");

    Ok(Json(stored))
}

/// GET /farms/sensorStats
///
/// Latest reading for the caller's farm, or `null` before the first one.
pub async fn latest_sensor_reading(
    State(state): State<AppState>,
    user: Identity,
) -> ApiResult<Json<Option<SensorReading>>> {
    let farm_id = user.require_farm()?;
    Ok(Json(state.sensors.latest(farm_id).await?))
}
