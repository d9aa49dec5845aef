//! Health check handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use crate::state::AppState;

/// Health response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
}

/// Health check endpoint (liveness probe).
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// Readiness check response.
#[derive(Serialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub camera_source: String,
    pub camera_busy: bool,
    pub models: usize,
}

/// Readiness check endpoint (readiness probe).
///
/// Not ready when no detection model is loaded: every analysis would
/// report `none` regardless of what the camera sees.
pub async fn ready(
    State(state): State<AppState>,
) -> Result<Json<ReadinessResponse>, (StatusCode, Json<ReadinessResponse>)> {
    let orchestrator = &state.orchestrator;
    let models = orchestrator.model_count();

    let response = ReadinessResponse {
        status: if models > 0 { "ready" } else { "degraded" }.to_string(),
        camera_source: orchestrator.source_id().to_string(),
        camera_busy: orchestrator.is_busy().await,
        models,
    };

    if models > 0 {
        Ok(Json(response))
    } else {
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(response)))
    }
}
