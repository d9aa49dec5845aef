//! Actuator (window) status handlers.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::auth::Identity;
use crate::error::ApiResult;
use crate::metrics;
use crate::state::AppState;

/// Status report from a device.
#[derive(Debug, Deserialize)]
pub struct StatusReportRequest {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct StatusReportResponse {
    pub message: String,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: String,
}

/// POST /actuator/status
pub async fn report_actuator_status(
    State(state): State<AppState>,
    user: Identity,
    Json(request): Json<StatusReportRequest>,
) -> ApiResult<Json<StatusReportResponse>> {
    record_report(&state, &user, &request.status, "Actuator status received")
}

/// POST /farms/window-status
pub async fn report_window_status(
    State(state): State<AppState>,
    user: Identity,
    Json(request): Json<StatusReportRequest>,
) -> ApiResult<Json<StatusReportResponse>> {
    record_report(&state, &user, &request.status, "Window status received")
}

/// GET /actuator/status, GET /farms/window-status
pub async fn get_actuator_status(
    State(state): State<AppState>,
    _user: Identity,
) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: state.actuator.read().to_string(),
    })
}

fn record_report(
    state: &AppState,
    user: &Identity,
    raw: &str,
    message: &str,
) -> ApiResult<Json<StatusReportResponse>> {
    match state.actuator.report(raw) {
        Ok(status) => {
            metrics::record_actuator_report("accepted");
            Ok(Json(StatusReportResponse {
                message: message.to_string(),
                status: status.to_string(),
            }))
        }
        Err(e) => {
            metrics::record_actuator_report("rejected");
            warn!(user = %user.subject, status = %raw, "Rejected actuator status");
            Err(e.into())
        }
    }
}
