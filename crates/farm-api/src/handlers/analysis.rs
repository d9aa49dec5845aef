//! Photo analysis handlers.

use axum::extract::State;
use axum::Json;
use farm_models::AnalysisReport;
use tracing::info;

use crate::auth::Identity;
use crate::error::ApiResult;
use crate::state::AppState;

/// Capture a frame from the farm camera and count what the models see.
///
/// Serves both `POST /analysis` and `GET /farms/photo_analysis`.
pub async fn run_analysis(
    State(state): State<AppState>,
    user: Identity,
) -> ApiResult<Json<AnalysisReport>> {
    info!(
        user = %user.subject,
        source = %state.orchestrator.source_id(),
        "Photo analysis requested"
    );

    let report = state.orchestrator.analyze().await?;
    Ok(Json(report))
}
