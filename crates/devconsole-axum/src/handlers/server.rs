//! Dev-server handlers - start/stop/status.

use axum::Json;
use axum::extract::State;
use devconsole_core::ServerStatus;

use crate::dto::{StartServerRequest, StatusResponse, SuccessResponse};
use crate::error::HttpError;
use crate::state::AppState;

/// Start the dev server in the given project directory.
pub async fn start(
    State(state): State<AppState>,
    Json(body): Json<StartServerRequest>,
) -> Result<Json<SuccessResponse>, HttpError> {
    let project_path = body
        .project_path
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| HttpError::BadRequest("Project path is required".to_string()))?;

    state.supervisor.start(&project_path).await?;
    Ok(Json(SuccessResponse::ok()))
}

/// Stop the dev server. Succeeds when nothing is running.
pub async fn stop(State(state): State<AppState>) -> Json<SuccessResponse> {
    state.supervisor.stop().await;
    Json(SuccessResponse::ok())
}

/// Report whether the dev server is running.
pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let process = state.supervisor.info();
    let status = if process.is_some() {
        ServerStatus::Running
    } else {
        ServerStatus::Stopped
    };
    Json(StatusResponse { status, process })
}
