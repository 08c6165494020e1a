//! Request and response bodies for the REST endpoints.

use devconsole_core::{ProcessInfo, ServerStatus};
use serde::{Deserialize, Serialize};

/// Body of `POST /api/server/start`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartServerRequest {
    /// Absolute path of the selected project.
    pub project_path: Option<String>,
}

/// `{ "success": true }`
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub const fn ok() -> Self {
        Self { success: true }
    }
}

/// Body of `GET /api/server/status`.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: ServerStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub process: Option<ProcessInfo>,
}
