use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Lifecycle state of the supervised child.
///
/// Only tracked children have a state; an untracked supervisor reports
/// [`ServerStatus::Stopped`] instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProcessState {
    Running,
    /// Termination has been requested but the handle is still tracked.
    Stopping,
}

/// Coarse status reported to dashboards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerStatus {
    Running,
    Stopped,
}

impl ServerStatus {
    pub const fn is_running(self) -> bool {
        matches!(self, Self::Running)
    }
}

/// Snapshot of the tracked dev-server process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessInfo {
    /// OS process identifier of the spawned command.
    pub pid: u32,
    /// Process group the child leads (Unix only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pgid: Option<u32>,
    /// Directory the command was spawned in.
    pub working_directory: PathBuf,
    pub state: ProcessState,
    /// Unix timestamp in milliseconds when the spawn was issued.
    pub started_at: i64,
}

impl ProcessInfo {
    pub fn new(pid: u32, pgid: Option<u32>, working_directory: PathBuf) -> Self {
        Self {
            pid,
            pgid,
            working_directory,
            state: ProcessState::Running,
            started_at: chrono::Utc::now().timestamp_millis(),
        }
    }
}
