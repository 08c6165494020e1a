//! Windows process-tree termination via `taskkill`.

use std::process::{Command, Stdio};

use devconsole_core::TerminationError;
use tracing::debug;

use super::ProcessTarget;

/// Launch `taskkill /pid <pid> /f /t`.
///
/// Only the launch is awaited; `taskkill` finishes in the background.
pub fn kill_tree_now(target: &ProcessTarget) -> Result<(), TerminationError> {
    Command::new("taskkill")
        .args(["/pid", &target.pid.to_string(), "/f", "/t"])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map(|_| debug!(pid = target.pid, "Issued taskkill for process tree"))
        .map_err(|e| TerminationError::new(target.pid, e))
}
