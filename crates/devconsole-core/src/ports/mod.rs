//! Port definitions and the error types that cross them.

mod log_sink;

pub use log_sink::LogSinkPort;

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced synchronously to callers of the supervisor.
///
/// Everything that happens after a successful spawn (crashes, kill failures,
/// observer delivery failures) is reported through the log stream instead.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// The requested working directory is missing or not a directory.
    #[error("Project directory does not exist: {}", .0.display())]
    InvalidWorkingDirectory(PathBuf),

    /// The dev-server command could not be launched.
    #[error("Failed to start dev server `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },
}

/// Killing a process tree failed.
///
/// Produced by terminators; the supervisor logs it and carries on.
#[derive(Debug, Error)]
#[error("Failed to terminate process tree rooted at {pid}: {source}")]
pub struct TerminationError {
    pub pid: u32,
    #[source]
    pub source: io::Error,
}

impl TerminationError {
    pub const fn new(pid: u32, source: io::Error) -> Self {
        Self { pid, source }
    }
}
