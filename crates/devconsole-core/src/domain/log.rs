use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a captured line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOrigin {
    /// Child process standard output.
    Stdout,
    /// Child process standard error.
    Stderr,
    /// Lifecycle announcement generated by the supervisor itself.
    Supervisor,
}

impl LogOrigin {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stdout => "stdout",
            Self::Stderr => "stderr",
            Self::Supervisor => "supervisor",
        }
    }
}

impl fmt::Display for LogOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One unit of captured output.
///
/// `seq` is assigned by the log hub at append time and is strictly
/// increasing across the lifetime of the hub, independent of which process
/// produced the line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogLine {
    /// Arrival order within the hub.
    pub seq: u64,
    /// Stream or component the line came from.
    pub origin: LogOrigin,
    /// Line text without its trailing newline.
    pub content: String,
    /// Unix timestamp in milliseconds when the line was appended.
    pub timestamp: i64,
}

impl LogLine {
    /// Create a new line stamped with the current time.
    pub fn new(seq: u64, origin: LogOrigin, content: impl Into<String>) -> Self {
        Self {
            seq,
            origin,
            content: content.into(),
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }
}
