//! Frames pushed to console observers.

use serde::{Deserialize, Serialize};

use crate::domain::LogLine;

/// Message sent over an observer connection.
///
/// Serialized as `{"type":"log","content":"..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ConsoleFrame {
    Log { content: String },
}

impl ConsoleFrame {
    /// Serialize the frame to its JSON text form.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl From<&LogLine> for ConsoleFrame {
    fn from(line: &LogLine) -> Self {
        Self::Log {
            content: line.content.clone(),
        }
    }
}
