//! Destination for captured process output.

use crate::domain::LogOrigin;

/// Port for appending log lines produced by (or about) a supervised process.
///
/// Implementations must be thread-safe and must not block on consumers:
/// stream readers call this from their read loops.
pub trait LogSinkPort: Send + Sync {
    /// Append one line (without trailing newline).
    fn append(&self, origin: LogOrigin, line: String);
}
