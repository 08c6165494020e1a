//! Domain types shared by the runtime and its adapters.

mod log;
mod process;

pub use log::{LogLine, LogOrigin};
pub use process::{ProcessInfo, ProcessState, ServerStatus};
