//! Core domain types and ports for the devconsole dev-server supervisor.
//!
//! This crate has no runtime dependencies: it defines what a captured log
//! line looks like, how process state is reported, the wire frame pushed to
//! console observers, and the port the supervisor publishes output through.

#![deny(unused_crate_dependencies)]

pub mod domain;
pub mod events;
pub mod ports;

pub use domain::{LogLine, LogOrigin, ProcessInfo, ProcessState, ServerStatus};
pub use events::ConsoleFrame;
pub use ports::{LogSinkPort, SupervisorError, TerminationError};
