//! Process runtime for devconsole.
//!
//! - [`LogHub`] keeps a bounded backlog of output lines and fans new lines
//!   out to any number of observers.
//! - [`DevServerSupervisor`] owns the single dev-server child process,
//!   captures its stdout/stderr into the hub and kills its whole process
//!   tree on stop.

#![deny(unused_crate_dependencies)]

#[cfg(test)]
use mockall as _;
#[cfg(test)]
use tempfile as _;

pub mod process;

pub use process::{
    DEFAULT_EXIT_GRACE, DEFAULT_LOG_CAPACITY, DEFAULT_SUBSCRIBER_QUEUE, DevServerCommand,
    DevServerSupervisor, LogBuffer, LogHub, PlatformTerminator, ProcessTarget,
    ProcessTreeTerminator, SubscriberId, Subscription,
};
