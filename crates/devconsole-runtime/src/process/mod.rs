//! Dev-server process management with integrated log streaming.
//!
//! # Structure
//!
//! - `LogHub` / `LogBuffer` - backlog ring buffer plus per-observer queues
//! - `DevServerSupervisor` - start/stop/status of the single child process
//! - `spawn_stream_reader` - newline-framed, lossy-UTF-8 output readers
//! - `shutdown` - platform process-tree termination

mod logs;
pub mod shutdown;
mod stream;
mod supervisor;
mod types;

pub use logs::{
    DEFAULT_LOG_CAPACITY, DEFAULT_SUBSCRIBER_QUEUE, LogBuffer, LogHub, SubscriberId, Subscription,
};
pub use shutdown::{PlatformTerminator, ProcessTarget, ProcessTreeTerminator};
pub(crate) use stream::spawn_stream_reader;
pub use supervisor::{DEFAULT_EXIT_GRACE, DevServerSupervisor};
pub use types::DevServerCommand;
