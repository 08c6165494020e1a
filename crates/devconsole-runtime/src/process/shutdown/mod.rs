//! Process-tree termination for the supervised dev server.
//!
//! A dev server usually forks helpers (bundler, file watcher, a shell), so
//! killing only the top-level pid leaves them running. Termination therefore
//! always targets the whole tree:
//! - Unix: `SIGKILL` to the child's process group, falling back to the
//!   leader pid if the group cannot be signalled
//! - Windows: `taskkill /f /t` by pid

#[cfg(unix)]
mod group;
#[cfg(windows)]
mod tree;

use async_trait::async_trait;
use devconsole_core::TerminationError;

#[cfg(unix)]
pub use group::kill_tree_now;
#[cfg(all(test, unix))]
pub(crate) use group::process_exists;
#[cfg(windows)]
pub use tree::kill_tree_now;

/// Identifies the tree to terminate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessTarget {
    /// Leader process id.
    pub pid: u32,
    /// Process group the leader was spawned into, where supported.
    pub pgid: Option<u32>,
}

/// Capability to forcibly terminate a process and all its descendants.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProcessTreeTerminator: Send + Sync {
    /// Issue the kill. Returns once the signal has been delivered, not once
    /// the processes have exited. A tree that is already gone is a success.
    async fn terminate(&self, target: &ProcessTarget) -> Result<(), TerminationError>;
}

/// Terminator for the current platform.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlatformTerminator;

#[async_trait]
impl ProcessTreeTerminator for PlatformTerminator {
    async fn terminate(&self, target: &ProcessTarget) -> Result<(), TerminationError> {
        #[cfg(any(unix, windows))]
        {
            kill_tree_now(target)
        }

        #[cfg(not(any(unix, windows)))]
        {
            Err(TerminationError::new(
                target.pid,
                std::io::Error::new(
                    std::io::ErrorKind::Unsupported,
                    "process tree termination is not supported on this platform",
                ),
            ))
        }
    }
}
