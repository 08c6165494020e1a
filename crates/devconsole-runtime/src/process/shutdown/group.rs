//! Unix process-group termination.

use std::io;

use devconsole_core::TerminationError;
use nix::errno::Errno;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use tracing::{debug, warn};

use super::ProcessTarget;

#[allow(clippy::cast_possible_wrap)]
fn to_pid(raw: u32) -> Pid {
    Pid::from_raw(raw as i32)
}

/// Send `SIGKILL` to the target's process group.
///
/// Synchronous so it can also run from `Drop`.
pub fn kill_tree_now(target: &ProcessTarget) -> Result<(), TerminationError> {
    let pgid = target.pgid.unwrap_or(target.pid);

    match signal::killpg(to_pid(pgid), Signal::SIGKILL) {
        Ok(()) => {
            debug!(pid = target.pid, pgid, "Sent SIGKILL to process group");
            Ok(())
        }
        // Every member already exited
        Err(Errno::ESRCH) => Ok(()),
        Err(group_err) => {
            warn!(pid = target.pid, pgid, error = %group_err, "Process group kill failed, killing leader only");
            match signal::kill(to_pid(target.pid), Signal::SIGKILL) {
                Ok(()) | Err(Errno::ESRCH) => Ok(()),
                Err(_) => Err(TerminationError::new(target.pid, io::Error::from(group_err))),
            }
        }
    }
}

/// Whether `pid` names a live (or not yet reaped) process.
#[cfg(test)]
pub(crate) fn process_exists(pid: u32) -> bool {
    match signal::kill(to_pid(pid), None) {
        Ok(()) => true,
        Err(Errno::ESRCH) => false,
        // Exists but belongs to someone else
        Err(_) => true,
    }
}
