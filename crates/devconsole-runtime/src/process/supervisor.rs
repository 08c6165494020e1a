//! Dev-server lifecycle management.
//!
//! Owns at most one child process at a time, funnels its output into a
//! [`LogSinkPort`] and reports unexpected exits without being polled.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use devconsole_core::ports::LogSinkPort;
use devconsole_core::{LogOrigin, ProcessInfo, ProcessState, ServerStatus, SupervisorError};
use tokio::process::Child;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::shutdown::{PlatformTerminator, ProcessTarget, ProcessTreeTerminator};
use super::spawn_stream_reader;
use super::types::DevServerCommand;

/// How long `stop` waits for the killed child to be reaped.
pub const DEFAULT_EXIT_GRACE: Duration = Duration::from_secs(2);

/// How long the exit watcher lets the output readers drain after the child
/// exits. Orphaned grandchildren may hold the pipes open indefinitely.
const READER_DRAIN: Duration = Duration::from_millis(500);

struct ActiveProcess {
    generation: u64,
    info: ProcessInfo,
    exited: watch::Receiver<bool>,
}

impl ActiveProcess {
    const fn target(&self) -> ProcessTarget {
        ProcessTarget {
            pid: self.info.pid,
            pgid: self.info.pgid,
        }
    }
}

type Slot = Arc<Mutex<Option<ActiveProcess>>>;

fn lock_slot(slot: &Mutex<Option<ActiveProcess>>) -> MutexGuard<'_, Option<ActiveProcess>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Supervisor for the project's development server.
///
/// `start` and `stop` are serialized: a second `start` waits for the first
/// to finish spawning, then stops that child before spawning its own, so two
/// dev servers never race for the same port.
pub struct DevServerSupervisor {
    command: DevServerCommand,
    sink: Arc<dyn LogSinkPort>,
    terminator: Arc<dyn ProcessTreeTerminator>,
    exit_grace: Duration,
    lifecycle: tokio::sync::Mutex<()>,
    active: Slot,
    generations: AtomicU64,
}

impl DevServerSupervisor {
    /// Create a supervisor running `command` and publishing into `sink`.
    pub fn new(command: DevServerCommand, sink: Arc<dyn LogSinkPort>) -> Self {
        Self {
            command,
            sink,
            terminator: Arc::new(PlatformTerminator),
            exit_grace: DEFAULT_EXIT_GRACE,
            lifecycle: tokio::sync::Mutex::new(()),
            active: Arc::new(Mutex::new(None)),
            generations: AtomicU64::new(0),
        }
    }

    /// Replace the process-tree terminator.
    #[must_use]
    pub fn with_terminator(mut self, terminator: Arc<dyn ProcessTreeTerminator>) -> Self {
        self.terminator = terminator;
        self
    }

    /// Set how long `stop` waits for exit confirmation after the kill.
    ///
    /// `Duration::ZERO` returns as soon as the kill has been issued.
    #[must_use]
    pub const fn with_exit_grace(mut self, exit_grace: Duration) -> Self {
        self.exit_grace = exit_grace;
        self
    }

    fn announce(&self, message: impl Into<String>) {
        let message = message.into();
        info!(target: "devconsole.supervisor", "{}", message);
        self.sink.append(LogOrigin::Supervisor, message);
    }

    /// Start the dev server in `working_dir`, stopping any current one first.
    ///
    /// Returns once the spawn has been issued; it does not wait for the
    /// server to become ready.
    pub async fn start(&self, working_dir: impl AsRef<Path>) -> Result<ProcessInfo, SupervisorError> {
        let working_dir = working_dir.as_ref();
        if !working_dir.is_dir() {
            return Err(SupervisorError::InvalidWorkingDirectory(
                working_dir.to_path_buf(),
            ));
        }

        let _lifecycle = self.lifecycle.lock().await;
        self.stop_locked().await;

        self.announce(format!(
            "Starting development server in {}...",
            working_dir.display()
        ));

        let mut child = match self.command.build(working_dir).spawn() {
            Ok(child) => child,
            Err(source) => {
                self.announce(format!("Process error: {source}"));
                return Err(SupervisorError::Spawn {
                    command: self.command.to_string(),
                    source,
                });
            }
        };

        let Some(pid) = child.id() else {
            self.announce("Process error: child exited before it could be tracked");
            return Err(SupervisorError::Spawn {
                command: self.command.to_string(),
                source: std::io::Error::other("child exited before it could be tracked"),
            });
        };
        let pgid = cfg!(unix).then_some(pid);

        let readers = self.spawn_log_readers(&mut child, pid);
        let generation = self.generations.fetch_add(1, Ordering::SeqCst) + 1;
        let (exited_tx, exited_rx) = watch::channel(false);
        let info = ProcessInfo::new(pid, pgid, working_dir.to_path_buf());

        *lock_slot(&self.active) = Some(ActiveProcess {
            generation,
            info: info.clone(),
            exited: exited_rx,
        });
        self.spawn_exit_watcher(child, generation, readers, exited_tx);

        info!(
            pid,
            pgid = ?pgid,
            working_dir = %working_dir.display(),
            command = %self.command,
            "Development server spawned"
        );
        Ok(info)
    }

    fn spawn_log_readers(&self, child: &mut Child, pid: u32) -> Vec<JoinHandle<()>> {
        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(spawn_stream_reader(
                stdout,
                pid,
                LogOrigin::Stdout,
                Arc::clone(&self.sink),
            ));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(spawn_stream_reader(
                stderr,
                pid,
                LogOrigin::Stderr,
                Arc::clone(&self.sink),
            ));
        }
        readers
    }

    /// Reap the child, release its handle and report how it ended.
    fn spawn_exit_watcher(
        &self,
        mut child: Child,
        generation: u64,
        readers: Vec<JoinHandle<()>>,
        exited: watch::Sender<bool>,
    ) {
        let sink = Arc::clone(&self.sink);
        let active = Arc::clone(&self.active);

        tokio::spawn(async move {
            let outcome = child.wait().await;

            // Helpers may keep the pipes open; the leader's exit alone ends the run
            {
                let mut slot = lock_slot(&active);
                if slot.as_ref().is_some_and(|p| p.generation == generation) {
                    *slot = None;
                }
            }

            // Let buffered output land before the exit line
            let drained = timeout(READER_DRAIN, async {
                for reader in readers {
                    let _ = reader.await;
                }
            })
            .await;
            if drained.is_err() {
                debug!(generation, "output readers still open after exit");
            }

            let message = match outcome {
                Ok(status) => describe_exit(status),
                Err(e) => {
                    warn!(generation, error = %e, "Failed to wait on development server");
                    format!("Process error: {e}")
                }
            };

            info!(target: "devconsole.supervisor", "{}", message);
            sink.append(LogOrigin::Supervisor, message);
            let _ = exited.send(true);
        });
    }

    /// Stop the dev server and every process it spawned.
    ///
    /// A no-op when nothing is running. Termination is best effort: a kill
    /// failure is logged and the handle is released anyway.
    pub async fn stop(&self) {
        let _lifecycle = self.lifecycle.lock().await;
        self.stop_locked().await;
    }

    async fn stop_locked(&self) {
        let Some((generation, target, mut exited)) = self.begin_stopping() else {
            debug!("Stop requested with no running development server");
            return;
        };

        info!(pid = target.pid, pgid = ?target.pgid, "Stopping development server");
        if let Err(e) = self.terminator.terminate(&target).await {
            warn!(pid = target.pid, error = %e, "Failed to terminate development server");
        }

        let confirmed = self.exit_grace.is_zero()
            || timeout(self.exit_grace, exited.wait_for(|done| *done))
                .await
                .is_ok();
        if !confirmed {
            warn!(
                pid = target.pid,
                grace = ?self.exit_grace,
                "Development server did not confirm exit, it may be orphaned"
            );
        }

        {
            let mut slot = lock_slot(&self.active);
            if slot.as_ref().is_some_and(|p| p.generation == generation) {
                *slot = None;
            }
        }

        self.announce("Development server stopped.");
    }

    fn begin_stopping(&self) -> Option<(u64, ProcessTarget, watch::Receiver<bool>)> {
        let mut slot = lock_slot(&self.active);
        let process = slot.as_mut()?;
        process.info.state = ProcessState::Stopping;
        Some((process.generation, process.target(), process.exited.clone()))
    }

    /// `Running` while a child is tracked, `Stopped` otherwise.
    pub fn status(&self) -> ServerStatus {
        if lock_slot(&self.active).is_some() {
            ServerStatus::Running
        } else {
            ServerStatus::Stopped
        }
    }

    /// Details of the tracked child, if any.
    pub fn info(&self) -> Option<ProcessInfo> {
        lock_slot(&self.active).as_ref().map(|p| p.info.clone())
    }

    /// Stop any running child; called when the host is shutting down.
    pub async fn shutdown(&self) {
        if self.status().is_running() {
            info!("Shutting down development server");
        }
        self.stop().await;
    }
}

fn describe_exit(status: std::process::ExitStatus) -> String {
    if let Some(code) = status.code() {
        return format!("Process exited with code {code}");
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return format!("Process terminated by signal {signal}");
        }
    }

    "Process exited".to_string()
}

// Drop cannot await the terminator, so this only covers a supervisor that is
// dropped without `shutdown()`.
impl Drop for DevServerSupervisor {
    fn drop(&mut self) {
        let Some(process) = lock_slot(&self.active).take() else {
            return;
        };

        #[cfg(any(unix, windows))]
        if let Err(e) = super::shutdown::kill_tree_now(&process.target()) {
            warn!(pid = process.info.pid, error = %e, "Failed to kill development server on drop");
        }
        #[cfg(not(any(unix, windows)))]
        let _ = process;
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::process::LogHub;
    use crate::process::shutdown::{MockProcessTreeTerminator, kill_tree_now, process_exists};
    use devconsole_core::{LogLine, TerminationError};
    use tempfile::TempDir;
    use tokio::sync::mpsc;

    const WAIT: Duration = Duration::from_secs(10);

    fn supervisor(script: &str) -> (Arc<LogHub>, DevServerSupervisor) {
        let hub = Arc::new(LogHub::new(1000, 1024));
        let supervisor = DevServerSupervisor::new(DevServerCommand::shell(script), hub.clone());
        (hub, supervisor)
    }

    async fn wait_for_line(
        receiver: &mut mpsc::Receiver<LogLine>,
        predicate: impl Fn(&LogLine) -> bool,
    ) -> LogLine {
        timeout(WAIT, async {
            loop {
                let line = receiver.recv().await.expect("hub closed the subscription");
                if predicate(&line) {
                    return line;
                }
            }
        })
        .await
        .expect("timed out waiting for log line")
    }

    fn count_containing(hub: &LogHub, needle: &str) -> usize {
        hub.snapshot()
            .iter()
            .filter(|l| l.content.contains(needle))
            .count()
    }

    #[tokio::test]
    async fn start_rejects_missing_directory() {
        let (hub, supervisor) = supervisor("true");
        let err = supervisor
            .start("/nonexistent/devconsole/project")
            .await
            .unwrap_err();

        assert!(matches!(err, SupervisorError::InvalidWorkingDirectory(_)));
        assert_eq!(supervisor.status(), ServerStatus::Stopped);
        assert!(hub.is_empty());
    }

    #[tokio::test]
    async fn start_rejects_file_path() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("package.json");
        std::fs::write(&file, "{}").unwrap();

        let (_hub, supervisor) = supervisor("true");
        let err = supervisor.start(&file).await.unwrap_err();
        assert!(matches!(err, SupervisorError::InvalidWorkingDirectory(_)));
    }

    #[tokio::test]
    async fn spawn_failure_is_surfaced_and_nothing_is_tracked() {
        let dir = TempDir::new().unwrap();
        let hub = Arc::new(LogHub::with_defaults());
        let supervisor = DevServerSupervisor::new(
            DevServerCommand::new("/nonexistent/devconsole-dev-server", ["dev"]),
            hub.clone(),
        );

        let err = supervisor.start(dir.path()).await.unwrap_err();

        assert!(matches!(err, SupervisorError::Spawn { .. }));
        assert_eq!(supervisor.status(), ServerStatus::Stopped);
        assert!(supervisor.info().is_none());
        assert_eq!(count_containing(&hub, "Process error"), 1);
    }

    #[tokio::test]
    async fn start_runs_in_directory_and_captures_output() {
        let dir = TempDir::new().unwrap();
        let (hub, supervisor) = supervisor("echo \"cwd=$(pwd)\"; echo oops >&2; sleep 30");
        let mut sub = hub.subscribe();

        let info = supervisor.start(dir.path()).await.unwrap();
        assert_eq!(supervisor.status(), ServerStatus::Running);
        assert_eq!(info.working_directory, dir.path());
        assert_eq!(info.pgid, Some(info.pid));
        assert_eq!(count_containing(&hub, "Starting development server"), 1);

        let cwd = wait_for_line(&mut sub.receiver, |l| l.content.starts_with("cwd=")).await;
        assert_eq!(cwd.origin, LogOrigin::Stdout);
        let canonical = dir.path().canonicalize().unwrap();
        assert_eq!(cwd.content, format!("cwd={}", canonical.display()));

        let err = wait_for_line(&mut sub.receiver, |l| l.content == "oops").await;
        assert_eq!(err.origin, LogOrigin::Stderr);

        supervisor.stop().await;
        assert_eq!(supervisor.status(), ServerStatus::Stopped);
        assert!(!process_exists(info.pid));
        assert_eq!(count_containing(&hub, "Development server stopped."), 1);
    }

    #[tokio::test]
    async fn stop_when_stopped_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let (hub, supervisor) = supervisor("sleep 30");

        supervisor.stop().await;
        assert!(hub.is_empty());

        supervisor.start(dir.path()).await.unwrap();
        supervisor.stop().await;
        supervisor.stop().await;

        assert_eq!(supervisor.status(), ServerStatus::Stopped);
        assert_eq!(count_containing(&hub, "Development server stopped."), 1);
    }

    #[tokio::test]
    async fn unexpected_exit_clears_handle_and_reports_code() {
        let dir = TempDir::new().unwrap();
        let (hub, supervisor) = supervisor("echo bye; exit 3");
        let mut sub = hub.subscribe();

        supervisor.start(dir.path()).await.unwrap();
        wait_for_line(&mut sub.receiver, |l| {
            l.content == "Process exited with code 3"
        })
        .await;

        assert_eq!(supervisor.status(), ServerStatus::Stopped);
        assert!(supervisor.info().is_none());

        let lines: Vec<String> = hub.snapshot().into_iter().map(|l| l.content).collect();
        let bye = lines.iter().position(|l| l == "bye").unwrap();
        let exit = lines
            .iter()
            .position(|l| l == "Process exited with code 3")
            .unwrap();
        assert!(bye < exit);
    }

    #[tokio::test]
    async fn leader_exit_clears_handle_while_helpers_hold_pipes() {
        let dir = TempDir::new().unwrap();
        let (hub, supervisor) = supervisor("sleep 5 & exit 3");
        let mut sub = hub.subscribe();

        let info = supervisor.start(dir.path()).await.unwrap();

        // Reaped by the exit watcher once it leaves the process table
        timeout(WAIT, async {
            while process_exists(info.pid) {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("leader was never reaped");
        let reaped_at = tokio::time::Instant::now();

        timeout(WAIT, async {
            while supervisor.status().is_running() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("status never reported stopped");
        assert!(reaped_at.elapsed() < READER_DRAIN / 2);

        // The exit line still follows, after the drain window
        wait_for_line(&mut sub.receiver, |l| {
            l.content == "Process exited with code 3"
        })
        .await;

        let _ = kill_tree_now(&ProcessTarget {
            pid: info.pid,
            pgid: info.pgid,
        });
    }

    #[tokio::test]
    async fn external_kill_is_observed_without_polling() {
        use nix::sys::signal::{Signal, kill};
        use nix::unistd::Pid;

        let dir = TempDir::new().unwrap();
        let (hub, supervisor) = supervisor("sleep 30");
        let mut sub = hub.subscribe();

        let info = supervisor.start(dir.path()).await.unwrap();
        kill(Pid::from_raw(i32::try_from(info.pid).unwrap()), Signal::SIGKILL).unwrap();

        wait_for_line(&mut sub.receiver, |l| {
            l.content == "Process terminated by signal 9"
        })
        .await;
        assert_eq!(supervisor.status(), ServerStatus::Stopped);
    }

    #[tokio::test]
    async fn restart_replaces_previous_child() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        let (_hub, supervisor) = supervisor("sleep 30");

        let old = supervisor.start(first.path()).await.unwrap();
        let new = supervisor.start(second.path()).await.unwrap();

        assert_ne!(old.pid, new.pid);
        assert!(!process_exists(old.pid));
        let current = supervisor.info().unwrap();
        assert_eq!(current.pid, new.pid);
        assert_eq!(current.working_directory, second.path());

        supervisor.stop().await;
    }

    #[tokio::test]
    async fn concurrent_starts_leave_one_child() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        let (_hub, supervisor) = supervisor("sleep 30");
        let supervisor = Arc::new(supervisor);

        let (a, b) = tokio::join!(
            supervisor.start(first.path()),
            supervisor.start(second.path())
        );
        let (a, b) = (a.unwrap(), b.unwrap());

        let current = supervisor.info().unwrap();
        let (winner, loser) = if current.pid == a.pid { (a, b) } else { (b, a) };
        assert_eq!(current.pid, winner.pid);
        assert!(!process_exists(loser.pid));

        supervisor.stop().await;
        assert!(!process_exists(winner.pid));
    }

    #[tokio::test]
    #[cfg(target_os = "linux")]
    async fn stop_kills_forked_subprocesses() {
        fn is_gone(pid: u32) -> bool {
            // Reparented grandchildren may linger as zombies until init reaps them
            std::fs::read_to_string(format!("/proc/{pid}/stat"))
                .map(|stat| stat.contains(") Z "))
                .unwrap_or(true)
        }

        let dir = TempDir::new().unwrap();
        let (hub, supervisor) = supervisor("sleep 30 & echo \"child=$!\"; wait");
        let mut sub = hub.subscribe();

        supervisor.start(dir.path()).await.unwrap();
        let line = wait_for_line(&mut sub.receiver, |l| l.content.starts_with("child=")).await;
        let grandchild: u32 = line.content.trim_start_matches("child=").parse().unwrap();
        assert!(!is_gone(grandchild));

        supervisor.stop().await;

        let gone = timeout(WAIT, async {
            while !is_gone(grandchild) {
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        })
        .await;
        assert!(gone.is_ok(), "forked subprocess survived stop");
    }

    #[tokio::test]
    async fn kill_failure_still_releases_handle() {
        let dir = TempDir::new().unwrap();
        let hub = Arc::new(LogHub::with_defaults());

        let mut terminator = MockProcessTreeTerminator::new();
        terminator.expect_terminate().times(1).returning(|target| {
            Err(TerminationError::new(
                target.pid,
                std::io::Error::from(std::io::ErrorKind::PermissionDenied),
            ))
        });

        let supervisor =
            DevServerSupervisor::new(DevServerCommand::shell("sleep 30"), hub.clone())
                .with_terminator(Arc::new(terminator))
                .with_exit_grace(Duration::from_millis(100));

        let info = supervisor.start(dir.path()).await.unwrap();
        supervisor.stop().await;

        assert_eq!(supervisor.status(), ServerStatus::Stopped);
        assert_eq!(count_containing(&hub, "Development server stopped."), 1);

        // The orphan is still alive; clean it up directly
        assert!(process_exists(info.pid));
        PlatformTerminator
            .terminate(&ProcessTarget {
                pid: info.pid,
                pgid: info.pgid,
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn drop_kills_tracked_child() {
        let dir = TempDir::new().unwrap();
        let (hub, supervisor) = supervisor("sleep 30");
        let mut sub = hub.subscribe();

        supervisor.start(dir.path()).await.unwrap();
        drop(supervisor);

        // The exit watcher outlives the supervisor and still reports
        wait_for_line(&mut sub.receiver, |l| {
            l.content == "Process terminated by signal 9"
        })
        .await;
    }
}
