//! Shared types for process management.

use std::fmt;
use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;

/// The command a supervisor runs to start a project's dev server.
///
/// Fixed for the lifetime of a supervisor; `start` only chooses the
/// working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DevServerCommand {
    program: String,
    args: Vec<String>,
    display: String,
}

impl DevServerCommand {
    /// Shell line run when nothing else is configured.
    pub const DEFAULT_SHELL_LINE: &'static str = "npm run dev";

    /// Run `line` through the platform shell (`sh -c` / `cmd /C`).
    pub fn shell(line: impl Into<String>) -> Self {
        let line = line.into();
        #[cfg(windows)]
        let (program, flag) = ("cmd", "/C");
        #[cfg(not(windows))]
        let (program, flag) = ("sh", "-c");

        Self {
            program: program.to_string(),
            args: vec![flag.to_string(), line.clone()],
            display: line,
        }
    }

    /// Execute `program` directly with `args`, without a shell.
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let program = program.into();
        let args: Vec<String> = args.into_iter().map(Into::into).collect();
        let display = std::iter::once(program.as_str())
            .chain(args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ");

        Self {
            program,
            args,
            display,
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Build the spawnable command rooted in `working_dir`.
    ///
    /// On Unix the child leads a new process group so the whole tree can be
    /// signalled at once.
    pub(crate) fn build(&self, working_dir: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(false);

        #[cfg(unix)]
        cmd.process_group(0);

        cmd
    }
}

impl Default for DevServerCommand {
    fn default() -> Self {
        Self::shell(Self::DEFAULT_SHELL_LINE)
    }
}

impl fmt::Display for DevServerCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display)
    }
}
