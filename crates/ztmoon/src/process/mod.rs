//! Child process plumbing shared by every phase.
//!
//! Phases talk to subprocesses through the [`ChildProcess`] and [`Launcher`]
//! traits so tests can substitute scripted doubles. The production
//! implementation, [`ProcessHandle`], merges the child's stdout and stderr
//! into a single line stream.

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;

use ztmoon_config::{ConfigLayout, Executables};

use crate::errors::InitError;

mod guard;
mod handle;
mod relay;

pub(crate) use guard::ReapGuard;
pub use handle::{ProcessHandle, SystemLauncher};
pub use relay::{RelayListener, ShutdownRelay};

pub(crate) const PROCESS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::process");

/// How a child process finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitState {
    /// The process exited with a status code.
    Code(i32),
    /// The process was killed by a signal.
    Signal(i32),
    /// The platform reported neither a code nor a signal.
    Unknown,
}

impl ExitState {
    /// True for a zero exit code.
    #[must_use]
    pub const fn success(self) -> bool {
        matches!(self, Self::Code(0))
    }
}

impl From<ExitStatus> for ExitState {
    fn from(status: ExitStatus) -> Self {
        use std::os::unix::process::ExitStatusExt;

        if let Some(code) = status.code() {
            Self::Code(code)
        } else if let Some(signal) = status.signal() {
            Self::Signal(signal)
        } else {
            Self::Unknown
        }
    }
}

impl fmt::Display for ExitState {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Code(code) => write!(formatter, "exit code {code}"),
            Self::Signal(signal) => write!(formatter, "killed by signal {signal}"),
            Self::Unknown => formatter.write_str("unknown exit status"),
        }
    }
}

/// Command line, arguments, and working directory of one subprocess.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    program: PathBuf,
    args: Vec<OsString>,
    working_dir: Option<PathBuf>,
}

impl Invocation {
    /// Starts an invocation of `program` with no arguments.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
        }
    }

    /// The user-mode daemon invocation rooted at the layout's config dir.
    ///
    /// Bootstrap and supervision use this exact invocation; the two runs
    /// must never overlap because both write the same PID and config files.
    pub fn daemon(executables: &Executables, layout: &ConfigLayout) -> Self {
        Self::new(executables.daemon()).args(Executables::daemon_args(layout))
    }

    /// Appends one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_owned());
        self
    }

    /// Appends several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|arg| arg.as_ref().to_owned()));
        self
    }

    /// Runs the process from `dir` instead of the current directory.
    #[must_use]
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Executable path.
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Arguments passed after the executable.
    pub fn arguments(&self) -> &[OsString] {
        &self.args
    }

    /// Working directory override, if any.
    pub fn working_dir(&self) -> Option<&Path> {
        self.working_dir.as_deref()
    }
}

/// A spawned subprocess whose merged output can be read line by line.
///
/// Every caller that invokes [`ChildProcess::terminate`] must follow it with
/// [`ChildProcess::wait`] before discarding the child; every phase holds
/// its child in a reap guard that does this on all exit paths.
pub trait ChildProcess {
    /// Executable the child was started from.
    fn program(&self) -> &Path;

    /// OS process ID, when the child is a real process.
    fn id(&self) -> Option<u32>;

    /// Non-blocking liveness check.
    ///
    /// # Errors
    ///
    /// Returns [`InitError::Monitor`] when the status cannot be queried.
    fn is_alive(&mut self) -> Result<bool, InitError>;

    /// Exit state, once the child has been observed to exit.
    fn exit_state(&self) -> Option<ExitState>;

    /// Blocks until the next output line; `None` once the stream is closed.
    ///
    /// # Errors
    ///
    /// Returns [`InitError::Monitor`] when reading the pipe fails.
    fn next_output_line(&mut self) -> Result<Option<String>, InitError>;

    /// Sends a graceful termination signal. A no-op once the child exited.
    ///
    /// # Errors
    ///
    /// Returns [`InitError::Signal`] when the signal cannot be delivered.
    fn terminate(&mut self) -> Result<(), InitError>;

    /// Blocks until the child has exited and reaps it.
    ///
    /// # Errors
    ///
    /// Returns [`InitError::Monitor`] when waiting fails.
    fn wait(&mut self) -> Result<ExitState, InitError>;

    /// Reads every remaining output line, stopping quietly on read errors.
    fn drain_output(&mut self) -> Vec<String> {
        let mut lines = Vec::new();
        while let Ok(Some(line)) = self.next_output_line() {
            lines.push(line);
        }
        lines
    }
}

/// Starts child processes for the phases.
pub trait Launcher {
    /// Child handle produced by this launcher.
    type Child: ChildProcess;

    /// Spawns `invocation` with merged stdout and stderr.
    ///
    /// # Errors
    ///
    /// Returns [`InitError::Spawn`] when the executable cannot be started.
    fn spawn(&self, invocation: &Invocation) -> Result<Self::Child, InitError>;
}

/// Runs a short-lived tool to completion and returns its output lines.
///
/// The child is reaped on every path; a non-zero exit becomes
/// [`InitError::ToolFailed`] carrying the captured output.
pub(crate) fn run_to_completion<L: Launcher>(
    launcher: &L,
    relay: &ShutdownRelay,
    invocation: &Invocation,
    subcommand: &'static str,
) -> Result<Vec<String>, InitError> {
    let child = launcher.spawn(invocation)?;
    let mut guard = ReapGuard::new(child, relay);
    let mut console_log = Vec::new();
    while let Some(line) = guard.child_mut().next_output_line()? {
        console_log.push(line);
    }
    let state = guard.wait_for_exit()?;
    if state.success() {
        Ok(console_log)
    } else {
        Err(InitError::ToolFailed {
            program: invocation.program().to_path_buf(),
            subcommand,
            status: state,
            console_log,
        })
    }
}
