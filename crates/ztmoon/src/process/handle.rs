//! Real subprocesses with merged stdout and stderr.

use std::io::{self, BufRead, BufReader, PipeReader};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

use nix::errno::Errno;
use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use tracing::debug;

use super::{ChildProcess, ExitState, Invocation, Launcher, PROCESS_TARGET};
use crate::errors::InitError;

/// Launcher that spawns real processes as [`ProcessHandle`]s.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemLauncher;

impl Launcher for SystemLauncher {
    type Child = ProcessHandle;

    fn spawn(&self, invocation: &Invocation) -> Result<Self::Child, InitError> {
        ProcessHandle::spawn(invocation)
    }
}

/// A running subprocess whose stdout and stderr share one pipe.
#[derive(Debug)]
pub struct ProcessHandle {
    program: PathBuf,
    child: Child,
    output: BufReader<PipeReader>,
    exit: Option<ExitState>,
}

impl ProcessHandle {
    /// Spawns `invocation` with both output streams writing into one pipe.
    ///
    /// # Errors
    ///
    /// Returns [`InitError::Spawn`] when the pipe cannot be created or the
    /// executable cannot be started.
    pub fn spawn(invocation: &Invocation) -> Result<Self, InitError> {
        let program = invocation.program().to_path_buf();
        let spawn_error = |source: io::Error| InitError::Spawn {
            program: program.clone(),
            source,
        };

        let (reader, writer) = io::pipe().map_err(spawn_error)?;
        let stderr = writer.try_clone().map_err(spawn_error)?;

        let mut command = Command::new(&program);
        command
            .args(invocation.arguments())
            .stdin(Stdio::null())
            .stdout(writer)
            .stderr(stderr);
        if let Some(dir) = invocation.working_dir() {
            command.current_dir(dir);
        }
        let child = command.spawn().map_err(spawn_error)?;
        // The command still owns the parent's copies of the write end; the
        // reader only sees end-of-stream once they are closed.
        drop(command);

        debug!(
            target: PROCESS_TARGET,
            program = %program.display(),
            pid = child.id(),
            "spawned child process"
        );
        Ok(Self {
            program,
            child,
            output: BufReader::new(reader),
            exit: None,
        })
    }

    fn monitor_error(&self, source: io::Error) -> InitError {
        InitError::Monitor {
            program: self.program.clone(),
            source,
        }
    }

    fn record_exit(&mut self, state: ExitState) -> ExitState {
        if self.exit.is_none() {
            debug!(
                target: PROCESS_TARGET,
                program = %self.program.display(),
                status = %state,
                "child process exited"
            );
        }
        self.exit = Some(state);
        state
    }
}

impl ChildProcess for ProcessHandle {
    fn program(&self) -> &Path {
        &self.program
    }

    fn id(&self) -> Option<u32> {
        Some(self.child.id())
    }

    fn is_alive(&mut self) -> Result<bool, InitError> {
        if self.exit.is_some() {
            return Ok(false);
        }
        match self.child.try_wait() {
            Ok(Some(status)) => {
                self.record_exit(status.into());
                Ok(false)
            }
            Ok(None) => Ok(true),
            Err(source) => Err(self.monitor_error(source)),
        }
    }

    fn exit_state(&self) -> Option<ExitState> {
        self.exit
    }

    fn next_output_line(&mut self) -> Result<Option<String>, InitError> {
        let mut buffer = Vec::new();
        let read = self
            .output
            .read_until(b'\n', &mut buffer)
            .map_err(|source| self.monitor_error(source))?;
        if read == 0 {
            return Ok(None);
        }
        let line = String::from_utf8_lossy(&buffer);
        Ok(Some(line.trim_end_matches(['\n', '\r']).to_owned()))
    }

    fn terminate(&mut self) -> Result<(), InitError> {
        if !self.is_alive()? {
            return Ok(());
        }
        let id = self.child.id();
        let pid = i32::try_from(id).map_err(|_| InitError::Signal {
            program: self.program.clone(),
            pid: id,
            source: Errno::ESRCH,
        })?;
        match kill(Pid::from_raw(pid), Signal::SIGTERM) {
            Ok(()) => {
                debug!(
                    target: PROCESS_TARGET,
                    program = %self.program.display(),
                    pid = id,
                    "sent SIGTERM"
                );
                Ok(())
            }
            // Exited between the liveness check and the signal.
            Err(Errno::ESRCH) => Ok(()),
            Err(source) => Err(InitError::Signal {
                program: self.program.clone(),
                pid: id,
                source,
            }),
        }
    }

    fn wait(&mut self) -> Result<ExitState, InitError> {
        if let Some(state) = self.exit {
            return Ok(state);
        }
        let status = self
            .child
            .wait()
            .map_err(|source| self.monitor_error(source))?;
        Ok(self.record_exit(status.into()))
    }
}
