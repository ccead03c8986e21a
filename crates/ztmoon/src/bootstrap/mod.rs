//! Transient daemon run that materialises identity and config files.
//!
//! The daemon is started in user mode and polled until it writes its PID
//! marker. A daemon that exits first is fatal and its captured output travels
//! with the error. Once the marker appears the daemon is terminated and
//! reaped before the next phase starts anything.

use std::fs;
use std::io;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use ztmoon_config::{BOOTSTRAP_POLL_INTERVAL, ConfigLayout, Executables};

use crate::errors::InitError;
use crate::process::{ChildProcess, ExitState, Invocation, Launcher, ReapGuard, ShutdownRelay};
use crate::reporter::PhaseReporter;

/// Outcome of a successful bootstrap run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootstrapReport {
    /// Waiting notices emitted before the marker appeared.
    pub waits: u32,
    /// How the bootstrap daemon exited after termination.
    pub daemon_exit: ExitState,
}

/// Runs the daemon until its PID marker exists.
#[derive(Debug, Clone, Copy)]
pub struct BootstrapPhase<'a> {
    layout: &'a ConfigLayout,
    executables: &'a Executables,
    poll_interval: Duration,
    timeout: Option<Duration>,
}

impl<'a> BootstrapPhase<'a> {
    /// Polls every [`BOOTSTRAP_POLL_INTERVAL`] with no deadline.
    #[must_use]
    pub const fn new(layout: &'a ConfigLayout, executables: &'a Executables) -> Self {
        Self {
            layout,
            executables,
            poll_interval: BOOTSTRAP_POLL_INTERVAL,
            timeout: None,
        }
    }

    /// Overrides the sleep between polls.
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Gives up once `timeout` has elapsed without the marker appearing.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Starts the daemon, waits for its marker, then terminates and reaps it.
    ///
    /// # Errors
    ///
    /// Returns [`InitError::PrematureExit`] when the daemon exits before the
    /// marker appears, [`InitError::Interrupted`] when that exit followed a
    /// shutdown signal, [`InitError::BootstrapTimeout`] when the deadline
    /// passes, and spawn, monitor, or cleanup errors as they occur.
    pub fn run<L: Launcher>(
        &self,
        launcher: &L,
        relay: &ShutdownRelay,
        reporter: &dyn PhaseReporter,
    ) -> Result<BootstrapReport, InitError> {
        let marker = self.layout.pid_path();
        remove_stale_marker(marker)?;

        let program = self.executables.daemon();
        reporter.bootstrap_starting(program);
        let child = launcher.spawn(&Invocation::daemon(self.executables, self.layout))?;
        let mut guard = ReapGuard::new(child, relay);

        let started = Instant::now();
        let mut waits: u32 = 0;
        loop {
            thread::sleep(self.poll_interval);
            if !guard.child_mut().is_alive()? {
                let console_log = guard.child_mut().drain_output();
                if let Some(signal) = relay.requested() {
                    return Err(InitError::Interrupted { signal });
                }
                return Err(InitError::PrematureExit {
                    program: program.to_path_buf(),
                    status: guard.child().exit_state().unwrap_or(ExitState::Unknown),
                    console_log,
                });
            }
            if marker.is_file() {
                reporter.config_generated(marker);
                break;
            }
            if let Some(timeout) = self.timeout
                && started.elapsed() >= timeout
            {
                return Err(InitError::BootstrapTimeout {
                    program: program.to_path_buf(),
                    marker: marker.to_path_buf(),
                    timeout,
                });
            }
            waits = waits.saturating_add(1);
            reporter.waiting_for_daemon(waits);
        }

        reporter.bootstrap_terminating();
        let daemon_exit = guard.finish()?;
        Ok(BootstrapReport { waits, daemon_exit })
    }
}

/// Removes a marker left behind by an earlier run of the container.
fn remove_stale_marker(marker: &Path) -> Result<(), InitError> {
    match fs::remove_file(marker) {
        Ok(()) => Ok(()),
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(InitError::Cleanup {
            path: marker.to_path_buf(),
            source,
        }),
    }
}
