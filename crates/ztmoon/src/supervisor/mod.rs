//! Foreground supervision of the long-running daemon.

use std::fs;
use std::path::Path;

use ztmoon_config::{ConfigLayout, Executables};

use crate::errors::InitError;
use crate::process::{ChildProcess, ExitState, Invocation, Launcher, ReapGuard, ShutdownRelay};
use crate::reporter::PhaseReporter;

/// Runs the daemon in the foreground and forwards its output.
#[derive(Debug, Clone, Copy)]
pub struct SupervisorPhase<'a> {
    layout: &'a ConfigLayout,
    executables: &'a Executables,
}

impl<'a> SupervisorPhase<'a> {
    /// Supervises the daemon from `executables` against `layout`.
    #[must_use]
    pub const fn new(layout: &'a ConfigLayout, executables: &'a Executables) -> Self {
        Self {
            layout,
            executables,
        }
    }

    /// Starts the daemon, announces the moon ID, and forwards output until
    /// the daemon exits or closes its output.
    ///
    /// The daemon is terminated and reaped exactly once whether this returns
    /// normally or with an error.
    ///
    /// # Errors
    ///
    /// Returns spawn and monitor failures, and identity read failures after
    /// the daemon has been reaped.
    pub fn run<L: Launcher>(
        &self,
        launcher: &L,
        relay: &ShutdownRelay,
        reporter: &dyn PhaseReporter,
    ) -> Result<ExitState, InitError> {
        let child = launcher.spawn(&Invocation::daemon(self.executables, self.layout))?;
        let mut guard = ReapGuard::new(child, relay);

        let moon_id = read_moon_id(self.layout.identity_public_path())?;
        reporter.moon_identity(&moon_id);

        while guard.child_mut().is_alive()? {
            match guard.child_mut().next_output_line()? {
                Some(line) => reporter.daemon_output(&line),
                None => break,
            }
        }
        for line in guard.child_mut().drain_output() {
            reporter.daemon_output(&line);
        }

        reporter.daemon_stopping();
        let state = guard.finish()?;
        reporter.daemon_exited(state);
        Ok(state)
    }
}

/// The address before the first `:` of `identity.public`.
fn read_moon_id(path: &Path) -> Result<String, InitError> {
    let identity = fs::read_to_string(path).map_err(|source| InitError::ReadIdentity {
        path: path.to_path_buf(),
        source,
    })?;
    let moon_id = identity.split(':').next().unwrap_or_default().trim();
    if moon_id.is_empty() {
        return Err(InitError::MalformedIdentity {
            path: path.to_path_buf(),
        });
    }
    Ok(moon_id.to_owned())
}
