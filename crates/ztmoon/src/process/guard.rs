use tracing::warn;

use super::relay::ShutdownRelay;
use super::{ChildProcess, ExitState, PROCESS_TARGET};
use crate::errors::InitError;

/// Owns a child for the duration of one phase and reaps it on every exit path.
///
/// While the guard is alive the child's PID is registered with the
/// [`ShutdownRelay`] so termination signals reach it. Dropping the guard
/// without calling [`ReapGuard::finish`] or [`ReapGuard::wait_for_exit`]
/// terminates and waits for the child, logging any failure.
pub(crate) struct ReapGuard<'r, C: ChildProcess> {
    child: C,
    relay: &'r ShutdownRelay,
    reaped: bool,
}

impl<'r, C: ChildProcess> ReapGuard<'r, C> {
    pub(crate) fn new(mut child: C, relay: &'r ShutdownRelay) -> Self {
        if let Some(pid) = child.id() {
            relay.track(pid);
        }
        // A signal that arrived before the PID was tracked had nobody to
        // forward to.
        if relay.requested().is_some()
            && let Err(error) = child.terminate()
        {
            warn!(
                target: PROCESS_TARGET,
                program = %child.program().display(),
                error = %error,
                "failed to relay pending shutdown signal"
            );
        }
        Self {
            child,
            relay,
            reaped: false,
        }
    }

    pub(crate) fn child(&self) -> &C {
        &self.child
    }

    pub(crate) fn child_mut(&mut self) -> &mut C {
        &mut self.child
    }

    /// Terminates the child and waits for it to exit.
    pub(crate) fn finish(mut self) -> Result<ExitState, InitError> {
        self.reaped = true;
        self.relay.untrack();
        let terminated = self.child.terminate();
        let waited = self.child.wait();
        terminated?;
        waited
    }

    /// Waits for a child that is expected to exit on its own.
    pub(crate) fn wait_for_exit(mut self) -> Result<ExitState, InitError> {
        self.reaped = true;
        self.relay.untrack();
        self.child.wait()
    }
}

impl<C: ChildProcess> Drop for ReapGuard<'_, C> {
    fn drop(&mut self) {
        if self.reaped {
            return;
        }
        self.relay.untrack();
        if let Err(error) = self.child.terminate() {
            warn!(
                target: PROCESS_TARGET,
                program = %self.child.program().display(),
                error = %error,
                "failed to terminate child during cleanup"
            );
        }
        if let Err(error) = self.child.wait() {
            warn!(
                target: PROCESS_TARGET,
                program = %self.child.program().display(),
                error = %error,
                "failed to reap child during cleanup"
            );
        }
    }
}
