//! Relays termination signals received by the supervisor to its child.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicI32, AtomicU32, Ordering};
use std::thread::{self, JoinHandle};

use nix::errno::Errno;
use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGQUIT, SIGTERM};
use signal_hook::iterator::{Handle, Signals};
use tracing::{info, warn};

use super::PROCESS_TARGET;
use crate::errors::InitError;

#[derive(Debug, Default)]
struct RelayState {
    child: AtomicU32,
    signal: AtomicI32,
}

/// Shared record of the tracked child and any shutdown signal received.
///
/// Only one child is tracked at a time, matching the one-subprocess-at-a-time
/// shape of the init sequence. A PID or signal value of zero means "none".
#[derive(Debug, Clone, Default)]
pub struct ShutdownRelay {
    state: Arc<RelayState>,
}

impl ShutdownRelay {
    /// Creates a relay with no child and no pending signal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs handlers for SIGTERM, SIGINT, SIGQUIT, and SIGHUP.
    ///
    /// Handlers stay installed until the returned listener is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`InitError::Signals`] when the handlers or the listener
    /// thread cannot be set up.
    pub fn listen(&self) -> Result<RelayListener, InitError> {
        let mut signals = Signals::new([SIGTERM, SIGINT, SIGQUIT, SIGHUP])
            .map_err(|source| InitError::Signals { source })?;
        let handle = signals.handle();
        let relay = self.clone();
        let thread = thread::Builder::new()
            .name("signal-relay".to_owned())
            .spawn(move || {
                for signal in signals.forever() {
                    relay.deliver(signal);
                }
            })
            .map_err(|source| InitError::Signals { source })?;
        Ok(RelayListener {
            handle,
            thread: Some(thread),
        })
    }

    /// The first signal received, if any.
    #[must_use]
    pub fn requested(&self) -> Option<i32> {
        match self.state.signal.load(Ordering::SeqCst) {
            0 => None,
            signal => Some(signal),
        }
    }

    pub(crate) fn track(&self, pid: u32) {
        self.state.child.store(pid, Ordering::SeqCst);
    }

    pub(crate) fn untrack(&self) {
        self.state.child.store(0, Ordering::SeqCst);
    }

    /// Records `signal` and forwards SIGTERM to the tracked child.
    pub(crate) fn deliver(&self, signal: i32) {
        drop(
            self.state
                .signal
                .compare_exchange(0, signal, Ordering::SeqCst, Ordering::SeqCst),
        );
        let pid = self.state.child.load(Ordering::SeqCst);
        info!(
            target: PROCESS_TARGET,
            signal,
            child = pid,
            "shutdown signal received"
        );
        if pid == 0 {
            return;
        }
        let Ok(raw) = i32::try_from(pid) else {
            return;
        };
        match kill(Pid::from_raw(raw), Signal::SIGTERM) {
            Ok(()) | Err(Errno::ESRCH) => {}
            Err(error) => warn!(
                target: PROCESS_TARGET,
                child = pid,
                error = %error,
                "failed to forward shutdown signal"
            ),
        }
    }
}

/// Keeps the signal handlers installed; dropping it stops the listener.
pub struct RelayListener {
    handle: Handle,
    thread: Option<JoinHandle<()>>,
}

impl fmt::Debug for RelayListener {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("RelayListener")
            .field("running", &self.thread.is_some())
            .finish_non_exhaustive()
    }
}

impl Drop for RelayListener {
    fn drop(&mut self) {
        self.handle.close();
        if let Some(thread) = self.thread.take()
            && thread.join().is_err()
        {
            warn!(target: PROCESS_TARGET, "signal relay thread panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_signal_wins() {
        let relay = ShutdownRelay::new();
        assert_eq!(relay.requested(), None);
        relay.deliver(SIGTERM);
        relay.deliver(SIGINT);
        assert_eq!(relay.requested(), Some(SIGTERM));
    }

    #[test]
    fn clones_share_state() {
        let relay = ShutdownRelay::new();
        let clone = relay.clone();
        clone.deliver(SIGHUP);
        assert_eq!(relay.requested(), Some(SIGHUP));
    }

    #[test]
    fn delivery_without_child_only_records() {
        let relay = ShutdownRelay::new();
        relay.track(0);
        relay.deliver(SIGQUIT);
        assert_eq!(relay.requested(), Some(SIGQUIT));
    }
}
