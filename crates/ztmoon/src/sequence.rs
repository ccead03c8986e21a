//! Orchestrates the phases in their fixed order.

use std::time::Duration;

use ztmoon_config::{BOOTSTRAP_POLL_INTERVAL, Config};

use crate::bootstrap::{BootstrapPhase, BootstrapReport};
use crate::errors::InitError;
use crate::moon::{MoonReport, MoonSynthesizer};
use crate::preinit::PreinitPhase;
use crate::process::{ExitState, Launcher, ShutdownRelay};
use crate::reporter::PhaseReporter;
use crate::supervisor::SupervisorPhase;

/// What each phase produced during a complete run.
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceReport {
    /// Bootstrap readiness outcome.
    pub bootstrap: BootstrapReport,
    /// Moon synthesis outcome.
    pub moon: MoonReport,
    /// How the supervised daemon exited.
    pub daemon_exit: ExitState,
}

/// Preinit, bootstrap, moon synthesis, and supervision, strictly in sequence.
///
/// Each phase is a prerequisite for the next, so the first error aborts the
/// run. A shutdown signal received between phases stops the sequence before
/// the next one starts.
pub struct InitSequence<'a, L: Launcher> {
    config: &'a Config,
    launcher: &'a L,
    relay: &'a ShutdownRelay,
    reporter: &'a dyn PhaseReporter,
    poll_interval: Duration,
}

impl<'a, L: Launcher> InitSequence<'a, L> {
    /// Prepares a run of `config` using `launcher` for every subprocess.
    #[must_use]
    pub const fn new(
        config: &'a Config,
        launcher: &'a L,
        relay: &'a ShutdownRelay,
        reporter: &'a dyn PhaseReporter,
    ) -> Self {
        Self {
            config,
            launcher,
            relay,
            reporter,
            poll_interval: BOOTSTRAP_POLL_INTERVAL,
        }
    }

    /// Overrides the bootstrap poll interval.
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Runs every phase and returns once the supervised daemon has exited.
    ///
    /// # Errors
    ///
    /// Returns the first phase error, or [`InitError::Interrupted`] when a
    /// shutdown signal arrived before supervision began.
    pub fn run(&self) -> Result<SequenceReport, InitError> {
        let config = self.config;
        let settings = config.bootstrap();
        let layout = config.layout();
        let executables = config.executables();

        if settings.port_defaulted() {
            self.reporter.port_defaulted(settings.port());
        }

        self.ensure_not_interrupted()?;
        PreinitPhase::new(layout).run(settings, self.reporter)?;

        self.ensure_not_interrupted()?;
        let bootstrap = BootstrapPhase::new(layout, executables)
            .with_poll_interval(self.poll_interval)
            .with_timeout(config.bootstrap_timeout())
            .run(self.launcher, self.relay, self.reporter)?;

        self.ensure_not_interrupted()?;
        let moon = MoonSynthesizer::new(layout, executables).run(
            self.launcher,
            self.relay,
            settings,
            self.reporter,
        )?;

        self.ensure_not_interrupted()?;
        let daemon_exit =
            SupervisorPhase::new(layout, executables).run(self.launcher, self.relay, self.reporter)?;

        Ok(SequenceReport {
            bootstrap,
            moon,
            daemon_exit,
        })
    }

    fn ensure_not_interrupted(&self) -> Result<(), InitError> {
        match self.relay.requested() {
            Some(signal) => Err(InitError::Interrupted { signal }),
            None => Ok(()),
        }
    }
}
