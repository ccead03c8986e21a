//! Structured reporting of init sequence milestones.

use std::path::{Path, PathBuf};

use ztmoon_config::NetworkId;

use crate::errors::InitError;
use crate::process::ExitState;

const PREINIT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::preinit");
const BOOTSTRAP_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::bootstrap");
const MOON_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::moon");
const SUPERVISOR_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::supervisor");
const SEQUENCE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::sequence");
const DAEMON_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::daemon");

/// Observer trait used to surface phase events to telemetry sinks.
pub trait PhaseReporter: Send + Sync {
    /// The port was not configured and the default applies.
    fn port_defaulted(&self, port: u16);

    /// A configuration artifact was written.
    fn artifact_written(&self, path: &Path);

    /// An optional artifact was not configured and is left to the daemon.
    fn artifact_skipped(&self, artifact: &'static str);

    /// A network join file is about to be written.
    fn network_configured(&self, network: &NetworkId);

    /// The bootstrap daemon is being started.
    fn bootstrap_starting(&self, program: &Path);

    /// The marker has not appeared yet; `attempt` counts from one.
    fn waiting_for_daemon(&self, attempt: u32);

    /// The daemon wrote its marker.
    fn config_generated(&self, marker: &Path);

    /// The bootstrap daemon is being stopped.
    fn bootstrap_terminating(&self);

    /// The moon descriptor was extended and persisted.
    fn moon_descriptor_written(&self, path: &Path, roots: usize, endpoints_added: usize);

    /// `genmoon` produced the listed shards.
    fn moon_shards_generated(&self, shards: &[PathBuf]);

    /// The supervised daemon's moon ID is known.
    fn moon_identity(&self, moon_id: &str);

    /// One line of daemon output.
    fn daemon_output(&self, line: &str);

    /// Supervision ended and the daemon is being reaped.
    fn daemon_stopping(&self);

    /// The supervised daemon exited.
    fn daemon_exited(&self, state: ExitState);

    /// The sequence failed.
    fn sequence_failed(&self, error: &InitError);
}

/// Default reporter that records phase events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredPhaseReporter;

impl StructuredPhaseReporter {
    /// Builds a new reporter.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl PhaseReporter for StructuredPhaseReporter {
    fn port_defaulted(&self, port: u16) {
        tracing::info!(
            target: PREINIT_TARGET,
            event = "port_defaulted",
            port,
            "port not specified, using default port {port}"
        );
    }

    fn artifact_written(&self, path: &Path) {
        tracing::debug!(
            target: PREINIT_TARGET,
            event = "artifact_written",
            file = %path.display(),
            "configuration artifact written"
        );
    }

    fn artifact_skipped(&self, artifact: &'static str) {
        tracing::info!(
            target: PREINIT_TARGET,
            event = "artifact_skipped",
            artifact,
            "no {artifact} specified"
        );
    }

    fn network_configured(&self, network: &NetworkId) {
        tracing::info!(
            target: PREINIT_TARGET,
            event = "network_configured",
            network = network.short(),
            "configuring network {}",
            network.short()
        );
    }

    fn bootstrap_starting(&self, program: &Path) {
        tracing::info!(
            target: BOOTSTRAP_TARGET,
            event = "bootstrap_starting",
            program = %program.display(),
            "starting daemon to create config files"
        );
    }

    fn waiting_for_daemon(&self, attempt: u32) {
        tracing::info!(
            target: BOOTSTRAP_TARGET,
            event = "waiting_for_daemon",
            attempt,
            "waiting for daemon"
        );
    }

    fn config_generated(&self, marker: &Path) {
        tracing::info!(
            target: BOOTSTRAP_TARGET,
            event = "config_generated",
            marker = %marker.display(),
            "config generated"
        );
    }

    fn bootstrap_terminating(&self) {
        tracing::info!(
            target: BOOTSTRAP_TARGET,
            event = "bootstrap_terminating",
            "terminating bootstrap daemon"
        );
    }

    fn moon_descriptor_written(&self, path: &Path, roots: usize, endpoints_added: usize) {
        tracing::info!(
            target: MOON_TARGET,
            event = "moon_descriptor_written",
            file = %path.display(),
            roots,
            endpoints_added,
            "moon descriptor written"
        );
    }

    fn moon_shards_generated(&self, shards: &[PathBuf]) {
        for shard in shards {
            tracing::info!(
                target: MOON_TARGET,
                event = "moon_shard_generated",
                file = %shard.display(),
                "moon shard generated"
            );
        }
    }

    fn moon_identity(&self, moon_id: &str) {
        tracing::info!(
            target: SUPERVISOR_TARGET,
            event = "moon_identity",
            moon_id,
            "Moon ID: {moon_id}"
        );
        tracing::info!(
            target: SUPERVISOR_TARGET,
            "use the following command to orbit the moon: zerotier-cli orbit {moon_id} {moon_id}"
        );
    }

    fn daemon_output(&self, line: &str) {
        tracing::info!(target: DAEMON_TARGET, "[zerotier-one] {line}");
    }

    fn daemon_stopping(&self) {
        tracing::info!(
            target: SUPERVISOR_TARGET,
            event = "daemon_stopping",
            "waiting for daemon to quit"
        );
    }

    fn daemon_exited(&self, state: ExitState) {
        if state.success() {
            tracing::info!(
                target: SUPERVISOR_TARGET,
                event = "daemon_exited",
                status = %state,
                "daemon exited"
            );
        } else {
            tracing::warn!(
                target: SUPERVISOR_TARGET,
                event = "daemon_exited",
                status = %state,
                "daemon exited unsuccessfully"
            );
        }
    }

    fn sequence_failed(&self, error: &InitError) {
        tracing::error!(
            target: SEQUENCE_TARGET,
            event = "sequence_failed",
            error = %error,
            "init sequence failed"
        );
    }
}
