//! Test double for [`PhaseReporter`] that records structured events for assertions.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use ztmoon_config::NetworkId;

use crate::errors::InitError;
use crate::process::ExitState;
use crate::reporter::PhaseReporter;

/// Phase events tracked during tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReporterEvent {
    PortDefaulted(u16),
    ArtifactWritten(PathBuf),
    ArtifactSkipped(&'static str),
    NetworkConfigured(String),
    BootstrapStarting(PathBuf),
    WaitingForDaemon(u32),
    ConfigGenerated(PathBuf),
    BootstrapTerminating,
    MoonDescriptorWritten {
        path: PathBuf,
        roots: usize,
        endpoints_added: usize,
    },
    MoonShardsGenerated(Vec<PathBuf>),
    MoonIdentity(String),
    DaemonOutput(String),
    DaemonStopping,
    DaemonExited(ExitState),
    SequenceFailed(String),
}

/// Records phase events for assertions.
#[derive(Debug, Default)]
pub struct RecordingPhaseReporter {
    events: Mutex<Vec<ReporterEvent>>,
}

impl RecordingPhaseReporter {
    /// Captures a copy of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<ReporterEvent> {
        self.events
            .lock()
            .expect("phase reporter mutex poisoned")
            .clone()
    }

    /// Labels of skipped optional artifacts, in order.
    #[must_use]
    pub fn skipped(&self) -> Vec<&'static str> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ReporterEvent::ArtifactSkipped(label) => Some(label),
                _ => None,
            })
            .collect()
    }

    /// Number of waiting notices emitted by the bootstrap loop.
    #[must_use]
    pub fn waiting_notices(&self) -> usize {
        self.events()
            .iter()
            .filter(|event| matches!(event, ReporterEvent::WaitingForDaemon(_)))
            .count()
    }

    /// Forwarded daemon lines, in order.
    #[must_use]
    pub fn daemon_output(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ReporterEvent::DaemonOutput(line) => Some(line),
                _ => None,
            })
            .collect()
    }

    fn record(&self, event: ReporterEvent) {
        self.events
            .lock()
            .expect("phase reporter mutex poisoned")
            .push(event);
    }
}

impl PhaseReporter for RecordingPhaseReporter {
    fn port_defaulted(&self, port: u16) {
        self.record(ReporterEvent::PortDefaulted(port));
    }

    fn artifact_written(&self, path: &Path) {
        self.record(ReporterEvent::ArtifactWritten(path.to_path_buf()));
    }

    fn artifact_skipped(&self, artifact: &'static str) {
        self.record(ReporterEvent::ArtifactSkipped(artifact));
    }

    fn network_configured(&self, network: &NetworkId) {
        self.record(ReporterEvent::NetworkConfigured(network.short().to_owned()));
    }

    fn bootstrap_starting(&self, program: &Path) {
        self.record(ReporterEvent::BootstrapStarting(program.to_path_buf()));
    }

    fn waiting_for_daemon(&self, attempt: u32) {
        self.record(ReporterEvent::WaitingForDaemon(attempt));
    }

    fn config_generated(&self, marker: &Path) {
        self.record(ReporterEvent::ConfigGenerated(marker.to_path_buf()));
    }

    fn bootstrap_terminating(&self) {
        self.record(ReporterEvent::BootstrapTerminating);
    }

    fn moon_descriptor_written(&self, path: &Path, roots: usize, endpoints_added: usize) {
        self.record(ReporterEvent::MoonDescriptorWritten {
            path: path.to_path_buf(),
            roots,
            endpoints_added,
        });
    }

    fn moon_shards_generated(&self, shards: &[PathBuf]) {
        self.record(ReporterEvent::MoonShardsGenerated(shards.to_vec()));
    }

    fn moon_identity(&self, moon_id: &str) {
        self.record(ReporterEvent::MoonIdentity(moon_id.to_owned()));
    }

    fn daemon_output(&self, line: &str) {
        self.record(ReporterEvent::DaemonOutput(line.to_owned()));
    }

    fn daemon_stopping(&self) {
        self.record(ReporterEvent::DaemonStopping);
    }

    fn daemon_exited(&self, state: ExitState) {
        self.record(ReporterEvent::DaemonExited(state));
    }

    fn sequence_failed(&self, error: &InitError) {
        self.record(ReporterEvent::SequenceFailed(error.to_string()));
    }
}
