//! BDD test world: a temporary config root, scripted subprocesses, and the
//! outcome of one init sequence run.

use std::cell::RefCell;
use std::fs;
use std::time::Duration;

use clap::Parser;
use serde_json::json;
use tempfile::TempDir;
use ztmoon_config::{Cli, Config, ConfigLayout};

use crate::errors::InitError;
use crate::process::{ExitState, ShutdownRelay};
use crate::sequence::{InitSequence, SequenceReport};

use super::child::{ScriptedChild, ScriptedLauncher};
use super::reporter::RecordingPhaseReporter;

/// Moon ID written into the scripted `identity.public`.
pub const MOON_ID: &str = "deadbeef00";

/// Scenario world shared across BDD steps.
pub struct SequenceWorld {
    dir: TempDir,
    args: Vec<String>,
    pub launcher: ScriptedLauncher,
    pub reporter: RecordingPhaseReporter,
    outcome: Option<Result<SequenceReport, InitError>>,
}

impl SequenceWorld {
    /// Builds a world rooted at a fresh temporary directory.
    #[must_use]
    pub fn new() -> Self {
        let dir = TempDir::new().expect("temp dir");
        let args = vec![
            "ztmoon".to_owned(),
            "--config-dir".to_owned(),
            dir.path().join("zerotier-one").display().to_string(),
            "--bin-dir".to_owned(),
            "/opt/zerotier".to_owned(),
        ];
        Self {
            dir,
            args,
            launcher: ScriptedLauncher::default(),
            reporter: RecordingPhaseReporter::default(),
            outcome: None,
        }
    }

    /// Appends command-line arguments.
    pub fn push_args(&mut self, args: &[&str]) {
        self.args.extend(args.iter().map(|arg| (*arg).to_owned()));
    }

    /// Layout of the config root used by the scenario.
    #[must_use]
    pub fn layout(&self) -> ConfigLayout {
        ConfigLayout::new(self.dir.path().join("zerotier-one"))
    }

    /// Queues a well-behaved daemon, identity tool, and supervised daemon.
    ///
    /// The bootstrap daemon writes `identity.public` when spawned and its
    /// PID marker on liveness check `marker_poll`.
    pub fn script_healthy_daemon(&self, marker_poll: u32) {
        let layout = self.layout();
        self.launcher.push(
            ScriptedChild::new("bootstrap")
                .alive_for(marker_poll.saturating_add(5))
                .writes_on_spawn(
                    layout.identity_public_path(),
                    format!("{MOON_ID}:0:0123abcd"),
                )
                .writes_on_poll(marker_poll, layout.pid_path())
                .exits_with(ExitState::Signal(15)),
        );
        let descriptor = json!({
            "id": MOON_ID,
            "objtype": "world",
            "roots": [
                { "identity": format!("{MOON_ID}:0:0123abcd"), "stableEndpoints": [] }
            ],
            "signingKey": "b0a1",
            "signingKey_SECRET": "c2d3",
            "updatesMustBeSignedBy": "b0a1",
            "worldType": "moon"
        });
        let text = serde_json::to_string_pretty(&descriptor).expect("render descriptor");
        self.launcher.push(
            ScriptedChild::new("initmoon").prints(text.lines().map(str::to_owned).collect::<Vec<_>>()),
        );
        self.launcher.push(
            ScriptedChild::new("genmoon").writes_on_spawn(format!("000000{MOON_ID}.moon"), "signed"),
        );
        self.launcher.push(
            ScriptedChild::new("daemon")
                .alive_for(10)
                .prints(["Starting Control Plane...", "Starting V6 Control Plane..."]),
        );
    }

    /// Validates the arguments and runs the sequence once.
    pub fn run(&mut self) {
        if self.outcome.is_some() {
            return;
        }
        let cli = Cli::try_parse_from(&self.args).expect("arguments parse");
        let outcome = Config::from_cli(cli)
            .map_err(InitError::from)
            .and_then(|config| {
                InitSequence::new(&config, &self.launcher, &ShutdownRelay::new(), &self.reporter)
                    .with_poll_interval(Duration::ZERO)
                    .run()
            });
        self.outcome = Some(outcome);
    }

    /// Outcome of the run, if it has happened.
    #[must_use]
    pub fn outcome(&self) -> Option<&Result<SequenceReport, InitError>> {
        self.outcome.as_ref()
    }

    /// Whether anything exists under the temporary directory.
    #[must_use]
    pub fn root_is_empty(&self) -> bool {
        fs::read_dir(self.dir.path())
            .expect("list temp dir")
            .next()
            .is_none()
    }
}

impl Default for SequenceWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture constructor for behaviour suites.
#[must_use]
pub fn world() -> RefCell<SequenceWorld> {
    RefCell::new(SequenceWorld::new())
}
