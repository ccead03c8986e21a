//! Defines the unified error surface for the init sequence.
//!
//! Failures of external tools carry the tool's captured output in the error
//! value itself, so the top-level handler can print it without knowing
//! anything about subprocess plumbing.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use nix::errno::Errno;
use thiserror::Error;

use ztmoon_config::ConfigError;

use crate::moon::MoonDocumentError;
use crate::process::ExitState;
use crate::telemetry::TelemetryError;

/// Errors surfaced while preparing, bootstrapping, or supervising the daemon.
#[derive(Debug, Error)]
pub enum InitError {
    /// The supplied configuration failed validation.
    #[error("invalid configuration: {source}")]
    Config {
        /// Underlying validation error.
        #[from]
        source: ConfigError,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[from]
        source: TelemetryError,
    },
    /// A directory could not be created or listed.
    #[error("failed to prepare directory '{path}': {source}")]
    Directory {
        /// Directory path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Writing a configuration artifact failed.
    #[error("failed to write '{path}': {source}")]
    Write {
        /// Artifact path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// A stale PID marker could not be removed.
    #[error("failed to remove stale marker '{path}': {source}")]
    Cleanup {
        /// Marker path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// An executable could not be started.
    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        /// Executable path.
        program: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Querying, reading from, or waiting for a child failed.
    #[error("failed to monitor '{program}': {source}")]
    Monitor {
        /// Executable path.
        program: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Sending SIGTERM to a child failed.
    #[error("failed to signal '{program}' (pid {pid}): {source}")]
    Signal {
        /// Executable path.
        program: PathBuf,
        /// Target PID.
        pid: u32,
        /// Underlying OS error.
        #[source]
        source: Errno,
    },
    /// The bootstrap daemon exited before writing its PID marker.
    #[error("'{program}' terminated prematurely ({status})")]
    PrematureExit {
        /// Executable path.
        program: PathBuf,
        /// How the daemon exited.
        status: ExitState,
        /// Output captured from the daemon.
        console_log: Vec<String>,
    },
    /// The bootstrap daemon kept running without writing its PID marker.
    #[error("'{program}' did not write '{marker}' within {timeout:?}")]
    BootstrapTimeout {
        /// Executable path.
        program: PathBuf,
        /// Marker that never appeared.
        marker: PathBuf,
        /// Configured deadline.
        timeout: Duration,
    },
    /// The identity tool exited unsuccessfully.
    #[error("'{program} {subcommand}' failed ({status})")]
    ToolFailed {
        /// Executable path.
        program: PathBuf,
        /// Tool subcommand.
        subcommand: &'static str,
        /// How the tool exited.
        status: ExitState,
        /// Output captured from the tool.
        console_log: Vec<String>,
    },
    /// `initmoon` printed something other than a moon descriptor.
    #[error("'{program} initmoon' produced a malformed moon descriptor: {source}")]
    MalformedDescriptor {
        /// Executable path.
        program: PathBuf,
        /// What was wrong with the document.
        #[source]
        source: MoonDocumentError,
        /// Output captured from the tool.
        console_log: Vec<String>,
    },
    /// `genmoon` succeeded but left no shard behind.
    #[error("'{program} genmoon' produced no moon shards in '{dir}'")]
    NoMoonShards {
        /// Executable path.
        program: PathBuf,
        /// Directory that should hold the shards.
        dir: PathBuf,
        /// Output captured from the tool.
        console_log: Vec<String>,
    },
    /// Serialising the moon descriptor failed.
    #[error("failed to serialise moon descriptor: {source}")]
    Serialise {
        /// Underlying serialisation error.
        #[from]
        source: serde_json::Error,
    },
    /// The public identity could not be read.
    #[error("failed to read identity '{path}': {source}")]
    ReadIdentity {
        /// Identity path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The public identity did not start with an address.
    #[error("identity '{path}' does not start with a moon ID")]
    MalformedIdentity {
        /// Identity path.
        path: PathBuf,
    },
    /// Installing signal handlers failed.
    #[error("failed to install signal handlers: {source}")]
    Signals {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// A termination signal arrived before the daemon was supervised.
    #[error("interrupted by signal {signal}")]
    Interrupted {
        /// Signal number.
        signal: i32,
    },
}

impl InitError {
    /// Output captured from the failed subprocess, if the error carries any.
    #[must_use]
    pub fn console_log(&self) -> Option<&[String]> {
        match self {
            Self::PrematureExit { console_log, .. }
            | Self::ToolFailed { console_log, .. }
            | Self::MalformedDescriptor { console_log, .. }
            | Self::NoMoonShards { console_log, .. } => Some(console_log),
            _ => None,
        }
    }
}
