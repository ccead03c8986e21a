use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use ztmoon_config::{BootstrapConfig, ConfigLayout, Executables};

use super::document::MoonDocument;
use crate::errors::InitError;
use crate::process::{Invocation, Launcher, ShutdownRelay, run_to_completion};
use crate::reporter::PhaseReporter;
use crate::writer::{ConfigArtifact, ConfigWriter, PUBLIC_MODE, ensure_dir};

const INITMOON: &str = "initmoon";
const GENMOON: &str = "genmoon";
const SHARD_EXTENSION: &str = "moon";

/// Outcome of a successful synthesis.
#[derive(Debug, Clone, PartialEq)]
pub struct MoonReport {
    /// The descriptor as persisted.
    pub document: MoonDocument,
    /// Endpoint strings added across all roots.
    pub endpoints_added: usize,
    /// Shard files found in `moons.d/` after `genmoon`, sorted.
    pub shards: Vec<PathBuf>,
}

/// Produces the moon descriptor and its signed shards.
#[derive(Debug, Clone, Copy)]
pub struct MoonSynthesizer<'a> {
    layout: &'a ConfigLayout,
    executables: &'a Executables,
    writer: ConfigWriter,
}

impl<'a> MoonSynthesizer<'a> {
    /// Uses the identity tool from `executables` against `layout`.
    #[must_use]
    pub const fn new(layout: &'a ConfigLayout, executables: &'a Executables) -> Self {
        Self {
            layout,
            executables,
            writer: ConfigWriter,
        }
    }

    /// Runs `initmoon`, injects the stable endpoints, persists the
    /// descriptor, and runs `genmoon` inside `moons.d/`.
    ///
    /// # Errors
    ///
    /// Returns [`InitError::ToolFailed`] on a non-zero tool exit,
    /// [`InitError::MalformedDescriptor`] when `initmoon` output is not a
    /// usable descriptor, [`InitError::NoMoonShards`] when `genmoon` leaves
    /// nothing behind, and IO errors from persisting the descriptor.
    pub fn run<L: Launcher>(
        &self,
        launcher: &L,
        relay: &ShutdownRelay,
        config: &BootstrapConfig,
        reporter: &dyn PhaseReporter,
    ) -> Result<MoonReport, InitError> {
        let program = self.executables.idtool();
        let identity = self.layout.identity_public_path();
        let init = Invocation::new(program).arg(INITMOON).arg(identity);
        let console_log = run_to_completion(launcher, relay, &init, INITMOON)?;

        let mut document = match MoonDocument::parse(&console_log.join("\n")) {
            Ok(document) => document,
            Err(source) => {
                return Err(InitError::MalformedDescriptor {
                    program: program.to_path_buf(),
                    source,
                    console_log,
                });
            }
        };
        let endpoints_added = document.append_stable_endpoints(&config.stable_endpoints());

        let descriptor = self.writer.write(&ConfigArtifact::new(
            self.layout.config_dir(),
            ConfigLayout::MOON_DESCRIPTOR_FILE,
            PUBLIC_MODE,
            document.to_json_pretty()?,
        ))?;
        reporter.moon_descriptor_written(&descriptor, document.root_count(), endpoints_added);

        let moons_dir = self.layout.moons_dir();
        ensure_dir(moons_dir)?;
        let generate = Invocation::new(program)
            .arg(GENMOON)
            .arg(&descriptor)
            .current_dir(moons_dir);
        let genmoon_log = run_to_completion(launcher, relay, &generate, GENMOON)?;

        let shards = list_shards(moons_dir)?;
        if shards.is_empty() {
            return Err(InitError::NoMoonShards {
                program: program.to_path_buf(),
                dir: moons_dir.to_path_buf(),
                console_log: genmoon_log,
            });
        }
        reporter.moon_shards_generated(&shards);

        Ok(MoonReport {
            document,
            endpoints_added,
            shards,
        })
    }
}

fn list_shards(dir: &Path) -> Result<Vec<PathBuf>, InitError> {
    let to_error = |source: io::Error| InitError::Directory {
        path: dir.to_path_buf(),
        source,
    };
    let mut shards = Vec::new();
    for entry in fs::read_dir(dir).map_err(to_error)? {
        let path = entry.map_err(to_error)?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == SHARD_EXTENSION) {
            shards.push(path);
        }
    }
    shards.sort();
    Ok(shards)
}
