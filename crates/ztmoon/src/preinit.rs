//! Materialises the operator-supplied configuration before the first daemon run.

use std::path::PathBuf;

use ztmoon_config::{BootstrapConfig, ConfigLayout};

use crate::errors::InitError;
use crate::reporter::PhaseReporter;
use crate::writer::{ConfigArtifact, ConfigWriter, PRIVATE_MODE, PUBLIC_MODE};

/// Writes the port file, optional secrets and identities, and network joins.
#[derive(Debug, Clone, Copy)]
pub struct PreinitPhase<'a> {
    layout: &'a ConfigLayout,
    writer: ConfigWriter,
}

impl<'a> PreinitPhase<'a> {
    /// Targets the config root described by `layout`.
    #[must_use]
    pub const fn new(layout: &'a ConfigLayout) -> Self {
        Self {
            layout,
            writer: ConfigWriter,
        }
    }

    /// Writes every artifact derivable from `config`, returning their paths.
    ///
    /// Optional values that were not supplied are skipped with a notice so the
    /// daemon generates them itself.
    ///
    /// # Errors
    ///
    /// Returns the first write failure.
    pub fn run(
        &self,
        config: &BootstrapConfig,
        reporter: &dyn PhaseReporter,
    ) -> Result<Vec<PathBuf>, InitError> {
        let root = self.layout.config_dir();
        let mut written = Vec::new();

        written.push(self.write(
            &ConfigArtifact::new(
                root,
                ConfigLayout::PORT_FILE,
                PRIVATE_MODE,
                config.port().to_string(),
            ),
            reporter,
        )?);

        let optional = [
            (
                config.api_secret(),
                ConfigLayout::AUTHTOKEN_FILE,
                PRIVATE_MODE,
                "API secret",
            ),
            (
                config.identity_public(),
                ConfigLayout::IDENTITY_PUBLIC_FILE,
                PUBLIC_MODE,
                "public key",
            ),
            (
                config.identity_secret(),
                ConfigLayout::IDENTITY_SECRET_FILE,
                PRIVATE_MODE,
                "private key",
            ),
        ];
        for (value, file_name, mode, label) in optional {
            match value {
                Some(content) => written.push(self.write(
                    &ConfigArtifact::new(root, file_name, mode, content),
                    reporter,
                )?),
                None => reporter.artifact_skipped(label),
            }
        }

        if config.join_networks().is_empty() {
            reporter.artifact_skipped("networks to join");
        }
        for network in config.join_networks() {
            reporter.network_configured(network);
            written.push(self.write(
                &ConfigArtifact::new(
                    self.layout.networks_dir(),
                    format!("{network}.conf"),
                    PUBLIC_MODE,
                    Vec::new(),
                ),
                reporter,
            )?);
        }

        Ok(written)
    }

    fn write(
        &self,
        artifact: &ConfigArtifact,
        reporter: &dyn PhaseReporter,
    ) -> Result<PathBuf, InitError> {
        let path = self.writer.write(artifact)?;
        reporter.artifact_written(&path);
        Ok(path)
    }
}
