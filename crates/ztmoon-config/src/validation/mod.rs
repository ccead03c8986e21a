//! Validation of the parsed command line into an immutable configuration.

use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::cli::Cli;
use crate::defaults::DEFAULT_PORT;
use crate::layout::{ConfigLayout, Executables};
use crate::logging::LogSettings;

/// Errors raised while validating the supplied configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Neither address family was configured.
    #[error("must specify either an IPv4 address or an IPv6 address, or both")]
    MissingAddress,
    /// A network ID was not a 16 digit hexadecimal string.
    #[error("'{value}' is not a valid network ID (expected 16 hexadecimal digits)")]
    InvalidNetworkId {
        /// Rejected value.
        value: String,
    },
}

/// A ZeroTier network ID: sixteen hexadecimal digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NetworkId(String);

impl NetworkId {
    const LENGTH: usize = 16;

    /// The ID as written in `networks.d/<id>.conf`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Leading characters used when logging, so full IDs stay out of the logs.
    #[must_use]
    pub fn short(&self) -> &str {
        self.0.get(..4).unwrap_or(&self.0)
    }
}

impl FromStr for NetworkId {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value.len() == Self::LENGTH && value.chars().all(|c| c.is_ascii_hexdigit()) {
            Ok(Self(value.to_owned()))
        } else {
            Err(ConfigError::InvalidNetworkId {
                value: value.to_owned(),
            })
        }
    }
}

impl fmt::Display for NetworkId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

/// Validated daemon configuration consumed by every phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapConfig {
    ipv4: Option<Ipv4Addr>,
    ipv6: Option<Ipv6Addr>,
    port: u16,
    port_defaulted: bool,
    api_secret: Option<String>,
    identity_public: Option<String>,
    identity_secret: Option<String>,
    join_networks: Vec<NetworkId>,
}

impl BootstrapConfig {
    /// Public IPv4 address, when configured.
    #[must_use]
    pub const fn ipv4(&self) -> Option<Ipv4Addr> {
        self.ipv4
    }

    /// Public IPv6 address, when configured.
    #[must_use]
    pub const fn ipv6(&self) -> Option<Ipv6Addr> {
        self.ipv6
    }

    /// Resolved UDP port.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Whether [`Self::port`] fell back to the default.
    #[must_use]
    pub const fn port_defaulted(&self) -> bool {
        self.port_defaulted
    }

    /// API secret for `authtoken.secret`.
    #[must_use]
    pub fn api_secret(&self) -> Option<&str> {
        self.api_secret.as_deref()
    }

    /// Contents for `identity.public`.
    #[must_use]
    pub fn identity_public(&self) -> Option<&str> {
        self.identity_public.as_deref()
    }

    /// Contents for `identity.secret`.
    #[must_use]
    pub fn identity_secret(&self) -> Option<&str> {
        self.identity_secret.as_deref()
    }

    /// Networks to join, in the order given and without duplicates.
    #[must_use]
    pub fn join_networks(&self) -> &[NetworkId] {
        &self.join_networks
    }

    /// `address/port` strings advertised for every moon root, IPv4 first.
    #[must_use]
    pub fn stable_endpoints(&self) -> Vec<String> {
        let port = self.port;
        let mut endpoints = Vec::with_capacity(2);
        if let Some(ipv4) = self.ipv4 {
            endpoints.push(format!("{ipv4}/{port}"));
        }
        if let Some(ipv6) = self.ipv6 {
            endpoints.push(format!("{ipv6}/{port}"));
        }
        endpoints
    }
}

/// Fully resolved configuration for one run of the init supervisor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    bootstrap: BootstrapConfig,
    layout: ConfigLayout,
    executables: Executables,
    bootstrap_timeout: Option<Duration>,
    log: LogSettings,
}

impl Config {
    /// Validates the parsed command line.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when no address is configured or a network
    /// ID is malformed.
    pub fn from_cli(cli: Cli) -> Result<Self, ConfigError> {
        if cli.ipv4.is_none() && cli.ipv6.is_none() {
            return Err(ConfigError::MissingAddress);
        }
        let join_networks = parse_networks(&cli.join_networks)?;
        let bootstrap = BootstrapConfig {
            ipv4: cli.ipv4,
            ipv6: cli.ipv6,
            port: cli.port.unwrap_or(DEFAULT_PORT),
            port_defaulted: cli.port.is_none(),
            api_secret: non_empty(cli.api_secret),
            identity_public: non_empty(cli.identity_public),
            identity_secret: non_empty(cli.identity_secret),
            join_networks,
        };
        Ok(Self {
            bootstrap,
            layout: ConfigLayout::new(cli.config_dir.into_std_path_buf()),
            executables: Executables::in_dir(cli.bin_dir.as_std_path()),
            bootstrap_timeout: cli.bootstrap_timeout.map(Duration::from_secs),
            log: LogSettings::new(cli.log_filter, cli.log_format),
        })
    }

    /// Daemon settings.
    #[must_use]
    pub const fn bootstrap(&self) -> &BootstrapConfig {
        &self.bootstrap
    }

    /// Artifact layout under the configuration root.
    #[must_use]
    pub const fn layout(&self) -> &ConfigLayout {
        &self.layout
    }

    /// External executables.
    #[must_use]
    pub const fn executables(&self) -> &Executables {
        &self.executables
    }

    /// Deadline for the bootstrap daemon to produce its marker, if any.
    #[must_use]
    pub const fn bootstrap_timeout(&self) -> Option<Duration> {
        self.bootstrap_timeout
    }

    /// Log settings.
    #[must_use]
    pub const fn log(&self) -> &LogSettings {
        &self.log
    }
}

fn parse_networks(values: &[String]) -> Result<Vec<NetworkId>, ConfigError> {
    let mut networks: Vec<NetworkId> = Vec::with_capacity(values.len());
    for token in values.iter().flat_map(|value| value.split_whitespace()) {
        let network = token.parse::<NetworkId>()?;
        if !networks.contains(&network) {
            networks.push(network);
        }
    }
    Ok(networks)
}

/// Empty values mean "let the daemon generate it".
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.is_empty())
}
