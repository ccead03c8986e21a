//! Command-line and environment surface for the init supervisor.
//!
//! Every option may also be supplied through a `ZEROTIER_*` environment
//! variable. A flag given on the command line always wins over the
//! environment. Empty secret and identity values are treated as absent;
//! an empty address or port is rejected like any other malformed value.
//! Network IDs may be separated by any whitespace.

use std::net::{Ipv4Addr, Ipv6Addr};

use camino::Utf8PathBuf;
use clap::Parser;

use crate::defaults::{DEFAULT_BIN_DIR, DEFAULT_CONFIG_DIR, DEFAULT_LOG_FILTER, default_log_format};
use crate::logging::{LogFormat, LogSettings};

const AFTER_LONG_HELP: &str = "\
Note: must specify at least one type of address.

Secrets and identities are usually supplied through the environment:
    ZEROTIER_API_SECRET       overwrites `authtoken.secret`; leave empty for automatic generation
    ZEROTIER_IDENTITY_PUBLIC  overwrites `identity.public`; leave empty for automatic generation
    ZEROTIER_IDENTITY_SECRET  overwrites `identity.secret`; leave empty for automatic generation
    ZEROTIER_JOIN_NETWORKS    whitespace separated network IDs joined upon initialisation";

/// Command-line interface for the moon init supervisor.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(
    name = "ztmoon",
    about = "Prepares, bootstraps, and supervises a ZeroTier moon",
    after_long_help = AFTER_LONG_HELP
)]
pub struct Cli {
    /// Public IPv4 address advertised as a stable endpoint.
    #[arg(short = '4', long, env = "ZEROTIER_IPV4", value_name = "IPV4_ADDRESS")]
    pub ipv4: Option<Ipv4Addr>,

    /// Public IPv6 address advertised as a stable endpoint.
    #[arg(short = '6', long, env = "ZEROTIER_IPV6", value_name = "IPV6_ADDRESS")]
    pub ipv6: Option<Ipv6Addr>,

    /// UDP port the daemon listens on.
    #[arg(
        short,
        long,
        env = "ZEROTIER_PORT",
        value_name = "PORT_NUMBER",
        value_parser = clap::value_parser!(u16).range(1..)
    )]
    pub port: Option<u16>,

    /// API secret written to `authtoken.secret`.
    #[arg(long, env = "ZEROTIER_API_SECRET", hide_env_values = true, value_name = "SECRET")]
    pub api_secret: Option<String>,

    /// Public identity written to `identity.public`.
    #[arg(long, env = "ZEROTIER_IDENTITY_PUBLIC", value_name = "IDENTITY")]
    pub identity_public: Option<String>,

    /// Secret identity written to `identity.secret`.
    #[arg(
        long,
        env = "ZEROTIER_IDENTITY_SECRET",
        hide_env_values = true,
        value_name = "IDENTITY"
    )]
    pub identity_secret: Option<String>,

    /// Network IDs joined upon initialisation, separated by whitespace.
    #[arg(
        long = "join-network",
        env = "ZEROTIER_JOIN_NETWORKS",
        value_delimiter = ' ',
        value_name = "NETWORK_ID"
    )]
    pub join_networks: Vec<String>,

    /// Configuration root shared with the daemon.
    #[arg(long, env = "ZEROTIER_CONFIG_DIR", default_value = DEFAULT_CONFIG_DIR, value_name = "DIR")]
    pub config_dir: Utf8PathBuf,

    /// Directory holding `zerotier-one` and `zerotier-idtool`.
    #[arg(long, env = "ZEROTIER_BIN_DIR", default_value = DEFAULT_BIN_DIR, value_name = "DIR")]
    pub bin_dir: Utf8PathBuf,

    /// Seconds to wait for the bootstrap daemon before giving up; waits forever when unset.
    #[arg(long, env = "ZEROTIER_BOOTSTRAP_TIMEOUT", value_name = "SECONDS")]
    pub bootstrap_timeout: Option<u64>,

    /// Log filter expression.
    #[arg(long, env = "ZEROTIER_LOG_FILTER", default_value = DEFAULT_LOG_FILTER, value_name = "FILTER")]
    pub log_filter: String,

    /// Log output format.
    #[arg(long, env = "ZEROTIER_LOG_FORMAT", default_value_t = default_log_format(), value_name = "FORMAT")]
    pub log_format: LogFormat,
}

impl Cli {
    /// Log settings needed before the rest of the configuration is validated.
    #[must_use]
    pub fn log_settings(&self) -> LogSettings {
        LogSettings::new(self.log_filter.clone(), self.log_format)
    }
}
