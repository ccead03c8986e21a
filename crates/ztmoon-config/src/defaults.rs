//! Default values shared by the command line and the init sequence.

use std::time::Duration;

/// UDP port the daemon listens on when none is configured.
pub const DEFAULT_PORT: u16 = 9993;

/// Configuration root shared by every phase of the init sequence.
pub const DEFAULT_CONFIG_DIR: &str = "/var/lib/zerotier-one";

/// Directory holding the `zerotier-one` and `zerotier-idtool` executables.
pub const DEFAULT_BIN_DIR: &str = "/usr/sbin";

/// Default log filter expression used by the binary.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Interval between readiness checks while the bootstrap daemon runs.
pub const BOOTSTRAP_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Default logging format for the binary.
#[must_use]
pub fn default_log_format() -> crate::logging::LogFormat {
    crate::logging::LogFormat::Compact
}
