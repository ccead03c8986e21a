//! Configuration surface for the ZeroTier moon init supervisor.
//!
//! The crate owns the command-line and environment parsing, validation into
//! an immutable [`Config`], and the on-disk [`ConfigLayout`] shared by every
//! phase of the init sequence. Nothing here touches the filesystem or spawns
//! processes; the `ztmoon` crate consumes the resolved values.

mod cli;
pub mod defaults;
mod layout;
mod logging;
mod validation;

pub use cli::Cli;
pub use defaults::{
    BOOTSTRAP_POLL_INTERVAL, DEFAULT_BIN_DIR, DEFAULT_CONFIG_DIR, DEFAULT_LOG_FILTER, DEFAULT_PORT,
};
pub use layout::{ConfigLayout, Executables};
pub use logging::{LogFormat, LogFormatParseError, LogSettings};
pub use validation::{BootstrapConfig, Config, ConfigError, NetworkId};
