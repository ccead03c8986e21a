//! Container entrypoint for the ZeroTier moon init supervisor.
//!
//! The binary delegates to [`ztmoon::run`], which validates the command line
//! and environment, prepares the config root, bootstraps the moon, and then
//! supervises `zerotier-one` in the foreground.

use std::io;
use std::process::ExitCode;

fn main() -> ExitCode {
    // Unlocked: the signal relay thread logs to stderr during the run.
    ztmoon::run(std::env::args_os(), &mut io::stderr())
}
