//! Init supervisor for a ZeroTier moon running as a container's PID 1.
//!
//! A run walks four phases in a fixed order:
//!
//! 1. **Preinit** writes the operator-supplied port, secrets, identities, and
//!    network joins into the config root.
//! 2. **Bootstrap** starts `zerotier-one` once so it materialises its identity,
//!    waits for the PID marker, then terminates and reaps it.
//! 3. **Moon synthesis** asks `zerotier-idtool initmoon` for a descriptor,
//!    injects the configured stable endpoints into every root, and signs it
//!    with `zerotier-idtool genmoon`.
//! 4. **Supervision** runs `zerotier-one` in the foreground, forwards its
//!    output, and reaps it on every exit path.
//!
//! Every subprocess goes through the [`Launcher`] seam and every milestone
//! through the [`PhaseReporter`] observer, so the sequence can be exercised
//! without real daemons. Subprocess failures carry the captured console log
//! inside the [`InitError`] value; [`run`] prints it before exiting.

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use ztmoon_config::{Cli, Config};

mod bootstrap;
mod errors;
mod moon;
mod preinit;
mod process;
mod reporter;
mod sequence;
mod supervisor;
mod telemetry;
mod writer;

pub use bootstrap::{BootstrapPhase, BootstrapReport};
pub use errors::InitError;
pub use moon::{MoonDocument, MoonDocumentError, MoonReport, MoonSynthesizer};
pub use preinit::PreinitPhase;
pub use process::{
    ChildProcess, ExitState, Invocation, Launcher, ProcessHandle, RelayListener, ShutdownRelay,
    SystemLauncher,
};
pub use reporter::{PhaseReporter, StructuredPhaseReporter};
pub use sequence::{InitSequence, SequenceReport};
pub use supervisor::SupervisorPhase;
pub use telemetry::{TelemetryError, TelemetryHandle, initialise as initialise_telemetry};
pub use writer::{ConfigArtifact, ConfigWriter, PRIVATE_MODE, PUBLIC_MODE};

const HELP_HINT: &str = "Run with --help for the full list of options.";

/// Parses `args`, runs the init sequence with real subprocesses, and maps the
/// outcome to an exit code.
///
/// Usage and diagnostics are written to `stderr`. Bare invocation and
/// `--help` exit successfully; validation and phase failures exit with `1`
/// after the error and any captured console log have been printed.
#[must_use]
pub fn run<I, E>(args: I, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    E: Write,
{
    run_with(args, stderr, &SystemLauncher, SignalHandling::Install)
}

/// Whether [`run_with`] installs process-wide signal handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SignalHandling {
    Install,
    #[cfg_attr(not(test), expect(dead_code, reason = "only tests skip signal handlers"))]
    Skip,
}

pub(crate) fn run_with<I, E, L>(
    args: I,
    stderr: &mut E,
    launcher: &L,
    signals: SignalHandling,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    E: Write,
    L: Launcher,
{
    let args: Vec<OsString> = args.into_iter().collect();
    if args.len() <= 1 {
        let usage = Cli::command().render_usage();
        let _ = writeln!(stderr, "{usage}\n{HELP_HINT}");
        return ExitCode::SUCCESS;
    }

    let cli = match Cli::try_parse_from(&args) {
        Ok(cli) => cli,
        Err(error) => {
            let _ = write!(stderr, "{}", error.render());
            return match error.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::FAILURE,
            };
        }
    };

    let reporter = StructuredPhaseReporter::new();
    match start(cli, launcher, signals, &reporter) {
        // The reporter has already logged the daemon exit status.
        Ok(_) => ExitCode::SUCCESS,
        Err(error) => {
            reporter.sequence_failed(&error);
            write_failure(stderr, &error);
            ExitCode::FAILURE
        }
    }
}

fn start<L: Launcher>(
    cli: Cli,
    launcher: &L,
    signals: SignalHandling,
    reporter: &dyn PhaseReporter,
) -> Result<SequenceReport, InitError> {
    let _telemetry = telemetry::initialise(&cli.log_settings())?;
    let config = Config::from_cli(cli)?;

    let relay = ShutdownRelay::new();
    let _listener = match signals {
        SignalHandling::Install => Some(relay.listen()?),
        SignalHandling::Skip => None,
    };
    InitSequence::new(&config, launcher, &relay, reporter).run()
}

/// Writes the error and any captured console log, one `[-]` line each.
fn write_failure<E: Write>(stderr: &mut E, error: &InitError) {
    let _ = writeln!(stderr, "[-] {error}");
    let Some(console_log) = error.console_log() else {
        return;
    };
    let _ = writeln!(stderr, "[-] Console log:");
    for line in console_log {
        let _ = writeln!(stderr, "[-] {line}");
    }
}

#[cfg(test)]
mod tests;
