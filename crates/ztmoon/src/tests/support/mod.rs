//! Test doubles shared by the init sequence suites.

mod child;
mod reporter;
mod world;

pub use child::{ChildCall, ScriptedChild, ScriptedLauncher};
pub use reporter::{RecordingPhaseReporter, ReporterEvent};
pub use world::{MOON_ID, SequenceWorld, world};
