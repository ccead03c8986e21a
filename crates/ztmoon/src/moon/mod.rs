//! Moon descriptor synthesis.
//!
//! `zerotier-idtool initmoon` prints a descriptor whose roots carry empty
//! `stableEndpoints` lists. The synthesizer appends the configured
//! `address/port` endpoints to every root, persists the result as
//! `moon.json`, and asks `zerotier-idtool genmoon` to sign it into
//! `moons.d/`.

mod document;
mod synth;

pub use document::{MoonDocument, MoonDocumentError};
pub use synth::{MoonReport, MoonSynthesizer};
