//! Test suites for the init sequence.

pub(crate) mod support;
