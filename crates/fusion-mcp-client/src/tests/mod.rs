//! Test suites for the relay client and CLI.

mod behaviour;
pub(crate) mod support;
