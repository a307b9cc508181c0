//! Test suites for the relay server.

mod support;
