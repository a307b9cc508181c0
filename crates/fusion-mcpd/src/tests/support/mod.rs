//! Test harness utilities for the relay behavioural suites.

mod client;
mod config_loader;
mod reporter;
mod world;

pub use client::TestClient;
pub use config_loader::{FailingConfigLoader, TestConfigLoader};
pub use reporter::{HealthEvent, RecordingHealthReporter};
pub use world::{TestWorld, world};
