//! Supervises relay launch sequencing and runtime orchestration.

use std::sync::Arc;

use tracing::info;

use crate::StructuredHealthReporter;
use crate::bootstrap::{ConfigLoader, SystemConfigLoader, bootstrap_with};
use crate::bridge::{
    StubHostBridge, UnconfiguredGenerator, register_host_bridge, register_text_generator,
};
use crate::dispatch::DispatchTable;
use crate::health::HealthReporter;

use super::PROCESS_TARGET;
use super::errors::LaunchError;
use super::shutdown::{ShutdownSignal, SystemShutdownSignal};

/// Collaborators required to launch the relay runtime.
pub(crate) struct LaunchPlan<L, S> {
    pub(crate) loader: L,
    pub(crate) reporter: Arc<dyn HealthReporter>,
    pub(crate) shutdown: S,
    pub(crate) table: DispatchTable,
}

/// Dispatch table used by the standalone server.
///
/// Commands are acknowledged by [`StubHostBridge`] and `llm_request` replies
/// explain that no generator is configured.
#[must_use]
pub fn default_dispatch_table() -> DispatchTable {
    let mut table = DispatchTable::new();
    register_host_bridge(&mut table, Arc::new(StubHostBridge::new()));
    register_text_generator(&mut table, Arc::new(UnconfiguredGenerator));
    table
}

/// Runs the relay using the production collaborators.
///
/// Blocks until a termination signal arrives, then stops the server.
///
/// # Errors
///
/// Returns a [`LaunchError`] when configuration, telemetry, binding, or
/// signal handling fails.
pub fn run_daemon() -> Result<(), LaunchError> {
    run_daemon_with(LaunchPlan {
        loader: SystemConfigLoader,
        reporter: Arc::new(StructuredHealthReporter::new()),
        shutdown: SystemShutdownSignal::new(),
        table: default_dispatch_table(),
    })
}

/// Runs the relay with injected collaborators.
pub(crate) fn run_daemon_with<L, S>(plan: LaunchPlan<L, S>) -> Result<(), LaunchError>
where
    L: ConfigLoader,
    S: ShutdownSignal,
{
    let LaunchPlan {
        loader,
        reporter,
        shutdown,
        table,
    } = plan;

    let daemon = bootstrap_with(&loader, reporter)?;
    info!(
        target: PROCESS_TARGET,
        address = %daemon.config().address(),
        "starting relay runtime"
    );
    let server = daemon.start_server(table)?;
    let waited = shutdown.wait();
    // Stop even when the signal source failed so the port is released.
    daemon.stop_server(&server)?;
    waited?;
    info!(
        target: PROCESS_TARGET,
        "shutdown sequence completed"
    );
    Ok(())
}
