//! Server bootstrap orchestration.

use std::fmt;
use std::sync::Arc;

use ortho_config::{OrthoConfig, OrthoError};
use thiserror::Error;

use fusion_mcp_config::Config;

use crate::dispatch::DispatchTable;
use crate::health::HealthReporter;
use crate::server::{Server, ServerError, ServerHandle, ServerOptions};
use crate::telemetry::{self, TelemetryError, TelemetryHandle};

/// Trait abstracting configuration loading for testability.
pub trait ConfigLoader: Send + Sync {
    /// Loads the relay configuration.
    ///
    /// # Errors
    ///
    /// Returns the layered loader's error when a source is malformed.
    fn load(&self) -> Result<Config, Arc<OrthoError>>;
}

/// Loader that delegates to [`Config::load`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load()
    }
}

/// Loader that hands back a fixed configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    /// Wraps `config`.
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(self.config.clone())
    }
}

/// Errors surfaced during bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
}

/// Result of a successful bootstrap invocation.
pub struct Daemon {
    config: Config,
    telemetry: TelemetryHandle,
    reporter: Arc<dyn HealthReporter>,
}

impl fmt::Debug for Daemon {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Daemon")
            .field("config", &self.config)
            .field("telemetry", &self.telemetry)
            .finish_non_exhaustive()
    }
}

impl Daemon {
    /// Accessor for the resolved configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Accessor for the telemetry handle, primarily useful for testing.
    #[must_use]
    pub const fn telemetry(&self) -> TelemetryHandle {
        self.telemetry
    }

    /// Starts the relay server on the configured address.
    ///
    /// # Errors
    ///
    /// Returns a [`ServerError`] when the listener cannot bind.
    pub fn start_server(&self, table: DispatchTable) -> Result<ServerHandle, ServerError> {
        match Server::new(ServerOptions::from_config(&self.config), table).start() {
            Ok(handle) => {
                self.reporter.server_listening(handle.local_addr());
                Ok(handle)
            }
            Err(error) => {
                self.reporter.server_failed(&error);
                Err(error)
            }
        }
    }

    /// Stops a server started by [`Self::start_server`].
    ///
    /// Stopping an already stopped server is a no-op and is not reported again.
    ///
    /// # Errors
    ///
    /// Returns a [`ServerError`] when the listener does not stop cleanly.
    pub fn stop_server(&self, handle: &ServerHandle) -> Result<(), ServerError> {
        let already_stopped = handle.is_stopped();
        handle.stop()?;
        if !already_stopped {
            self.reporter.server_stopped(handle.local_addr());
        }
        Ok(())
    }
}

/// Bootstraps the relay using the supplied collaborators.
///
/// # Errors
///
/// Returns a [`BootstrapError`] when configuration or telemetry setup fails.
/// The reporter is told about the failure before it is returned.
pub fn bootstrap_with(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
) -> Result<Daemon, BootstrapError> {
    reporter.bootstrap_starting();

    let config = match loader.load() {
        Ok(config) => config,
        Err(source) => {
            let error = BootstrapError::Configuration { source };
            reporter.bootstrap_failed(&error);
            return Err(error);
        }
    };

    let telemetry = match telemetry::initialise(&config) {
        Ok(handle) => handle,
        Err(source) => {
            let error = BootstrapError::Telemetry { source };
            reporter.bootstrap_failed(&error);
            return Err(error);
        }
    };

    reporter.bootstrap_succeeded(&config);
    Ok(Daemon {
        config,
        telemetry,
        reporter,
    })
}
