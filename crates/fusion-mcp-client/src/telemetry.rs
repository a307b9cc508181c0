//! Diagnostic logging for the CLI.

use std::io;

use once_cell::sync::OnceCell;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;

use fusion_mcp_config::Config;

use crate::errors::AppError;

static INSTALLED: OnceCell<()> = OnceCell::new();

/// Installs a compact stderr subscriber filtered by the configured directive.
///
/// Later calls are no-ops.
pub(crate) fn install(config: &Config) -> Result<(), AppError> {
    INSTALLED
        .get_or_try_init(|| {
            let filter = EnvFilter::try_new(config.log_filter())
                .map_err(|error| AppError::Telemetry(error.to_string()))?;
            fmt()
                .with_env_filter(filter)
                .with_writer(io::stderr)
                .with_target(false)
                .compact()
                .try_init()
                .map_err(|error| AppError::Telemetry(error.to_string()))
        })
        .map(|_| ())
}
