//! Shared configuration for the Fusion MCP relay server and client.
//!
//! Values are layered by [`ortho_config`]: built-in defaults, then a TOML file
//! named with `--config-path` (or `FUSION_MCP_CONFIG_PATH`), then
//! `FUSION_MCP_*` environment variables, then command-line flags. Both
//! binaries load the same [`Config`] so a client and the server it talks to
//! agree on the address without extra wiring.

mod address;
mod defaults;
mod logging;

use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use address::{AddressParseError, ServerAddress};
pub use defaults::{
    DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_HOST, DEFAULT_LOG_FILTER, DEFAULT_PORT,
    DEFAULT_READ_TIMEOUT_SECS, default_connect_timeout_secs, default_host, default_log_filter,
    default_log_filter_string, default_log_format, default_port, default_read_timeout_secs,
    default_server_address,
};
pub use logging::{LogFormat, LogFormatParseError};

/// Resolved relay configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "FUSION_MCP")]
pub struct Config {
    /// Interface to bind (server) or connect to (client).
    #[serde(default = "default_host")]
    #[ortho_config(default = default_host())]
    pub host: String,
    /// TCP port to bind or connect to.
    #[serde(default = "default_port")]
    #[ortho_config(default = default_port())]
    pub port: u16,
    /// `tracing` filter directive, for example `info` or `fusion_mcpd=debug`.
    #[serde(default = "default_log_filter_string")]
    #[ortho_config(default = default_log_filter_string())]
    pub log_filter: String,
    /// Log output format.
    #[serde(default = "default_log_format")]
    #[ortho_config(default = default_log_format())]
    pub log_format: LogFormat,
    /// Seconds a connection may sit idle in `read`; `0` waits forever.
    #[serde(default = "default_read_timeout_secs")]
    #[ortho_config(default = default_read_timeout_secs())]
    pub read_timeout_secs: u64,
    /// Seconds the client waits when opening a connection.
    #[serde(default = "default_connect_timeout_secs")]
    #[ortho_config(default = default_connect_timeout_secs())]
    pub connect_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
            read_timeout_secs: default_read_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl Config {
    /// Address the server binds and the client dials.
    #[must_use]
    pub fn address(&self) -> ServerAddress {
        ServerAddress::new(self.host.clone(), self.port)
    }

    /// Log filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Per-connection read timeout, or `None` when disabled.
    #[must_use]
    pub const fn read_timeout(&self) -> Option<Duration> {
        if self.read_timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.read_timeout_secs))
        }
    }

    /// Client connect timeout. A zero value falls back to the default.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        if self.connect_timeout_secs == 0 {
            Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS)
        } else {
            Duration::from_secs(self.connect_timeout_secs)
        }
    }
}
