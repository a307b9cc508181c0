//! Test configuration loaders for scenarios covering success and failure paths.

use std::ffi::OsString;
use std::sync::Arc;

use ortho_config::{OrthoConfig, OrthoError};

use fusion_mcp_config::{Config, LogFormat};

use crate::bootstrap::ConfigLoader;

/// Loader that binds the loopback interface on an OS-assigned port.
#[derive(Debug, Clone, Default)]
pub struct TestConfigLoader {
    read_timeout_secs: u64,
}

impl TestConfigLoader {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loader whose connections time out after `secs` idle seconds.
    #[must_use]
    pub const fn with_read_timeout(secs: u64) -> Self {
        Self {
            read_timeout_secs: secs,
        }
    }
}

impl ConfigLoader for TestConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(Config {
            host: "127.0.0.1".to_owned(),
            port: 0,
            log_filter: "warn".to_owned(),
            log_format: LogFormat::Compact,
            read_timeout_secs: self.read_timeout_secs,
            ..Config::default()
        })
    }
}

/// Loader that intentionally fails by passing an out-of-range port.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingConfigLoader;

impl ConfigLoader for FailingConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        let args = vec![
            OsString::from("fusion-mcpd"),
            OsString::from("--port"),
            OsString::from("70000"),
        ];
        Config::load_from_iter(args)
    }
}
