use crate::address::ServerAddress;
use crate::logging::LogFormat;

/// Interface the relay binds to when none is configured.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Port the relay binds to when none is configured.
pub const DEFAULT_PORT: u16 = 8080;

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Seconds an idle connection may block in `read` before it is closed.
pub const DEFAULT_READ_TIMEOUT_SECS: u64 = 300;

/// Seconds the client waits for the TCP handshake.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;

/// Owned default host, for serde and the configuration derive.
pub fn default_host() -> String {
    DEFAULT_HOST.to_owned()
}

/// Default port.
pub const fn default_port() -> u16 {
    DEFAULT_PORT
}

/// Default log filter expression used by the binaries.
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the binaries.
pub fn default_log_format() -> LogFormat {
    LogFormat::Json
}

/// Default per-connection read timeout in seconds.
pub const fn default_read_timeout_secs() -> u64 {
    DEFAULT_READ_TIMEOUT_SECS
}

/// Default client connect timeout in seconds.
pub const fn default_connect_timeout_secs() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_SECS
}

/// Computes the default relay address (`tcp://127.0.0.1:8080`).
pub fn default_server_address() -> ServerAddress {
    ServerAddress::new(DEFAULT_HOST, DEFAULT_PORT)
}
