//! Relay server lifecycle.
//!
//! [`Server`] binds the configured address and serves every accepted
//! connection on its own thread using the supplied [`DispatchTable`].
//! [`ServerHandle`] reports the bound address and stops the server; stopping
//! twice is harmless and dropping the handle stops it too.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::info;

use fusion_mcp_config::{Config, ServerAddress};

use crate::dispatch::{DispatchConnectionHandler, DispatchTable};
use crate::transport::{ConnectionOptions, ListenerError, ListenerHandle, SocketListener};

const SERVER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::server");

/// Errors raised while starting or stopping the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listener could not be bound or started.
    #[error("failed to start listener: {0}")]
    Start(#[source] ListenerError),
    /// The listener did not shut down cleanly.
    #[error("failed to stop listener: {0}")]
    Stop(#[source] ListenerError),
}

/// Settings the server needs from the wider configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerOptions {
    /// Address to bind. Port `0` asks the OS for a free port.
    pub address: ServerAddress,
    /// Idle read timeout per connection; `None` disables it.
    pub read_timeout: Option<Duration>,
}

impl ServerOptions {
    /// Options for `address` with no read timeout.
    #[must_use]
    pub const fn new(address: ServerAddress) -> Self {
        Self {
            address,
            read_timeout: None,
        }
    }

    /// Extracts server settings from a loaded configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            address: config.address(),
            read_timeout: config.read_timeout(),
        }
    }
}

/// Relay server ready to start.
#[derive(Debug)]
pub struct Server {
    options: ServerOptions,
    table: Arc<DispatchTable>,
}

impl Server {
    /// Prepares a server that will answer messages using `table`.
    #[must_use]
    pub fn new(options: ServerOptions, table: DispatchTable) -> Self {
        Self {
            options,
            table: Arc::new(table),
        }
    }

    /// Binds the listener and starts accepting connections.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Start`] when the address cannot be resolved or
    /// bound, for example because the port is already in use.
    pub fn start(self) -> Result<ServerHandle, ServerError> {
        let listener = SocketListener::bind(&self.options.address).map_err(ServerError::Start)?;
        let local_addr = listener.local_addr();
        let handler = Arc::new(DispatchConnectionHandler::new(Arc::clone(&self.table)));
        let options = ConnectionOptions {
            read_timeout: self.options.read_timeout,
        };
        let listener = listener.start(handler, options).map_err(ServerError::Start)?;

        info!(
            target: SERVER_TARGET,
            address = %local_addr,
            message_types = ?self.table.message_types(),
            "relay server listening"
        );
        Ok(ServerHandle { listener })
    }
}

/// Handle to a running server.
#[derive(Debug)]
pub struct ServerHandle {
    listener: ListenerHandle,
}

impl ServerHandle {
    /// Address the server is bound to, including an OS-assigned port.
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.listener.local_addr()
    }

    /// Number of connections currently being served.
    #[must_use]
    pub fn active_connections(&self) -> usize {
        self.listener.active_connections()
    }

    /// Returns `true` once [`Self::stop`] has been called.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.listener.is_stopped()
    }

    /// Stops accepting connections and closes every open connection.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Stop`] when the accept thread panicked.
    pub fn stop(&self) -> Result<(), ServerError> {
        let already_stopped = self.listener.is_stopped();
        self.listener.stop().map_err(ServerError::Stop)?;
        if !already_stopped {
            info!(
                target: SERVER_TARGET,
                address = %self.local_addr(),
                "relay server stopped"
            );
        }
        Ok(())
    }
}
