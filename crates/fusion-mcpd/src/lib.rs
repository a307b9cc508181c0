//! TCP relay between AI-assistant clients and a CAD host application.
//!
//! Clients connect over TCP and exchange newline-delimited JSON messages (see
//! [`fusion_mcp_protocol`]). Every message names its `type`; the server looks
//! the type up in a [`DispatchTable`] and writes back exactly one reply per
//! message, in order. The table is assembled before the server starts, which
//! keeps routing free of global state: embedders register handlers backed by
//! their own [`HostBridge`] and [`TextGenerator`], while the standalone
//! `fusion-mcpd` binary uses [`default_dispatch_table`].
//!
//! Each accepted connection is served on its own thread. A malformed frame,
//! an unknown type, or a failing handler produces an error reply and leaves
//! the connection open. A panicking handler is contained the same way, so
//! one bad request never takes down other clients.
//!
//! ```no_run
//! use fusion_mcp_config::ServerAddress;
//! use fusion_mcpd::{Server, ServerOptions, default_dispatch_table};
//!
//! let options = ServerOptions::new(ServerAddress::new("127.0.0.1", 0));
//! let handle = Server::new(options, default_dispatch_table()).start()?;
//! println!("listening on {}", handle.local_addr());
//! handle.stop()?;
//! # Ok::<(), fusion_mcpd::ServerError>(())
//! ```

mod bootstrap;
mod bridge;
mod dispatch;
mod health;
mod process;
mod server;
mod telemetry;
mod transport;

pub use bootstrap::{
    BootstrapError, ConfigLoader, Daemon, StaticConfigLoader, SystemConfigLoader, bootstrap_with,
};
pub use bridge::{
    BridgeError, HostBridge, StubHostBridge, TextGenerator, UnconfiguredGenerator,
    register_host_bridge, register_text_generator,
};
pub use dispatch::{DispatchError, DispatchTable, HandlerError, MessageHandler, Route};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use process::{
    LaunchError, ShutdownError, ShutdownSignal, SystemShutdownSignal, default_dispatch_table,
    run_daemon,
};
pub use server::{Server, ServerError, ServerHandle, ServerOptions};
pub use telemetry::{TelemetryError, TelemetryHandle};
pub use transport::ListenerError;

#[cfg(test)]
mod tests;
