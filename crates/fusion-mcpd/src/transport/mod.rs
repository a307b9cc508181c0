//! TCP listener for relay clients.
//!
//! The transport module binds the configured address, accepts connections in
//! a background thread, and hands each accepted socket to a
//! [`ConnectionHandler`] running on its own thread. Accepted sockets are
//! tracked in an [`ActiveConnections`] set so shutdown can close them.

mod connections;
mod errors;
mod handler;
mod listener;
#[cfg(test)]
mod test_utils;

pub(crate) use self::connections::{ActiveConnections, ConnectionId};
pub use self::errors::ListenerError;
pub(crate) use self::handler::{ConnectionHandler, ConnectionStream, read_with_retry};
pub(crate) use self::listener::{ConnectionOptions, ListenerHandle, SocketListener};
#[cfg(test)]
pub(crate) use self::test_utils::{CountingHandler, HoldingHandler};

const LISTENER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");
