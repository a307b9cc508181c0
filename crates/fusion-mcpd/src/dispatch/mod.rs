//! Message routing for relay connections.
//!
//! A [`DispatchTable`] maps message types to [`MessageHandler`]s. The
//! connection handler in this module decodes frames from each socket, looks
//! up the handler for every message, and writes the reply. The table is built
//! once, before the listener starts, and shared by all connections.

mod errors;
mod handler;
mod response;
mod table;

pub use errors::{DispatchError, HandlerError};
pub(crate) use handler::DispatchConnectionHandler;
pub use table::{DispatchTable, MessageHandler, Route};

const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");
