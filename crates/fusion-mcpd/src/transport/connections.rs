//! Registry of accepted sockets.
//!
//! The accept loop registers every socket before spawning its handler thread
//! and the handler removes it on exit. Shutdown drains the registry and shuts
//! each socket down, which wakes any handler blocked in `read`.

use std::collections::HashMap;
use std::fmt;
use std::io;
use std::net::{Shutdown, TcpStream};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use super::LISTENER_TARGET;

/// Identifier assigned to each accepted connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct ConnectionId(u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "conn-{}", self.0)
    }
}

#[derive(Debug, Default)]
struct Registry {
    next_id: AtomicU64,
    sockets: Mutex<HashMap<ConnectionId, TcpStream>>,
}

/// Shared set of live connections.
#[derive(Debug, Clone, Default)]
pub(crate) struct ActiveConnections {
    inner: Arc<Registry>,
}

impl ActiveConnections {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Records a clone of `stream` and returns its identifier.
    pub(crate) fn register(&self, stream: &TcpStream) -> io::Result<ConnectionId> {
        let handle = stream.try_clone()?;
        let id = ConnectionId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        self.sockets().insert(id, handle);
        Ok(id)
    }

    /// Forgets a connection. Returns `false` when it was already removed.
    pub(crate) fn remove(&self, id: ConnectionId) -> bool {
        self.sockets().remove(&id).is_some()
    }

    pub(crate) fn len(&self) -> usize {
        self.sockets().len()
    }

    /// Shuts down and forgets every registered socket.
    ///
    /// Returns the number of sockets closed.
    pub(crate) fn shutdown_all(&self) -> usize {
        let drained: Vec<(ConnectionId, TcpStream)> = self.sockets().drain().collect();
        for (id, socket) in &drained {
            if let Err(error) = socket.shutdown(Shutdown::Both)
                && error.kind() != io::ErrorKind::NotConnected
            {
                debug!(
                    target: LISTENER_TARGET,
                    connection = %id,
                    error = %error,
                    "failed to shut down connection"
                );
            }
        }
        drained.len()
    }

    fn sockets(&self) -> MutexGuard<'_, HashMap<ConnectionId, TcpStream>> {
        // A panic while holding the lock leaves the map itself consistent.
        self.inner
            .sockets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Removes a connection from the active set when dropped, including on panic.
pub(crate) struct ConnectionGuard {
    connections: ActiveConnections,
    id: ConnectionId,
}

impl ConnectionGuard {
    pub(crate) const fn new(connections: ActiveConnections, id: ConnectionId) -> Self {
        Self { connections, id }
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.connections.remove(self.id);
    }
}
