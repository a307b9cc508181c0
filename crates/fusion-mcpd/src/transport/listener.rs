//! Listener implementation for relay transport sockets.

use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::{
    Arc, Mutex, PoisonError,
    atomic::{AtomicBool, Ordering},
};
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use fusion_mcp_config::ServerAddress;

use super::connections::ConnectionGuard;
use super::{ActiveConnections, ConnectionHandler, ConnectionStream, LISTENER_TARGET, ListenerError};

const ACCEPT_BACKOFF: Duration = Duration::from_millis(25);
const ERROR_BACKOFF: Duration = Duration::from_millis(150);

/// Per-connection socket settings applied on accept.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ConnectionOptions {
    /// Idle read timeout; `None` blocks until the peer writes or closes.
    pub(crate) read_timeout: Option<Duration>,
}

/// Listener bound to a TCP address but not yet accepting.
#[derive(Debug)]
pub(crate) struct SocketListener {
    address: ServerAddress,
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl SocketListener {
    pub(crate) fn bind(address: &ServerAddress) -> Result<Self, ListenerError> {
        let listener = bind_tcp(&address.host, address.port)?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| ListenerError::LocalAddr { source })?;
        Ok(Self {
            address: address.clone(),
            listener,
            local_addr,
        })
    }

    /// Address the socket is bound to, with the OS-assigned port resolved.
    pub(crate) const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub(crate) fn start(
        self,
        handler: Arc<dyn ConnectionHandler>,
        options: ConnectionOptions,
    ) -> Result<ListenerHandle, ListenerError> {
        self.listener
            .set_nonblocking(true)
            .map_err(|source| ListenerError::NonBlocking { source })?;

        let shutdown = Arc::new(AtomicBool::new(false));
        let connections = ActiveConnections::new();
        let local_addr = self.local_addr;
        let context = AcceptContext {
            shutdown: Arc::clone(&shutdown),
            connections: connections.clone(),
            handler,
            options,
        };
        let accept = thread::Builder::new()
            .name("fusion-mcp-accept".to_owned())
            .spawn(move || run_accept_loop(&self, &context))
            .map_err(|source| ListenerError::Spawn { source })?;

        Ok(ListenerHandle {
            shutdown,
            accept: Mutex::new(Some(accept)),
            connections,
            local_addr,
        })
    }
}

/// Handle to the background accept thread and its live connections.
#[derive(Debug)]
pub(crate) struct ListenerHandle {
    shutdown: Arc<AtomicBool>,
    accept: Mutex<Option<thread::JoinHandle<()>>>,
    connections: ActiveConnections,
    local_addr: SocketAddr,
}

impl ListenerHandle {
    pub(crate) const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub(crate) fn active_connections(&self) -> usize {
        self.connections.len()
    }

    pub(crate) fn is_stopped(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Stops accepting, joins the accept thread, and closes open connections.
    ///
    /// Calling `stop` again after it has completed is a no-op.
    pub(crate) fn stop(&self) -> Result<(), ListenerError> {
        self.shutdown.store(true, Ordering::SeqCst);
        let accept = self
            .accept
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let joined = match accept {
            Some(handle) => handle.join().map_err(|_| ListenerError::ThreadPanic),
            None => Ok(()),
        };
        let closed = self.connections.shutdown_all();
        if closed > 0 {
            info!(
                target: LISTENER_TARGET,
                closed,
                "closed active connections"
            );
        }
        joined
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        if let Err(error) = self.stop() {
            warn!(
                target: LISTENER_TARGET,
                error = %error,
                "listener did not stop cleanly"
            );
        }
    }
}

struct AcceptContext {
    shutdown: Arc<AtomicBool>,
    connections: ActiveConnections,
    handler: Arc<dyn ConnectionHandler>,
    options: ConnectionOptions,
}

fn run_accept_loop(listener: &SocketListener, context: &AcceptContext) {
    info!(
        target: LISTENER_TARGET,
        address = %listener.address,
        local_addr = %listener.local_addr,
        "socket listener active"
    );
    let mut last_error = None::<io::ErrorKind>;
    while !context.shutdown.load(Ordering::SeqCst) {
        match accept_connection(&listener.listener, context.options) {
            Ok(Some((stream, peer))) => {
                last_error = None;
                spawn_connection(context, stream, peer);
            }
            Ok(None) => thread::sleep(ACCEPT_BACKOFF),
            Err(error) => {
                let kind = error.kind();
                if last_error != Some(kind) {
                    warn!(
                        target: LISTENER_TARGET,
                        error = %error,
                        "socket accept error"
                    );
                }
                last_error = Some(kind);
                thread::sleep(ERROR_BACKOFF);
            }
        }
    }
    info!(target: LISTENER_TARGET, "socket listener stopped accepting");
}

fn accept_connection(
    listener: &TcpListener,
    options: ConnectionOptions,
) -> io::Result<Option<(TcpStream, SocketAddr)>> {
    match listener.accept() {
        Ok((stream, peer)) => {
            stream.set_nonblocking(false)?;
            stream.set_read_timeout(options.read_timeout)?;
            Ok(Some((stream, peer)))
        }
        Err(error) if error.kind() == io::ErrorKind::WouldBlock => Ok(None),
        Err(error) => Err(error),
    }
}

fn spawn_connection(context: &AcceptContext, stream: TcpStream, peer: SocketAddr) {
    let id = match context.connections.register(&stream) {
        Ok(id) => id,
        Err(error) => {
            warn!(
                target: LISTENER_TARGET,
                peer = %peer,
                error = %error,
                "failed to register connection"
            );
            return;
        }
    };
    debug!(
        target: LISTENER_TARGET,
        connection = %id,
        peer = %peer,
        "accepted connection"
    );

    let guard = ConnectionGuard::new(context.connections.clone(), id);
    let handler = Arc::clone(&context.handler);
    let spawned = thread::Builder::new()
        .name(format!("fusion-mcp-{id}"))
        .spawn(move || {
            let _guard = guard;
            handler.handle(ConnectionStream::new(id, Some(peer), stream));
        });
    if let Err(error) = spawned {
        // The closure, and with it the guard, is dropped on spawn failure.
        warn!(
            target: LISTENER_TARGET,
            connection = %id,
            error = %error,
            "failed to spawn connection thread"
        );
    }
}

fn bind_tcp(host: &str, port: u16) -> Result<TcpListener, ListenerError> {
    let mut addrs = (host, port)
        .to_socket_addrs()
        .map_err(|source| ListenerError::Resolve {
            host: host.to_owned(),
            port,
            source,
        })?;
    let addr = addrs.next().ok_or_else(|| ListenerError::ResolveEmpty {
        host: host.to_owned(),
        port,
    })?;
    TcpListener::bind(addr).map_err(|source| ListenerError::BindTcp { addr, source })
}
