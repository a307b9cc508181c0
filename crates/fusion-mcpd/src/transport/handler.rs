//! Connection handling abstractions for the relay listener.

use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream};

use super::ConnectionId;

/// Accepted client socket together with its registry identity.
pub(crate) struct ConnectionStream {
    id: ConnectionId,
    peer: Option<SocketAddr>,
    stream: TcpStream,
}

impl ConnectionStream {
    pub(crate) const fn new(id: ConnectionId, peer: Option<SocketAddr>, stream: TcpStream) -> Self {
        Self { id, peer, stream }
    }

    pub(crate) const fn id(&self) -> ConnectionId {
        self.id
    }

    pub(crate) const fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }
}

impl Read for ConnectionStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.read(buf)
    }
}

impl Write for ConnectionStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stream.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stream.flush()
    }
}

/// Handles accepted socket connections.
pub(crate) trait ConnectionHandler: Send + Sync + 'static {
    /// Serves a single connection until the peer closes it or it fails.
    fn handle(&self, stream: ConnectionStream);
}

/// Reads into `chunk`, retrying reads interrupted by signals.
pub(crate) fn read_with_retry<R: Read>(stream: &mut R, chunk: &mut [u8]) -> io::Result<usize> {
    loop {
        match stream.read(chunk) {
            Ok(read) => return Ok(read),
            Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
            Err(error) => return Err(error),
        }
    }
}
