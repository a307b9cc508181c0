//! TCP connection setup for the relay client.

use std::io;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use fusion_mcp_config::ServerAddress;

use crate::ClientError;

/// Opens a TCP connection to `address`, trying each resolved address in turn.
pub(crate) fn connect(address: &ServerAddress, timeout: Duration) -> Result<TcpStream, ClientError> {
    let candidates = resolve(address).map_err(|source| ClientError::Resolve {
        address: address.to_string(),
        source,
    })?;

    let mut last_error =
        io::Error::new(io::ErrorKind::AddrNotAvailable, "no resolved addresses");
    for candidate in candidates {
        match TcpStream::connect_timeout(&candidate, timeout) {
            Ok(stream) => return Ok(stream),
            Err(error) => last_error = error,
        }
    }
    Err(ClientError::Connect {
        address: address.to_string(),
        source: last_error,
    })
}

fn resolve(address: &ServerAddress) -> io::Result<Vec<SocketAddr>> {
    let resolved: Vec<SocketAddr> = address.as_tuple().to_socket_addrs()?.collect();
    if resolved.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::AddrNotAvailable,
            "no resolved addresses",
        ));
    }
    Ok(resolved)
}
