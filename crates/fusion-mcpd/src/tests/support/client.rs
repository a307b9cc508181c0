//! Minimal line-oriented client used to drive a running server.

use std::io::{BufRead, BufReader, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::time::Duration;

use serde_json::Value;

const REPLY_TIMEOUT: Duration = Duration::from_secs(5);

/// Raw socket client that writes bytes and reads one JSON reply per line.
pub struct TestClient {
    writer: TcpStream,
    reader: BufReader<TcpStream>,
}

impl TestClient {
    pub fn connect(address: SocketAddr) -> Self {
        let writer = TcpStream::connect(address).expect("connect to relay");
        writer
            .set_read_timeout(Some(REPLY_TIMEOUT))
            .expect("set read timeout");
        let reader = BufReader::new(writer.try_clone().expect("clone client socket"));
        Self { writer, reader }
    }

    pub fn send(&mut self, bytes: &[u8]) {
        self.writer.write_all(bytes).expect("write to relay");
        self.writer.flush().expect("flush relay socket");
    }

    pub fn read_reply(&mut self) -> Value {
        let mut line = String::new();
        let read = self.reader.read_line(&mut line).expect("read reply");
        assert!(read > 0, "relay closed the connection before replying");
        serde_json::from_str(&line).expect("reply is JSON")
    }

    pub fn request(&mut self, line: &str) -> Value {
        self.send(format!("{line}\n").as_bytes());
        self.read_reply()
    }

    /// Returns `true` when the server has closed the connection.
    pub fn is_closed_by_peer(&mut self) -> bool {
        let mut line = String::new();
        matches!(self.reader.read_line(&mut line), Ok(0) | Err(_))
    }

    /// Abruptly closes both directions of the socket.
    pub fn abort(self) {
        self.writer.shutdown(Shutdown::Both).ok();
    }
}
