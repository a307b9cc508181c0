//! Blocking relay client.
//!
//! [`McpClient`] speaks the same newline-delimited JSON framing as the server:
//! each request is one encoded line and each reply is decoded with a
//! [`FrameDecoder`] that survives fragmented reads. Only one request is
//! outstanding at a time.

use std::collections::HashMap;
use std::fmt;
use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Duration;

use tracing::{debug, info, warn};

use fusion_mcp_config::{Config, DEFAULT_CONNECT_TIMEOUT_SECS, ServerAddress};
use fusion_mcp_protocol::{FrameDecoder, Message, Payload, encode};

use crate::transport;
use crate::{CLIENT_TARGET, ClientError};

const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);
const READ_CHUNK_BYTES: usize = 8 * 1024;

/// Callback invoked with every reply of a registered type.
pub type ResponseHandler = Box<dyn Fn(&Message) + Send + Sync>;

/// Client for a running relay server.
pub struct McpClient {
    address: ServerAddress,
    connect_timeout: Duration,
    read_timeout: Duration,
    stream: Option<TcpStream>,
    decoder: FrameDecoder,
    handlers: HashMap<String, ResponseHandler>,
}

impl fmt::Debug for McpClient {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut handler_types: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        handler_types.sort_unstable();
        formatter
            .debug_struct("McpClient")
            .field("address", &self.address)
            .field("connected", &self.is_connected())
            .field("handler_types", &handler_types)
            .finish_non_exhaustive()
    }
}

impl McpClient {
    /// Creates a disconnected client for `address`.
    ///
    /// Connecting waits up to five seconds and each reply up to thirty.
    #[must_use]
    pub fn new(address: ServerAddress) -> Self {
        Self {
            address,
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            read_timeout: DEFAULT_READ_TIMEOUT,
            stream: None,
            decoder: FrameDecoder::new(),
            handlers: HashMap::new(),
        }
    }

    /// Creates a client for the configured address and connect timeout.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let mut client = Self::new(config.address());
        client.connect_timeout = config.connect_timeout();
        client
    }

    /// Uses `timeout` for both connecting and waiting for replies.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self.read_timeout = timeout;
        self
    }

    /// Address this client connects to.
    #[must_use]
    pub const fn address(&self) -> &ServerAddress {
        &self.address
    }

    /// Connects to the server, returning `false` on failure.
    ///
    /// The failure is logged; use [`Self::try_connect`] to inspect it.
    pub fn connect(&mut self) -> bool {
        match self.try_connect() {
            Ok(()) => true,
            Err(error) => {
                warn!(
                    target: CLIENT_TARGET,
                    address = %self.address,
                    error = %error,
                    "failed to connect to relay"
                );
                false
            }
        }
    }

    /// Connects to the server, replacing any existing connection.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Resolve`] or [`ClientError::Connect`] when no
    /// connection can be opened.
    pub fn try_connect(&mut self) -> Result<(), ClientError> {
        self.disconnect();
        let stream = transport::connect(&self.address, self.connect_timeout)?;
        stream
            .set_read_timeout(Some(self.read_timeout))
            .map_err(|source| ClientError::Connect {
                address: self.address.to_string(),
                source,
            })?;
        stream.set_nodelay(true).ok();
        debug!(
            target: CLIENT_TARGET,
            address = %self.address,
            "connected to relay"
        );
        self.stream = Some(stream);
        Ok(())
    }

    /// Returns `true` while a connection is open.
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Writes one message to the server.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotConnected`] without a connection, or a send
    /// error, after which the connection is closed.
    pub fn send(&mut self, message: &Message) -> Result<(), ClientError> {
        let bytes = encode(message)?;
        let stream = self.stream.as_mut().ok_or(ClientError::NotConnected)?;
        let written = stream.write_all(&bytes).and_then(|()| stream.flush());
        written.map_err(|source| self.lose_connection(ClientError::Send(source)))
    }

    /// Blocks until one complete message has been received.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::ConnectionClosed`] when the server hangs up,
    /// [`ClientError::Timeout`] when the read timeout elapses, and
    /// [`ClientError::Protocol`] for undecodable replies. Every error except a
    /// malformed but complete frame closes the connection.
    pub fn receive(&mut self) -> Result<Message, ClientError> {
        match self.read_message() {
            Ok(message) => Ok(message),
            Err(error) if error.drops_connection() => Err(self.lose_connection(error)),
            Err(error) => Err(error),
        }
    }

    /// Sends `message` and waits for its reply.
    ///
    /// Handlers registered for the reply's type are called before it is
    /// returned.
    ///
    /// # Errors
    ///
    /// Returns any error from [`Self::send`] or [`Self::receive`].
    pub fn request(&mut self, message: &Message) -> Result<Message, ClientError> {
        self.send(message)?;
        let reply = self.receive()?;
        self.notify(&reply);
        Ok(reply)
    }

    /// Registers `handler` for replies of `response_type`.
    ///
    /// A later registration for the same type replaces the earlier one.
    pub fn register_handler<F>(&mut self, response_type: impl Into<String>, handler: F)
    where
        F: Fn(&Message) + Send + Sync + 'static,
    {
        let response_type = response_type.into();
        debug!(
            target: CLIENT_TARGET,
            response_type = %response_type,
            "registered response handler"
        );
        self.handlers.insert(response_type, Box::new(handler));
    }

    /// Asks the host application to describe the open model.
    ///
    /// # Errors
    ///
    /// Returns any error from [`Self::request`].
    pub fn get_model_info(&mut self) -> Result<Message, ClientError> {
        self.request(&Message::get_model_info())
    }

    /// Runs `command` in the host application.
    ///
    /// # Errors
    ///
    /// Returns any error from [`Self::request`].
    pub fn execute_fusion_command(
        &mut self,
        command: &str,
        params: Payload,
    ) -> Result<Message, ClientError> {
        self.request(&Message::fusion_command(command, params))
    }

    /// Requests generated text for `prompt`.
    ///
    /// # Errors
    ///
    /// Returns any error from [`Self::request`].
    pub fn generate_text(
        &mut self,
        prompt: &str,
        model: Option<&str>,
    ) -> Result<Message, ClientError> {
        self.request(&Message::llm_request(prompt, model))
    }

    /// Closes the connection. Does nothing when not connected.
    pub fn disconnect(&mut self) {
        self.decoder = FrameDecoder::new();
        if let Some(stream) = self.stream.take() {
            stream.shutdown(Shutdown::Both).ok();
            debug!(
                target: CLIENT_TARGET,
                address = %self.address,
                "disconnected from relay"
            );
        }
    }

    fn read_message(&mut self) -> Result<Message, ClientError> {
        let mut chunk = [0_u8; READ_CHUNK_BYTES];
        loop {
            if let Some(message) = self.decoder.next_message()? {
                return Ok(message);
            }
            let stream = self.stream.as_mut().ok_or(ClientError::NotConnected)?;
            match stream.read(&mut chunk) {
                Ok(0) => return Err(ClientError::ConnectionClosed),
                Ok(read) => self.decoder.extend(chunk.get(..read).unwrap_or_default()),
                Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
                Err(error)
                    if matches!(
                        error.kind(),
                        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
                    ) =>
                {
                    return Err(ClientError::Timeout);
                }
                Err(error) => return Err(ClientError::Receive(error)),
            }
        }
    }

    fn lose_connection(&mut self, error: ClientError) -> ClientError {
        info!(
            target: CLIENT_TARGET,
            address = %self.address,
            error = %error,
            "relay connection lost"
        );
        self.disconnect();
        error
    }

    fn notify(&self, reply: &Message) {
        let Some(response_type) = reply.kind() else {
            warn!(target: CLIENT_TARGET, "received a reply without a type");
            return;
        };
        let Some(handler) = self.handlers.get(response_type) else {
            return;
        };
        if catch_unwind(AssertUnwindSafe(|| handler(reply))).is_err() {
            warn!(
                target: CLIENT_TARGET,
                response_type,
                "response handler panicked"
            );
        }
    }
}
