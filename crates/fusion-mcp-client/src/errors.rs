//! Error types for the relay client and the CLI runtime.

use std::io;
use std::sync::Arc;

use thiserror::Error;

use fusion_mcp_protocol::ProtocolError;

/// Failures raised by [`crate::McpClient`].
#[derive(Debug, Error)]
pub enum ClientError {
    /// The server address did not resolve to a socket address.
    #[error("failed to resolve relay address {address}: {source}")]
    Resolve {
        /// Address that failed to resolve.
        address: String,
        /// Underlying resolver error.
        #[source]
        source: io::Error,
    },
    /// Opening the TCP connection failed.
    #[error("failed to connect to relay at {address}: {source}")]
    Connect {
        /// Address that refused or timed out.
        address: String,
        /// Underlying socket error.
        #[source]
        source: io::Error,
    },
    /// Writing a request failed.
    #[error("failed to send request to relay: {0}")]
    Send(#[source] io::Error),
    /// Reading a reply failed.
    #[error("failed to read reply from relay: {0}")]
    Receive(#[source] io::Error),
    /// The server closed the connection before a full reply arrived.
    #[error("relay closed the connection")]
    ConnectionClosed,
    /// No reply arrived within the read timeout.
    #[error("timed out waiting for a reply from the relay")]
    Timeout,
    /// A reply could not be framed or parsed.
    #[error("invalid reply from relay: {0}")]
    Protocol(#[from] ProtocolError),
    /// An operation needed a connection but none is open.
    #[error("not connected to the relay")]
    NotConnected,
}

impl ClientError {
    /// Returns `true` when the connection can no longer be used.
    #[must_use]
    pub const fn drops_connection(&self) -> bool {
        match self {
            Self::Protocol(error) => !error.is_recoverable(),
            Self::Send(_) | Self::Receive(_) | Self::ConnectionClosed | Self::Timeout => true,
            Self::Resolve { .. } | Self::Connect { .. } | Self::NotConnected => false,
        }
    }
}

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<ortho_config::OrthoError>),
    #[error("{0}")]
    CliUsage(clap::Error),
    #[error("--params must be valid JSON: {0}")]
    InvalidParams(#[source] serde_json::Error),
    #[error("--params must be a JSON object")]
    ParamsNotObject,
    #[error("failed to initialise logging: {0}")]
    Telemetry(String),
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error("failed to render reply: {0}")]
    RenderReply(#[source] serde_json::Error),
    #[error("failed to write reply: {0}")]
    WriteReply(#[source] io::Error),
}
