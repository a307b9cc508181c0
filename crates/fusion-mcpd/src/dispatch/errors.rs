//! Error types for message dispatch failures.
//!
//! [`DispatchError`] covers failures of the dispatch loop itself: frames that
//! cannot be decoded, messages that cannot be routed, and socket faults.
//! [`HandlerError`] is what an individual message handler returns; the loop
//! turns it into an error reply of the handler's response type.

use std::io;

use thiserror::Error;

use fusion_mcp_protocol::ProtocolError;

use crate::bridge::BridgeError;

/// Errors surfaced while decoding, routing, or answering a message.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The frame could not be decoded into a message.
    #[error("malformed message: {0}")]
    Protocol(#[from] ProtocolError),

    /// The message lacks a usable `type` field.
    #[error("message is missing a non-empty string 'type' field")]
    MissingType,

    /// No handler is registered for the message type.
    #[error("unknown message type: {message_type}")]
    UnknownType {
        /// Type named by the message.
        message_type: String,
    },

    /// The handler for the message reported a failure.
    #[error("handler for '{message_type}' failed: {source}")]
    Handler {
        /// Type of the message being handled.
        message_type: String,
        /// Error reported by the handler.
        #[source]
        source: HandlerError,
    },

    /// The handler for the message panicked.
    #[error("handler for '{message_type}' panicked")]
    HandlerPanicked {
        /// Type of the message being handled.
        message_type: String,
    },

    /// Reading from or writing to the socket failed.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl DispatchError {
    /// Creates an unknown type error.
    pub fn unknown_type(message_type: impl Into<String>) -> Self {
        Self::UnknownType {
            message_type: message_type.into(),
        }
    }

    /// Returns `true` when the connection cannot continue after this error.
    ///
    /// Decode, routing, and handler failures are answered and the connection
    /// stays open. Socket faults and oversized frames end it.
    pub const fn is_fatal(&self) -> bool {
        match self {
            Self::Protocol(error) => !error.is_recoverable(),
            Self::MissingType
            | Self::UnknownType { .. }
            | Self::Handler { .. }
            | Self::HandlerPanicked { .. } => false,
            Self::Io(_) => true,
        }
    }
}

/// Errors returned by message handlers.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The request payload is missing a field or has the wrong shape.
    #[error("invalid request: {message}")]
    InvalidRequest {
        /// Description of the problem.
        message: String,
    },

    /// The host application reported a failure.
    #[error(transparent)]
    Bridge(#[from] BridgeError),
}

impl HandlerError {
    /// Creates an invalid request error.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }
}
