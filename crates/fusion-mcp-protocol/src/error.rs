//! Errors raised while framing or parsing protocol messages.

use thiserror::Error;

/// Errors surfaced by the newline-delimited JSON codec.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// A complete frame did not contain valid JSON.
    #[error("malformed JSON: {source}")]
    InvalidJson {
        /// Underlying parser error.
        #[source]
        source: serde_json::Error,
    },

    /// A complete frame held valid JSON that was not an object.
    #[error("expected a JSON object but received {found}")]
    NotAnObject {
        /// JSON kind that was received instead (for example `array`).
        found: &'static str,
    },

    /// Buffered bytes without a delimiter grew past the frame limit.
    #[error("frame too large: {size} bytes exceeds {max_size} byte limit")]
    FrameTooLarge {
        /// Number of bytes buffered for the incomplete frame.
        size: usize,
        /// Configured frame ceiling.
        max_size: usize,
    },

    /// Serialising an outgoing message failed.
    #[error("failed to serialise message: {source}")]
    Serialize {
        /// Underlying serialiser error.
        #[source]
        source: serde_json::Error,
    },
}

impl ProtocolError {
    /// Returns `true` when decoding can continue with the next frame.
    ///
    /// Malformed frames are consumed by the decoder, so the stream stays in
    /// sync. An oversized frame leaves the stream without a reliable
    /// boundary and the connection must be dropped.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::InvalidJson { .. } | Self::NotAnObject { .. })
    }
}
