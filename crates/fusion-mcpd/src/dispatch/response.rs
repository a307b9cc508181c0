//! Reply framing for the dispatch loop.

use std::io::Write;

use fusion_mcp_protocol::{Message, encode};

use super::errors::DispatchError;

/// Writes framed replies to a connection.
pub struct ResponseWriter<W> {
    writer: W,
}

impl<W: Write> ResponseWriter<W> {
    /// Creates a new response writer wrapping the given output stream.
    pub const fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Encodes `message` as one frame and flushes it.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or writing fails.
    pub fn write_message(&mut self, message: &Message) -> Result<(), DispatchError> {
        let frame = encode(message)?;
        self.writer.write_all(&frame)?;
        self.writer.flush()?;
        Ok(())
    }
}
