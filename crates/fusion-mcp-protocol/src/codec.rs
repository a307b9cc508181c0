//! Newline-delimited JSON framing.
//!
//! Each message is serialised as compact single-line JSON followed by `\n`.
//! Compact `serde_json` output escapes control characters inside strings, so
//! the delimiter never appears within a frame. Decoding is incremental: bytes
//! are buffered until a delimiter arrives, which makes the decoder insensitive
//! to how the peer's writes were split into socket reads.

use serde_json::Value;

use crate::{Message, ProtocolError};

/// Byte terminating every frame.
pub const FRAME_DELIMITER: u8 = b'\n';

/// Largest incomplete frame the decoder buffers before giving up.
pub const MAX_FRAME_BYTES: usize = 1024 * 1024;

/// Outcome of attempting to decode one frame.
///
/// `None` means no complete frame is buffered yet. `Some(Err(_))` means a
/// complete frame was consumed but did not hold a JSON object.
pub type Decoded = Option<Result<Message, ProtocolError>>;

/// Serialises a message into a single delimited frame.
///
/// # Errors
///
/// Returns [`ProtocolError::Serialize`] when the message cannot be encoded.
pub fn encode(message: &Message) -> Result<Vec<u8>, ProtocolError> {
    let mut bytes =
        serde_json::to_vec(message).map_err(|source| ProtocolError::Serialize { source })?;
    bytes.push(FRAME_DELIMITER);
    Ok(bytes)
}

/// Decodes the first complete frame in `buffer`.
///
/// Returns the decode outcome and the bytes that follow the consumed frame.
/// Blank lines are skipped. When no delimiter is present the whole buffer is
/// returned untouched so the caller can append the next read to it.
pub fn decode(buffer: &[u8]) -> (Decoded, &[u8]) {
    let mut rest = buffer;
    loop {
        let Some(position) = rest.iter().position(|byte| *byte == FRAME_DELIMITER) else {
            return (None, rest);
        };
        let (line, tail) = rest.split_at(position);
        let after = tail.split_first().map_or(&[][..], |(_, after)| after);
        let line = line.trim_ascii();
        if line.is_empty() {
            rest = after;
            continue;
        }
        return (Some(parse_frame(line)), after);
    }
}

fn parse_frame(line: &[u8]) -> Result<Message, ProtocolError> {
    let value: Value =
        serde_json::from_slice(line).map_err(|source| ProtocolError::InvalidJson { source })?;
    match value {
        Value::Object(fields) => Ok(Message::from_fields(fields)),
        other => Err(ProtocolError::NotAnObject {
            found: json_kind(&other),
        }),
    }
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Stateful decoder owning the per-connection read buffer.
#[derive(Debug)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
    /// Leading buffered bytes already known to hold no delimiter.
    scanned: usize,
    max_frame_bytes: usize,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder {
    /// Creates a decoder with the default frame ceiling.
    #[must_use]
    pub const fn new() -> Self {
        Self::with_max_frame_bytes(MAX_FRAME_BYTES)
    }

    /// Creates a decoder that rejects incomplete frames above `max_frame_bytes`.
    #[must_use]
    pub const fn with_max_frame_bytes(max_frame_bytes: usize) -> Self {
        Self {
            buffer: Vec::new(),
            scanned: 0,
            max_frame_bytes,
        }
    }

    /// Appends bytes received from the transport.
    pub fn extend(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Decodes the next buffered message.
    ///
    /// Returns `Ok(None)` when more bytes are needed.
    ///
    /// # Errors
    ///
    /// Returns a recoverable [`ProtocolError`] for a malformed frame, which has
    /// already been discarded, or [`ProtocolError::FrameTooLarge`] when the
    /// pending partial frame exceeds the ceiling.
    pub fn next_message(&mut self) -> Result<Option<Message>, ProtocolError> {
        loop {
            let unscanned = self.buffer.get(self.scanned..).unwrap_or_default();
            let Some(offset) = unscanned.iter().position(|byte| *byte == FRAME_DELIMITER) else {
                self.scanned = self.buffer.len();
                if self.buffer.len() > self.max_frame_bytes {
                    return Err(ProtocolError::FrameTooLarge {
                        size: self.buffer.len(),
                        max_size: self.max_frame_bytes,
                    });
                }
                return Ok(None);
            };

            let end = self.scanned + offset;
            let line = self.buffer.get(..end).unwrap_or_default().trim_ascii();
            let decoded = (!line.is_empty()).then(|| parse_frame(line));
            self.buffer.drain(..=end);
            self.scanned = 0;
            if let Some(result) = decoded {
                return result.map(Some);
            }
        }
    }

    /// Number of bytes waiting for a delimiter.
    #[must_use]
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Returns `true` when a partial frame is buffered but unterminated.
    #[must_use]
    pub fn has_partial_frame(&self) -> bool {
        self.buffer.iter().any(|byte| !byte.is_ascii_whitespace())
    }
}
