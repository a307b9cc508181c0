//! Connection handler that answers framed JSON messages.
//!
//! Each connection runs a read loop: bytes are fed to a [`FrameDecoder`],
//! every complete message is routed through the [`DispatchTable`], and the
//! reply is written before the next message is taken. Replies therefore come
//! back in request order. Decode errors, unknown types, failing handlers, and
//! panicking handlers are all answered with an error reply and the connection
//! stays open; only socket faults and oversized frames end it.

use std::io::{self, Write};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{debug, info, warn};

use fusion_mcp_protocol::{FrameDecoder, MAX_FRAME_BYTES, Message, MessageKind, Payload};

use crate::transport::{ConnectionHandler, ConnectionStream, read_with_retry};

use super::DISPATCH_TARGET;
use super::errors::DispatchError;
use super::response::ResponseWriter;
use super::table::{DispatchTable, Route};

const READ_CHUNK_BYTES: usize = 8 * 1024;
const PANIC_REPLY: &str = "handler panicked";

/// How a connection's read loop ended.
#[derive(Debug)]
enum ConnectionOutcome {
    Closed,
    TimedOut,
    Failed(DispatchError),
}

/// Connection handler that routes every message through a dispatch table.
#[derive(Debug, Clone)]
pub(crate) struct DispatchConnectionHandler {
    table: Arc<DispatchTable>,
    max_frame_bytes: usize,
}

impl DispatchConnectionHandler {
    pub(crate) const fn new(table: Arc<DispatchTable>) -> Self {
        Self {
            table,
            max_frame_bytes: MAX_FRAME_BYTES,
        }
    }

    #[cfg(test)]
    pub(crate) const fn with_max_frame_bytes(mut self, max_frame_bytes: usize) -> Self {
        self.max_frame_bytes = max_frame_bytes;
        self
    }

    /// Builds the reply for one decoded message.
    pub(crate) fn reply_to(&self, request: &Message) -> Message {
        let Some(message_type) = request.kind() else {
            return reject(&DispatchError::MissingType);
        };
        let route = match self.table.resolve(message_type) {
            Ok(route) => route,
            Err(error) => return reject(&error),
        };

        debug!(
            target: DISPATCH_TARGET,
            message_type,
            "dispatching message"
        );
        match invoke(route, message_type, request) {
            Ok(payload) => Message::success(route.response_type(), payload),
            Err(error) => {
                warn!(
                    target: DISPATCH_TARGET,
                    message_type,
                    error = %error,
                    "message handler failed"
                );
                Message::failure(route.response_type(), client_error_text(&error))
            }
        }
    }

    fn serve(&self, stream: &mut ConnectionStream) -> ConnectionOutcome {
        let mut decoder = FrameDecoder::with_max_frame_bytes(self.max_frame_bytes);
        let mut chunk = [0_u8; READ_CHUNK_BYTES];
        loop {
            let read = match read_with_retry(stream, &mut chunk) {
                Ok(0) => {
                    if decoder.has_partial_frame() {
                        debug!(
                            target: DISPATCH_TARGET,
                            buffered = decoder.buffered_len(),
                            "discarding unterminated frame"
                        );
                    }
                    return ConnectionOutcome::Closed;
                }
                Ok(read) => read,
                Err(error) if is_timeout(&error) => return ConnectionOutcome::TimedOut,
                Err(error) => return ConnectionOutcome::Failed(error.into()),
            };
            decoder.extend(chunk.get(..read).unwrap_or_default());
            if let Err(error) = self.answer_pending(&mut decoder, &mut *stream) {
                return ConnectionOutcome::Failed(error);
            }
        }
    }

    fn answer_pending<W: Write>(
        &self,
        decoder: &mut FrameDecoder,
        writer: W,
    ) -> Result<(), DispatchError> {
        let mut writer = ResponseWriter::new(writer);
        loop {
            match decoder.next_message() {
                Ok(Some(request)) => writer.write_message(&self.reply_to(&request))?,
                Ok(None) => return Ok(()),
                Err(error) => {
                    let error = DispatchError::from(error);
                    writer.write_message(&reject(&error))?;
                    if error.is_fatal() {
                        return Err(error);
                    }
                }
            }
        }
    }
}

impl ConnectionHandler for DispatchConnectionHandler {
    fn handle(&self, mut stream: ConnectionStream) {
        let connection = stream.id();
        debug!(
            target: DISPATCH_TARGET,
            connection = %connection,
            peer = ?stream.peer(),
            "serving connection"
        );
        match self.serve(&mut stream) {
            ConnectionOutcome::Closed => {
                debug!(
                    target: DISPATCH_TARGET,
                    connection = %connection,
                    "connection closed"
                );
            }
            ConnectionOutcome::TimedOut => {
                info!(
                    target: DISPATCH_TARGET,
                    connection = %connection,
                    "closing idle connection"
                );
            }
            ConnectionOutcome::Failed(error) => {
                warn!(
                    target: DISPATCH_TARGET,
                    connection = %connection,
                    error = %error,
                    "connection failed"
                );
            }
        }
    }
}

fn invoke(route: &Route, message_type: &str, request: &Message) -> Result<Payload, DispatchError> {
    match panic::catch_unwind(AssertUnwindSafe(|| route.handler().handle(request))) {
        Ok(Ok(payload)) => Ok(payload),
        Ok(Err(source)) => Err(DispatchError::Handler {
            message_type: message_type.to_owned(),
            source,
        }),
        Err(_) => Err(DispatchError::HandlerPanicked {
            message_type: message_type.to_owned(),
        }),
    }
}

/// Error reply for messages that never reached a handler.
fn reject(error: &DispatchError) -> Message {
    warn!(
        target: DISPATCH_TARGET,
        error = %error,
        "rejected message"
    );
    Message::failure(MessageKind::Error.as_str(), error)
}

fn client_error_text(error: &DispatchError) -> String {
    match error {
        DispatchError::Handler { source, .. } => source.to_string(),
        DispatchError::HandlerPanicked { .. } => PANIC_REPLY.to_owned(),
        other => other.to_string(),
    }
}

fn is_timeout(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}
