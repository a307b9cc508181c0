//! Wire types shared by the Fusion MCP relay server and its clients.
//!
//! Every exchange is a single JSON object tagged by a `type` field and framed
//! as one line of newline-delimited JSON:
//!
//! ```json
//! {"type":"fusion_command","command":"create_circle","params":{"radius":10}}
//! {"type":"command_result","status":"success","command":"create_circle","result":{}}
//! ```
//!
//! The [`codec`] module owns framing so that the server and the client decode
//! the byte stream identically, including reassembly of frames split across
//! several socket reads.

pub mod codec;
mod error;
mod message;

pub use codec::{Decoded, FrameDecoder, MAX_FRAME_BYTES, decode, encode};
pub use error::ProtocolError;
pub use message::{
    DEFAULT_LLM_MODEL, ERROR_FIELD, Message, MessageKind, Payload, STATUS_FIELD, Status,
    TYPE_FIELD, response_type_for,
};
