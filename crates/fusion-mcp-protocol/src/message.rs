//! Message model for the relay protocol.
//!
//! A [`Message`] is a JSON object. The `type` field selects the handler on the
//! server and the meaning of the reply on the client; every other field is
//! payload. Messages are built by value and never mutated in place.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field holding the message kind.
pub const TYPE_FIELD: &str = "type";
/// Field holding the outcome of a response.
pub const STATUS_FIELD: &str = "status";
/// Field holding the human-readable failure text of a response.
pub const ERROR_FIELD: &str = "error";

/// Model requested by `llm_request` messages that do not name one.
pub const DEFAULT_LLM_MODEL: &str = "gpt-3.5-turbo";

/// Type-specific fields carried alongside `type`.
pub type Payload = Map<String, Value>;

/// Outcome reported by response messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// The request was handled.
    Success,
    /// The request failed; the `error` field explains why.
    Error,
}

impl Status {
    /// Returns the wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Message kinds understood by the relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// Run a named command in the host application.
    FusionCommand,
    /// Ask the host application to describe the open model.
    GetModelInfo,
    /// Reply to [`MessageKind::FusionCommand`].
    CommandResult,
    /// Reply to [`MessageKind::GetModelInfo`].
    ModelInfo,
    /// Ask for generated text from a prompt.
    LlmRequest,
    /// Reply to [`MessageKind::LlmRequest`].
    LlmResult,
    /// Protocol-level failure reply for input that never reached a handler.
    Error,
}

impl MessageKind {
    /// Every recognised kind, requests first.
    pub const ALL: [Self; 7] = [
        Self::FusionCommand,
        Self::GetModelInfo,
        Self::LlmRequest,
        Self::CommandResult,
        Self::ModelInfo,
        Self::LlmResult,
        Self::Error,
    ];

    /// Returns the wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FusionCommand => "fusion_command",
            Self::GetModelInfo => "get_model_info",
            Self::CommandResult => "command_result",
            Self::ModelInfo => "model_info",
            Self::LlmRequest => "llm_request",
            Self::LlmResult => "llm_result",
            Self::Error => "error",
        }
    }

    /// Returns the reply kind for request kinds.
    #[must_use]
    pub const fn response_kind(self) -> Option<Self> {
        match self {
            Self::FusionCommand => Some(Self::CommandResult),
            Self::GetModelInfo => Some(Self::ModelInfo),
            Self::LlmRequest => Some(Self::LlmResult),
            Self::CommandResult | Self::ModelInfo | Self::LlmResult | Self::Error => None,
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for MessageKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == value)
            .ok_or_else(|| value.to_owned())
    }
}

/// Reply type for a request type.
///
/// Recognised requests map to their documented reply; any other registered
/// type replies with `<type>_result`.
#[must_use]
pub fn response_type_for(request_type: &str) -> String {
    match request_type
        .parse::<MessageKind>()
        .ok()
        .and_then(MessageKind::response_kind)
    {
        Some(kind) => kind.as_str().to_owned(),
        None => format!("{request_type}_result"),
    }
}

/// One JSON object exchanged over the socket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Message {
    fields: Payload,
}

impl Message {
    /// Creates a message carrying only a `type`.
    #[must_use]
    pub fn new(kind: impl Into<String>) -> Self {
        let mut fields = Payload::new();
        fields.insert(TYPE_FIELD.to_owned(), Value::String(kind.into()));
        Self { fields }
    }

    /// Wraps decoded fields without validating them.
    ///
    /// Inbound frames may lack a usable `type`; callers check [`Self::kind`]
    /// before dispatching.
    #[must_use]
    pub const fn from_fields(fields: Payload) -> Self {
        Self { fields }
    }

    /// Returns a copy of the message with `key` set to `value`.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Returns a copy of the message with every payload field merged in.
    ///
    /// A `type` entry inside `payload` is ignored so the kind cannot be
    /// replaced by handler output.
    #[must_use]
    pub fn with_payload(mut self, payload: Payload) -> Self {
        for (key, value) in payload {
            if key != TYPE_FIELD {
                self.fields.insert(key, value);
            }
        }
        self
    }

    /// Builds a successful reply of `kind` carrying `payload`.
    #[must_use]
    pub fn success(kind: impl Into<String>, payload: Payload) -> Self {
        Self::new(kind)
            .with_payload(payload)
            .with(STATUS_FIELD, Status::Success.as_str())
    }

    /// Builds a failed reply of `kind` carrying `error`.
    #[must_use]
    pub fn failure(kind: impl Into<String>, error: impl fmt::Display) -> Self {
        Self::new(kind)
            .with(STATUS_FIELD, Status::Error.as_str())
            .with(ERROR_FIELD, error.to_string())
    }

    /// Builds a `fusion_command` request.
    #[must_use]
    pub fn fusion_command(command: impl Into<String>, params: Payload) -> Self {
        Self::new(MessageKind::FusionCommand.as_str())
            .with("command", Value::String(command.into()))
            .with("params", Value::Object(params))
    }

    /// Builds a `get_model_info` request.
    #[must_use]
    pub fn get_model_info() -> Self {
        Self::new(MessageKind::GetModelInfo.as_str())
    }

    /// Builds an `llm_request`, defaulting the model when none is given.
    #[must_use]
    pub fn llm_request(prompt: impl Into<String>, model: Option<&str>) -> Self {
        Self::new(MessageKind::LlmRequest.as_str())
            .with("prompt", Value::String(prompt.into()))
            .with("model", model.unwrap_or(DEFAULT_LLM_MODEL))
    }

    /// Returns the message kind when `type` is a non-empty string.
    #[must_use]
    pub fn kind(&self) -> Option<&str> {
        self.get_str(TYPE_FIELD)
            .filter(|kind| !kind.trim().is_empty())
    }

    /// Returns a field by name.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Returns a string field by name.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Returns the parsed `status`, if any.
    #[must_use]
    pub fn status(&self) -> Option<Status> {
        match self.get_str(STATUS_FIELD)? {
            "success" => Some(Status::Success),
            "error" => Some(Status::Error),
            _ => None,
        }
    }

    /// Returns `true` when the message reports `status: "success"`.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status() == Some(Status::Success)
    }

    /// Returns the failure text of an error reply.
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        self.get_str(ERROR_FIELD)
    }

    /// Returns every field except `type`.
    #[must_use]
    pub fn payload(&self) -> Payload {
        self.fields
            .iter()
            .filter(|(key, _)| key.as_str() != TYPE_FIELD)
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    /// Borrows every field, including `type`.
    #[must_use]
    pub const fn fields(&self) -> &Payload {
        &self.fields
    }

    /// Consumes the message and returns its fields.
    #[must_use]
    pub fn into_fields(self) -> Payload {
        self.fields
    }
}

impl fmt::Display for Message {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(&self.fields) {
            Ok(text) => formatter.write_str(&text),
            Err(_) => Err(fmt::Error),
        }
    }
}
