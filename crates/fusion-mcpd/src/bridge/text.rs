//! `llm_request` handling.

use std::sync::Arc;

use serde_json::Value;
use tracing::info;

use fusion_mcp_protocol::{DEFAULT_LLM_MODEL, Message, MessageKind, Payload};

use crate::dispatch::{DispatchTable, HandlerError};

use super::{BRIDGE_TARGET, BridgeError};

/// Produces text for a prompt.
#[cfg_attr(test, mockall::automock)]
pub trait TextGenerator: Send + Sync {
    /// Generates a completion for `prompt` using `model`.
    ///
    /// # Errors
    ///
    /// Returns a [`BridgeError`] when no completion can be produced.
    fn generate(&self, prompt: &str, model: &str) -> Result<String, BridgeError>;
}

/// Generator that rejects every prompt.
///
/// The standalone server registers it so that `llm_request` is a known type
/// whose replies explain what is missing.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnconfiguredGenerator;

impl TextGenerator for UnconfiguredGenerator {
    fn generate(&self, _prompt: &str, _model: &str) -> Result<String, BridgeError> {
        Err(BridgeError::GeneratorUnconfigured)
    }
}

/// Registers the `llm_request` handler backed by `generator`.
pub fn register_text_generator(table: &mut DispatchTable, generator: Arc<dyn TextGenerator>) {
    table.register(
        MessageKind::LlmRequest.as_str(),
        move |request: &Message| -> Result<Payload, HandlerError> {
            generate(generator.as_ref(), request)
        },
    );
}

fn generate(generator: &dyn TextGenerator, request: &Message) -> Result<Payload, HandlerError> {
    let prompt = request
        .get_str("prompt")
        .ok_or_else(|| HandlerError::invalid_request("'prompt' must be a string"))?;
    let model = match request.get("model") {
        None | Some(Value::Null) => DEFAULT_LLM_MODEL,
        Some(Value::String(model)) if !model.is_empty() => model.as_str(),
        Some(_) => return Err(HandlerError::invalid_request("'model' must be a non-empty string")),
    };

    info!(
        target: BRIDGE_TARGET,
        model,
        prompt_chars = prompt.chars().count(),
        "generating text"
    );
    let text = generator.generate(prompt, model)?;

    let mut payload = Payload::new();
    payload.insert("model".to_owned(), Value::String(model.to_owned()));
    payload.insert("text".to_owned(), Value::String(text));
    Ok(payload)
}
