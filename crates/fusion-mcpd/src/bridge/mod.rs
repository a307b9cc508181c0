//! Capability interface to the CAD host application.
//!
//! The relay never talks to the host directly. Handlers registered by
//! [`register_host_bridge`] translate `fusion_command` and `get_model_info`
//! messages into calls on a [`HostBridge`], and [`register_text_generator`]
//! does the same for `llm_request` against a [`TextGenerator`]. Embedding the
//! relay inside a real host means supplying real implementations; the
//! standalone server uses [`StubHostBridge`] and [`UnconfiguredGenerator`].

mod stub;
mod text;

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tracing::info;

use fusion_mcp_protocol::{Message, MessageKind, Payload};

use crate::dispatch::{DispatchTable, HandlerError};

pub use stub::StubHostBridge;
pub use text::{TextGenerator, UnconfiguredGenerator, register_text_generator};

const BRIDGE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::bridge");

/// Failures reported by the host application or a text generator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    /// The host rejected or failed to run a command.
    #[error("command '{command}' failed: {message}")]
    Command {
        /// Command that was attempted.
        command: String,
        /// Host-supplied description of the failure.
        message: String,
    },
    /// The host application cannot be reached.
    #[error("host application unavailable: {message}")]
    Unavailable {
        /// Description of the problem.
        message: String,
    },
    /// No text generator is wired into the server.
    #[error("no text generator configured")]
    GeneratorUnconfigured,
    /// The text generator failed.
    #[error("text generation failed: {message}")]
    Generation {
        /// Generator-supplied description of the failure.
        message: String,
    },
}

impl BridgeError {
    /// Creates a command failure.
    pub fn command(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Command {
            command: command.into(),
            message: message.into(),
        }
    }

    /// Creates an unavailable-host failure.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }
}

/// Operations the relay needs from the CAD host.
///
/// Implementations are shared by every connection thread and may be called
/// concurrently.
#[cfg_attr(test, mockall::automock)]
pub trait HostBridge: Send + Sync {
    /// Runs a named host command and returns its result object.
    ///
    /// # Errors
    ///
    /// Returns a [`BridgeError`] when the host rejects or fails the command.
    fn execute_command(&self, command: &str, params: &Payload) -> Result<Value, BridgeError>;

    /// Describes the active design.
    ///
    /// # Errors
    ///
    /// Returns a [`BridgeError`] when the host cannot report its model.
    fn model_info(&self) -> Result<Value, BridgeError>;
}

/// Registers `fusion_command` and `get_model_info` handlers backed by `bridge`.
pub fn register_host_bridge(table: &mut DispatchTable, bridge: Arc<dyn HostBridge>) {
    let command_bridge = Arc::clone(&bridge);
    table
        .register(
            MessageKind::FusionCommand.as_str(),
            move |request: &Message| -> Result<Payload, HandlerError> {
                execute_command(command_bridge.as_ref(), request)
            },
        )
        .register(
            MessageKind::GetModelInfo.as_str(),
            move |_request: &Message| -> Result<Payload, HandlerError> {
                model_info(bridge.as_ref())
            },
        );
}

fn execute_command(bridge: &dyn HostBridge, request: &Message) -> Result<Payload, HandlerError> {
    let command = request
        .get_str("command")
        .filter(|command| !command.is_empty())
        .ok_or_else(|| HandlerError::invalid_request("'command' must be a non-empty string"))?;
    let params = match request.get("params") {
        None | Some(Value::Null) => Payload::new(),
        Some(Value::Object(params)) => params.clone(),
        Some(_) => return Err(HandlerError::invalid_request("'params' must be an object")),
    };

    info!(
        target: BRIDGE_TARGET,
        command,
        params = params.len(),
        "executing host command"
    );
    let result = bridge.execute_command(command, &params)?;

    let mut payload = Payload::new();
    payload.insert("command".to_owned(), Value::String(command.to_owned()));
    payload.insert("result".to_owned(), result);
    Ok(payload)
}

fn model_info(bridge: &dyn HostBridge) -> Result<Payload, HandlerError> {
    let data = bridge.model_info()?;
    let mut payload = Payload::new();
    payload.insert("data".to_owned(), data);
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use mockall::predicate::eq;
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    fn table_with(bridge: MockHostBridge) -> DispatchTable {
        let mut table = DispatchTable::new();
        register_host_bridge(&mut table, Arc::new(bridge));
        table
    }

    fn handle(table: &DispatchTable, request: &Message) -> Result<Payload, HandlerError> {
        let message_type = request.kind().expect("request type");
        table
            .resolve(message_type)
            .expect("route registered")
            .handler()
            .handle(request)
    }

    fn params(value: serde_json::Value) -> Payload {
        value.as_object().cloned().expect("object params")
    }

    #[test]
    fn forwards_command_and_params_to_host() {
        let mut bridge = MockHostBridge::new();
        bridge
            .expect_execute_command()
            .with(eq("create_circle"), eq(params(json!({"radius": 10}))))
            .times(1)
            .returning(|_, _| Ok(json!({"entity": "circle-1"})));
        let table = table_with(bridge);

        let payload = handle(
            &table,
            &Message::fusion_command("create_circle", params(json!({"radius": 10}))),
        )
        .expect("command succeeds");
        assert_eq!(payload["command"], "create_circle");
        assert_eq!(payload["result"]["entity"], "circle-1");
    }

    #[test]
    fn missing_params_default_to_empty_object() {
        let mut bridge = MockHostBridge::new();
        bridge
            .expect_execute_command()
            .with(eq("fit_view"), eq(Payload::new()))
            .times(1)
            .returning(|_, _| Ok(json!({})));
        let table = table_with(bridge);

        let request = Message::new("fusion_command").with("command", "fit_view");
        assert!(handle(&table, &request).is_ok());
    }

    #[rstest]
    #[case::missing_command(Message::new("fusion_command"))]
    #[case::empty_command(Message::new("fusion_command").with("command", ""))]
    #[case::numeric_command(Message::new("fusion_command").with("command", 3))]
    #[case::array_params(
        Message::new("fusion_command").with("command", "extrude").with("params", json!([1, 2]))
    )]
    fn invalid_commands_never_reach_host(#[case] request: Message) {
        let mut bridge = MockHostBridge::new();
        bridge.expect_execute_command().never();
        let table = table_with(bridge);

        let error = handle(&table, &request).expect_err("request is invalid");
        assert!(matches!(error, HandlerError::InvalidRequest { .. }));
    }

    #[test]
    fn host_failures_become_handler_errors() {
        let mut bridge = MockHostBridge::new();
        bridge
            .expect_execute_command()
            .returning(|command, _| Err(BridgeError::command(command, "no active sketch")));
        let table = table_with(bridge);

        let error = handle(
            &table,
            &Message::fusion_command("create_circle", Payload::new()),
        )
        .expect_err("host fails");
        assert_eq!(
            error.to_string(),
            "command 'create_circle' failed: no active sketch"
        );
    }

    #[test]
    fn model_info_is_wrapped_in_data() {
        let mut bridge = MockHostBridge::new();
        bridge
            .expect_model_info()
            .times(1)
            .returning(|| Ok(json!({"name": "Bracket"})));
        let table = table_with(bridge);

        let payload = handle(&table, &Message::get_model_info()).expect("model info");
        assert_eq!(payload["data"]["name"], "Bracket");
    }

    #[test]
    fn unavailable_host_fails_model_info() {
        let mut bridge = MockHostBridge::new();
        bridge
            .expect_model_info()
            .returning(|| Err(BridgeError::unavailable("no document open")));
        let table = table_with(bridge);

        let error = handle(&table, &Message::get_model_info()).expect_err("host unavailable");
        assert!(matches!(
            error,
            HandlerError::Bridge(BridgeError::Unavailable { .. })
        ));
    }
}
