//! Canned host used when the relay runs outside a CAD session.

use serde_json::{Value, json};
use tracing::debug;

use fusion_mcp_protocol::Payload;

use super::{BRIDGE_TARGET, BridgeError, HostBridge};

/// Host bridge that acknowledges every command and reports a sample model.
#[derive(Debug, Default, Clone, Copy)]
pub struct StubHostBridge;

impl StubHostBridge {
    /// Builds a new stub.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl HostBridge for StubHostBridge {
    fn execute_command(&self, command: &str, params: &Payload) -> Result<Value, BridgeError> {
        debug!(target: BRIDGE_TARGET, command, "stub host acknowledged command");
        Ok(json!({
            "command": command,
            "params": params,
            "executed": true,
            "message": format!("Command {command} executed successfully"),
        }))
    }

    fn model_info(&self) -> Result<Value, BridgeError> {
        Ok(json!({
            "name": "Example Model",
            "version": "1.0",
            "components": [
                {"id": "comp1", "name": "Component 1"},
                {"id": "comp2", "name": "Component 2"},
            ],
        }))
    }
}
