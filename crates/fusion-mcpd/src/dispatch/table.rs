//! Mapping from message type to handler.
//!
//! The table is assembled before the server starts and is shared read-only
//! by every connection, so handlers must be `Send + Sync`. Registering a type
//! twice replaces the earlier handler.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use fusion_mcp_protocol::{Message, Payload, response_type_for};

use super::DISPATCH_TARGET;
use super::errors::{DispatchError, HandlerError};

/// Handles one message type.
///
/// Handlers receive the whole request (including `type`) and return the
/// payload of a successful reply. The dispatch loop adds `type` and `status`.
pub trait MessageHandler: Send + Sync + 'static {
    /// Produces the reply payload for `request`.
    ///
    /// # Errors
    ///
    /// Returns a [`HandlerError`] when the request is invalid or the host
    /// application fails; the caller answers with an error reply.
    fn handle(&self, request: &Message) -> Result<Payload, HandlerError>;
}

impl<F> MessageHandler for F
where
    F: Fn(&Message) -> Result<Payload, HandlerError> + Send + Sync + 'static,
{
    fn handle(&self, request: &Message) -> Result<Payload, HandlerError> {
        self(request)
    }
}

/// Registered handler together with the type its replies carry.
#[derive(Clone)]
pub struct Route {
    response_type: String,
    handler: Arc<dyn MessageHandler>,
}

impl Route {
    /// Type of the replies produced for this route.
    pub fn response_type(&self) -> &str {
        &self.response_type
    }

    /// Handler invoked for matching messages.
    pub fn handler(&self) -> &dyn MessageHandler {
        self.handler.as_ref()
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Route")
            .field("response_type", &self.response_type)
            .finish_non_exhaustive()
    }
}

/// Message type to handler mapping shared by all connections.
#[derive(Debug, Clone, Default)]
pub struct DispatchTable {
    routes: HashMap<String, Route>,
}

impl DispatchTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `message_type`.
    ///
    /// Replies use the documented response type for known kinds and
    /// `<message_type>_result` otherwise. A later registration for the same
    /// type replaces the earlier one.
    pub fn register(
        &mut self,
        message_type: impl Into<String>,
        handler: impl MessageHandler,
    ) -> &mut Self {
        let message_type = message_type.into();
        let response_type = response_type_for(&message_type);
        self.register_with_response(message_type, response_type, handler)
    }

    /// Registers `handler` for `message_type` with an explicit reply type.
    pub fn register_with_response(
        &mut self,
        message_type: impl Into<String>,
        response_type: impl Into<String>,
        handler: impl MessageHandler,
    ) -> &mut Self {
        let message_type = message_type.into();
        let route = Route {
            response_type: response_type.into(),
            handler: Arc::new(handler),
        };
        if self.routes.insert(message_type.clone(), route).is_some() {
            debug!(
                target: DISPATCH_TARGET,
                message_type = %message_type,
                "replaced message handler"
            );
        } else {
            debug!(
                target: DISPATCH_TARGET,
                message_type = %message_type,
                "registered message handler"
            );
        }
        self
    }

    /// Looks up the route for `message_type`.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::UnknownType`] when nothing is registered.
    pub fn resolve(&self, message_type: &str) -> Result<&Route, DispatchError> {
        self.routes
            .get(message_type)
            .ok_or_else(|| DispatchError::unknown_type(message_type))
    }

    /// Returns `true` when a handler is registered for `message_type`.
    #[must_use]
    pub fn contains(&self, message_type: &str) -> bool {
        self.routes.contains_key(message_type)
    }

    /// Number of registered message types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns `true` when no handlers are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Registered message types in sorted order.
    #[must_use]
    pub fn message_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.routes.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }
}
