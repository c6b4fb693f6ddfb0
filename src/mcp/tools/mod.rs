//! Kafka tools exposed over MCP.
//!
//! Arguments are validated before any broker call. Every failure, validation
//! or broker, becomes an `isError` tool result; handlers never return a
//! JSON-RPC error for it.

pub mod messages;
pub mod topics;

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::warn;

use super::protocol::ToolsCallResult;
use super::registry::{McpRegistry, ToolResult};

/// Register all Kafka tools with the registry
pub fn register_tools(registry: &mut McpRegistry) {
    topics::register_tools(registry);
    messages::register_tools(registry);
}

/// Why a tool call did not produce its success text.
#[derive(Debug, Error)]
pub enum ToolError {
    /// A required argument is missing or has the wrong type
    #[error("{0}")]
    Validation(String),

    /// The client cancelled the call before the broker answered
    #[error("Request cancelled")]
    Cancelled,

    #[error("{context}: {source}")]
    Broker {
        context: &'static str,
        #[source]
        source: kafka_mcp_broker::Error,
    },
}

impl ToolError {
    pub fn broker(context: &'static str) -> impl FnOnce(kafka_mcp_broker::Error) -> Self {
        move |source| ToolError::Broker { context, source }
    }
}

/// Wrap a tool outcome as the call result.
pub(crate) fn respond(tool: &str, outcome: Result<String, ToolError>) -> ToolResult {
    match outcome {
        Ok(text) => Ok(ToolsCallResult::text(text)),
        Err(e) => {
            warn!(tool, error = %e, "tool call failed");
            Ok(ToolsCallResult::error(e.to_string()))
        }
    }
}

/// Tool arguments; a missing or `null` argument object counts as empty.
pub(crate) struct Args<'a> {
    map: Option<&'a Map<String, Value>>,
}

impl<'a> Args<'a> {
    pub fn new(params: &'a Value) -> Result<Self, ToolError> {
        match params {
            Value::Null => Ok(Self { map: None }),
            Value::Object(map) => Ok(Self { map: Some(map) }),
            _ => Err(ToolError::Validation(
                "Invalid arguments: expected an object".to_string(),
            )),
        }
    }

    fn get(&self, name: &str) -> Option<&'a Value> {
        self.map
            .and_then(|map| map.get(name))
            .filter(|value| !value.is_null())
    }

    /// A non-blank string argument, or `missing` as the validation message.
    pub fn require_string(&self, name: &str, missing: &str) -> Result<&'a str, ToolError> {
        match self.get(name) {
            Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.as_str()),
            _ => Err(ToolError::Validation(missing.to_string())),
        }
    }

    /// A string argument that may be empty.
    pub fn require_present_string(&self, name: &str, missing: &str) -> Result<&'a str, ToolError> {
        match self.get(name) {
            Some(Value::String(s)) => Ok(s.as_str()),
            _ => Err(ToolError::Validation(missing.to_string())),
        }
    }

    /// An optional string argument; empty strings count as absent.
    pub fn optional_string(&self, name: &str) -> Result<Option<&'a str>, ToolError> {
        match self.get(name) {
            None => Ok(None),
            Some(Value::String(s)) if s.is_empty() => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.as_str())),
            Some(_) => Err(ToolError::Validation(format!(
                "Invalid {name}: expected a string"
            ))),
        }
    }

    /// An optional positive count. Absent, zero or negative values fall back
    /// to `default`; fractions are truncated.
    pub fn positive_count(&self, name: &str, default: usize) -> Result<usize, ToolError> {
        let value = match self.get(name) {
            None => return Ok(default),
            Some(Value::Number(n)) => n.as_f64(),
            Some(_) => None,
        };

        match value {
            Some(v) if v.is_finite() && v >= 1.0 => Ok(v.trunc().min(u32::MAX as f64) as usize),
            Some(v) if v.is_finite() => Ok(default),
            _ => Err(ToolError::Validation(format!(
                "Invalid {name}: expected a number"
            ))),
        }
    }
}
