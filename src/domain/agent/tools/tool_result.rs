//! Tool execution result value object.
//!
//! Exactly one `ToolResult` exists per issued `ToolCallRequest`, carrying
//! the same call id. Failures are data, not control flow: an error kind is
//! fed back to the reasoning engine instead of unwinding the turn.

use serde::{Deserialize, Serialize};

use super::ToolCallId;

/// Category of a per-call tool failure.
///
/// All kinds are recoverable at the turn level: they are folded into the
/// tool-turn message and the engine may retry differently or give up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolErrorKind {
    /// Arguments failed schema validation; no connector was contacted.
    InvalidArguments,

    /// Tool name is not in the registry; no connector was contacted.
    UnknownTool,

    /// The connector call exceeded its timeout.
    ConnectorTimeout,

    /// The connector was unreachable or returned a transport failure.
    ConnectorUnavailable,
}

impl ToolErrorKind {
    /// Returns true if retrying the same call might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConnectorTimeout | Self::ConnectorUnavailable)
    }

    /// Returns a human-readable description of the failure.
    pub fn description(&self) -> &'static str {
        match self {
            Self::InvalidArguments => "Tool arguments failed validation",
            Self::UnknownTool => "Tool is not registered",
            Self::ConnectorTimeout => "Connector call timed out",
            Self::ConnectorUnavailable => "Connector is unavailable",
        }
    }
}

impl std::fmt::Display for ToolErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Outcome of executing one tool call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Id of the originating call.
    call_id: ToolCallId,

    /// Name of the executed tool (for the tools-used trail).
    tool_name: String,

    /// Payload returned by the connector, if the call succeeded.
    payload: Option<serde_json::Value>,

    /// Failure category, if the call failed.
    error: Option<ToolErrorKind>,
}

impl ToolResult {
    /// Creates a successful result carrying the connector payload.
    pub fn success(
        call_id: ToolCallId,
        tool_name: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            call_id,
            tool_name: tool_name.into(),
            payload: Some(payload),
            error: None,
        }
    }

    /// Creates a failed result with an error kind.
    pub fn failure(call_id: ToolCallId, tool_name: impl Into<String>, kind: ToolErrorKind) -> Self {
        Self {
            call_id,
            tool_name: tool_name.into(),
            payload: None,
            error: Some(kind),
        }
    }

    /// Returns the paired call id.
    pub fn call_id(&self) -> &ToolCallId {
        &self.call_id
    }

    /// Returns the tool name.
    pub fn tool_name(&self) -> &str {
        &self.tool_name
    }

    /// Returns the payload, if the call succeeded.
    pub fn payload(&self) -> Option<&serde_json::Value> {
        self.payload.as_ref()
    }

    /// Returns the error kind, if the call failed.
    pub fn error(&self) -> Option<ToolErrorKind> {
        self.error
    }

    /// Returns true if the call succeeded.
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Returns true if the call succeeded but produced no usable data.
    ///
    /// An empty array or null payload from the verified source marks the
    /// verified path as empty for the fallback decision.
    pub fn is_empty_payload(&self) -> bool {
        match &self.payload {
            Some(serde_json::Value::Null) => true,
            Some(serde_json::Value::Array(items)) => items.is_empty(),
            Some(_) => false,
            None => false,
        }
    }

    /// Renders this result as one line of the combined tool-turn message.
    pub fn render(&self) -> String {
        match (&self.payload, self.error) {
            (Some(payload), _) => format!("{} ({}): {}", self.tool_name, self.call_id, payload),
            (None, Some(kind)) => {
                format!("{} ({}): error: {}", self.tool_name, self.call_id, kind)
            }
            (None, None) => format!("{} ({}): error: unknown", self.tool_name, self.call_id),
        }
    }
}
