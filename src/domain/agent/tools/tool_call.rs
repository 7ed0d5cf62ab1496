//! Tool call request value object.
//!
//! A `ToolCallRequest` is the reasoning engine's intent to invoke one
//! declared tool. The engine mints the call id; the matching `ToolResult`
//! must carry the same id before the next reasoning round.

use serde::{Deserialize, Serialize};

/// Identifier pairing a tool call with its result.
///
/// Minted by the reasoning engine, opaque to everything else.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ToolCallId(String);

impl ToolCallId {
    /// Creates a call id from the engine's string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the inner string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ToolCallId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A request to invoke a tool.
///
/// Arguments are passed as a JSON object to support the varying schemas of
/// different tools.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Pairing id minted by the reasoning engine.
    id: ToolCallId,

    /// Name of the tool to invoke.
    name: String,

    /// Arguments for the tool (JSON object).
    args: serde_json::Value,
}

impl ToolCallRequest {
    /// Creates a new tool call request.
    pub fn new(
        id: impl Into<ToolCallId>,
        name: impl Into<String>,
        args: serde_json::Value,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            args,
        }
    }

    /// Returns the call id.
    pub fn id(&self) -> &ToolCallId {
        &self.id
    }

    /// Returns the tool name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the arguments.
    pub fn args(&self) -> &serde_json::Value {
        &self.args
    }
}

impl From<&str> for ToolCallId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ToolCallId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}
