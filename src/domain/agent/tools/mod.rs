//! Tool value objects: call requests, results, and declarations.

mod tool_call;
mod tool_definition;
mod tool_result;

pub use tool_call::{ToolCallId, ToolCallRequest};
pub use tool_definition::{ParameterType, ToolDefinition, ToolParameter};
pub use tool_result::{ToolErrorKind, ToolResult};
