//! Agent orchestration core: the bounded tool loop, the fixed tool table,
//! and bounded-context management.

mod context_manager;
mod orchestrator;
mod tool_registry;

pub use context_manager::{ContextError, ContextManager, DEFAULT_MAX_RECENT};
pub use orchestrator::{AgentOrchestrator, OrchestratorConfig, TurnError, TurnRequest};
pub use tool_registry::{
    ToolRegistry, GET_REPAIR_STEPS, LIST_GUIDES, SEARCH_DEVICE, WEB_SEARCH,
};
