//! Tool Registry - Fixed tool table and batch execution.
//!
//! Maps the declared tool names to the two connectors, validates arguments
//! against each tool's parameter schema before dispatch, and executes
//! batches with partial-failure isolation: one call's failure never cancels
//! its siblings, and every issued call gets exactly one result.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tracing::debug;

use crate::domain::agent::tools::{
    ParameterType, ToolCallRequest, ToolDefinition, ToolErrorKind, ToolResult,
};
use crate::domain::foundation::GuideId;
use crate::ports::{ConnectorError, Guide, KnowledgeConnector, SearchConnector};

/// Device search against the verified manual source.
pub const SEARCH_DEVICE: &str = "search_device";
/// Guide listing for a device title.
pub const LIST_GUIDES: &str = "list_guides";
/// Full step retrieval for one guide.
pub const GET_REPAIR_STEPS: &str = "get_repair_steps";
/// Open web search, available only on the fallback path.
pub const WEB_SEARCH: &str = "web_search";

/// Central registry for the agent's tools.
///
/// The supported tools and their connector mapping are fixed and declared
/// once at startup; unknown names fail without contacting any connector.
pub struct ToolRegistry {
    knowledge: Arc<dyn KnowledgeConnector>,
    search: Arc<dyn SearchConnector>,
    definitions: HashMap<String, ToolDefinition>,
    call_timeout: Duration,
}

impl ToolRegistry {
    /// Creates the registry with its fixed tool table.
    pub fn new(
        knowledge: Arc<dyn KnowledgeConnector>,
        search: Arc<dyn SearchConnector>,
        call_timeout: Duration,
    ) -> Self {
        let mut definitions = HashMap::new();

        definitions.insert(
            SEARCH_DEVICE.to_string(),
            ToolDefinition::new(
                SEARCH_DEVICE,
                "Search the verified manual source for a device matching a user query.",
            )
            .with_parameter("query", ParameterType::String, "Device search query", true),
        );
        definitions.insert(
            LIST_GUIDES.to_string(),
            ToolDefinition::new(
                LIST_GUIDES,
                "List available repair guides for a specific device title.",
            )
            .with_parameter(
                "device_title",
                ParameterType::String,
                "Canonical device title from search_device",
                true,
            ),
        );
        definitions.insert(
            GET_REPAIR_STEPS.to_string(),
            ToolDefinition::new(
                GET_REPAIR_STEPS,
                "Retrieve full step-by-step instructions and images for a guide.",
            )
            .with_parameter("guide_id", ParameterType::Integer, "Guide id", true),
        );
        definitions.insert(
            WEB_SEARCH.to_string(),
            ToolDefinition::new(
                WEB_SEARCH,
                "Search the open web for community repair solutions with citations.",
            )
            .with_parameter("query", ParameterType::String, "Search query", true),
        );

        Self {
            knowledge,
            search,
            definitions,
            call_timeout,
        }
    }

    /// Tools declared to the engine on the verified path.
    pub fn knowledge_tools(&self) -> Vec<ToolDefinition> {
        [SEARCH_DEVICE, LIST_GUIDES, GET_REPAIR_STEPS]
            .iter()
            .filter_map(|name| self.definitions.get(*name).cloned())
            .collect()
    }

    /// Tools declared to the engine on the fallback path.
    pub fn fallback_tools(&self) -> Vec<ToolDefinition> {
        self.definitions
            .get(WEB_SEARCH)
            .cloned()
            .into_iter()
            .collect()
    }

    /// Checks if a tool is registered.
    pub fn has_tool(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    /// Gets a tool definition by name.
    pub fn get_tool(&self, name: &str) -> Option<&ToolDefinition> {
        self.definitions.get(name)
    }

    /// Returns true if the tool reads from the verified manual source.
    pub fn is_knowledge_tool(name: &str) -> bool {
        matches!(name, SEARCH_DEVICE | LIST_GUIDES | GET_REPAIR_STEPS)
    }

    /// Executes one call, converting every failure into a result.
    pub async fn execute(&self, call: &ToolCallRequest) -> ToolResult {
        let Some(definition) = self.definitions.get(call.name()) else {
            return ToolResult::failure(call.id().clone(), call.name(), ToolErrorKind::UnknownTool);
        };

        if let Err(err) = definition.validate_args(call.args()) {
            debug!(tool = call.name(), %err, "tool arguments rejected");
            return ToolResult::failure(
                call.id().clone(),
                call.name(),
                ToolErrorKind::InvalidArguments,
            );
        }

        let dispatched = tokio::time::timeout(self.call_timeout, self.dispatch(call));
        match dispatched.await {
            Ok(Ok(payload)) => ToolResult::success(call.id().clone(), call.name(), payload),
            Ok(Err(err)) => {
                debug!(tool = call.name(), %err, "connector call failed");
                let kind = if err.is_timeout() {
                    ToolErrorKind::ConnectorTimeout
                } else {
                    ToolErrorKind::ConnectorUnavailable
                };
                ToolResult::failure(call.id().clone(), call.name(), kind)
            }
            Err(_elapsed) => ToolResult::failure(
                call.id().clone(),
                call.name(),
                ToolErrorKind::ConnectorTimeout,
            ),
        }
    }

    /// Executes a batch concurrently, preserving request order.
    ///
    /// All results are collected before the batch is folded back into the
    /// conversation; calls are isolated from each other's failures.
    pub async fn execute_batch(&self, calls: &[ToolCallRequest]) -> Vec<ToolResult> {
        join_all(calls.iter().map(|call| self.execute(call))).await
    }

    async fn dispatch(&self, call: &ToolCallRequest) -> Result<serde_json::Value, ConnectorError> {
        match call.name() {
            SEARCH_DEVICE => {
                let query = string_arg(call, "query")?;
                let hits = self.knowledge.search_device(&query).await?;
                serde_json::to_value(hits).map_err(|e| ConnectorError::protocol(e.to_string()))
            }
            LIST_GUIDES => {
                let title = string_arg(call, "device_title")?;
                let guides = self.knowledge.list_guides(&title).await?;
                serde_json::to_value(guides).map_err(|e| ConnectorError::protocol(e.to_string()))
            }
            GET_REPAIR_STEPS => {
                let guide_id = guide_id_arg(call)?;
                match self.knowledge.get_guide_steps(guide_id).await? {
                    Some(guide) => Ok(render_guide(&guide)),
                    None => Ok(serde_json::Value::Null),
                }
            }
            WEB_SEARCH => {
                let query = string_arg(call, "query")?;
                let answer = self.search.web_search(&query).await?;
                serde_json::to_value(answer).map_err(|e| ConnectorError::protocol(e.to_string()))
            }
            // Unknown names are rejected before dispatch.
            other => Err(ConnectorError::protocol(format!("unroutable tool {other}"))),
        }
    }
}

/// Renders a guide into the payload fed back to the engine.
///
/// Deterministic: identical guides always produce identical output.
fn render_guide(guide: &Guide) -> serde_json::Value {
    let steps: Vec<String> = guide
        .steps
        .iter()
        .enumerate()
        .map(|(i, step)| match &step.image_url {
            Some(url) => format!("Step {}: {} [Image: {}]", i + 1, step.text, url),
            None => format!("Step {}: {}", i + 1, step.text),
        })
        .collect();

    serde_json::json!({
        "title": guide.title,
        "steps": steps,
        "url": guide.url,
    })
}

fn string_arg(call: &ToolCallRequest, name: &str) -> Result<String, ConnectorError> {
    call.args()
        .get(name)
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| ConnectorError::protocol(format!("missing argument {name}")))
}

fn guide_id_arg(call: &ToolCallRequest) -> Result<GuideId, ConnectorError> {
    let value = call
        .args()
        .get("guide_id")
        .ok_or_else(|| ConnectorError::protocol("missing argument guide_id"))?;

    if let Some(id) = value.as_u64() {
        return Ok(GuideId::new(id));
    }
    value
        .as_str()
        .and_then(|s| s.parse::<u64>().ok())
        .map(GuideId::new)
        .ok_or_else(|| ConnectorError::protocol("guide_id is not numeric"))
}
