//! Orchestrator - The per-turn agent state machine.
//!
//! Drives one user message to one annotated answer:
//! reasoning → (tool batch → reasoning)* → fallback-if-needed → safety scan.
//! The tool loop is bounded, fallback search runs at most once per turn, and
//! per-call failures are fed back to the engine as data instead of aborting
//! the turn. Turns on the same session are serialized; distinct sessions run
//! fully independently.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use thiserror::Error;
use tokio::time::timeout;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::agent::tools::{ToolErrorKind, ToolResult};
use crate::domain::agent::{AgentResponse, SafetyClassifier, SourceTag, TurnOutcome};
use crate::domain::conversation::{Message, Role};
use crate::domain::foundation::{SessionId, UserId};
use crate::ports::{
    ChatMessage, ChatRole, GenerationRequest, ReasoningEngine, RequestMetadata, TokenUsage,
    UsageRecord, UsageTracker,
};

use super::context_manager::{ContextError, ContextManager};
use super::tool_registry::{ToolRegistry, WEB_SEARCH};

/// System prompt for the verified path.
const VERIFIED_SYSTEM_PROMPT: &str = "\
You are FixMaster, an autonomous repair assistant.
1. Use 'search_device' to find the device.
2. Use 'list_guides' to see repair options.
3. Use 'get_repair_steps' for full instructions.
Always prefer verified guide data and never invent repair steps.
If the manual source has no documentation, state clearly that it was not found.
Warn about high-voltage and gas risks first.
Format instructions as numbered Markdown steps and include image URLs when tools provide them.";

/// System prompt for the one-shot fallback path.
const FALLBACK_SYSTEM_PROMPT: &str = "\
Verified repair documentation was not found for this request.
Use 'web_search' once to find community repair solutions, then answer from the results and cite their sources.
Never invent repair steps. Warn about high-voltage and gas risks first.";

/// Generic apology for turns that exhausted both paths.
const APOLOGY: &str = "Repair protocol interrupted. Please try again.";

/// Case-insensitive marker of a verified answer that found nothing.
const NOT_FOUND_SENTINEL: &str = "not found";

/// Limits and cost constants for the agent loop.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Maximum tool rounds per turn.
    pub max_iterations: u32,
    /// Timeout applied to each reasoning call.
    pub engine_timeout: Duration,
    /// Heuristic base cost of a verified turn, in tokens.
    pub base_cost_tokens: u32,
    /// Heuristic per-round increment, in tokens.
    pub round_cost_tokens: u32,
    /// Heuristic flat cost of a fallback turn, in tokens.
    pub fallback_cost_tokens: u32,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_iterations: 3,
            engine_timeout: Duration::from_secs(60),
            base_cost_tokens: 1200,
            round_cost_tokens: 300,
            fallback_cost_tokens: 2200,
        }
    }
}

/// One incoming turn: a user message addressed to a session.
#[derive(Debug, Clone)]
pub struct TurnRequest {
    /// Session the message belongs to.
    pub session_id: SessionId,
    /// User sending the message.
    pub user_id: UserId,
    /// The message content.
    pub message: String,
}

impl TurnRequest {
    /// Creates a new turn request.
    pub fn new(session_id: SessionId, user_id: UserId, message: impl Into<String>) -> Self {
        Self {
            session_id,
            user_id,
            message: message.into(),
        }
    }
}

/// Errors that reach the caller.
///
/// Engine failures and exhausted paths do not appear here; they produce
/// zero-cost apology responses instead.
#[derive(Debug, Error)]
pub enum TurnError {
    /// Message content is empty or whitespace only.
    #[error("Validation error: message content cannot be empty")]
    EmptyMessage,

    /// Context manager or session store failure.
    #[error("Context error: {0}")]
    Context(String),
}

impl From<ContextError> for TurnError {
    fn from(err: ContextError) -> Self {
        TurnError::Context(err.to_string())
    }
}

/// Accumulates metered token usage across the calls of one turn.
///
/// Heuristic constants apply only when at least one call went unmetered;
/// a fully metered turn is charged exactly what the engine reported.
#[derive(Debug, Default)]
struct CostAccumulator {
    metered_total: u32,
    observed_calls: u32,
    unmetered_calls: u32,
}

impl CostAccumulator {
    fn observe(&mut self, usage: Option<TokenUsage>) {
        self.observed_calls += 1;
        match usage {
            Some(usage) => self.metered_total += usage.total_tokens,
            None => self.unmetered_calls += 1,
        }
    }

    fn estimate(&self, source: SourceTag, rounds: u32, config: &OrchestratorConfig) -> u32 {
        if self.observed_calls > 0 && self.unmetered_calls == 0 {
            return self.metered_total;
        }
        match source {
            SourceTag::Verified => {
                config.base_cost_tokens + rounds * config.round_cost_tokens
            }
            SourceTag::Fallback => config.fallback_cost_tokens,
        }
    }
}

/// Drives the bounded tool-calling loop for every turn.
///
/// All collaborators are injected, so tests substitute doubles for the
/// engine and both connectors.
pub struct AgentOrchestrator {
    engine: Arc<dyn ReasoningEngine>,
    registry: Arc<ToolRegistry>,
    context: Arc<ContextManager>,
    usage: Arc<dyn UsageTracker>,
    safety: SafetyClassifier,
    config: OrchestratorConfig,
    turn_locks: Mutex<HashMap<SessionId, Arc<tokio::sync::Mutex<()>>>>,
}

impl AgentOrchestrator {
    /// Creates an orchestrator over injected collaborators.
    pub fn new(
        engine: Arc<dyn ReasoningEngine>,
        registry: Arc<ToolRegistry>,
        context: Arc<ContextManager>,
        usage: Arc<dyn UsageTracker>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            engine,
            registry,
            context,
            usage,
            safety: SafetyClassifier::new(),
            config,
            turn_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Processes one turn from user message to annotated answer.
    pub async fn process_turn(&self, request: TurnRequest) -> Result<AgentResponse, TurnError> {
        if request.message.trim().is_empty() {
            return Err(TurnError::EmptyMessage);
        }

        // One turn in flight per session; later turns queue here.
        let lock = self.turn_lock(request.session_id);
        let _serialized = lock.lock().await;

        let trace_id = Uuid::new_v4().to_string();
        info!(session = %request.session_id, trace = %trace_id, "turn started");

        let user_message =
            Message::user(&request.message).map_err(|e| TurnError::Context(e.to_string()))?;
        self.context.append(request.session_id, user_message).await?;

        let metadata =
            RequestMetadata::new(request.user_id.clone(), request.session_id, trace_id);

        let mut tools_used: Vec<String> = Vec::new();
        let mut rounds: u32 = 0;
        let mut verified_empty = false;
        let mut costs = CostAccumulator::default();

        let verified_answer: Option<String> = loop {
            let history = self.context.bounded_history(request.session_id).await?;
            let generation = GenerationRequest::new(metadata.clone())
                .with_messages(to_chat_messages(&history))
                .with_system_prompt(VERIFIED_SYSTEM_PROMPT)
                .with_tools(self.registry.knowledge_tools());

            let reply = match timeout(self.config.engine_timeout, self.engine.generate(generation))
                .await
            {
                Ok(Ok(reply)) => reply,
                Ok(Err(err)) => {
                    warn!(session = %request.session_id, %err, "reasoning call failed, aborting turn");
                    self.record_usage(&request, SourceTag::Verified, rounds, 0).await;
                    return Ok(AgentResponse::failed(APOLOGY, SourceTag::Verified, tools_used));
                }
                Err(_) => {
                    warn!(session = %request.session_id, "reasoning call timed out, aborting turn");
                    self.record_usage(&request, SourceTag::Verified, rounds, 0).await;
                    return Ok(AgentResponse::failed(APOLOGY, SourceTag::Verified, tools_used));
                }
            };
            costs.observe(reply.usage);

            match reply.outcome {
                TurnOutcome::Clarification { question } => {
                    // Relayed directly; the loop ends and no tools are consumed.
                    debug!(session = %request.session_id, "engine asked for clarification");
                    let message = Message::assistant(&question)
                        .map_err(|e| TurnError::Context(e.to_string()))?;
                    self.context.append(request.session_id, message).await?;

                    let report = self.safety.classify(&question);
                    let estimated = costs.estimate(SourceTag::Verified, rounds, &self.config);
                    self.record_usage(&request, SourceTag::Verified, rounds, estimated).await;
                    return Ok(AgentResponse::new(
                        question,
                        SourceTag::Verified,
                        tools_used,
                        report.level,
                        estimated,
                    ));
                }
                TurnOutcome::ToolBatch { calls } => {
                    rounds += 1;
                    debug!(
                        session = %request.session_id,
                        round = rounds,
                        batch = calls.len(),
                        "executing tool batch"
                    );

                    let results = self.registry.execute_batch(&calls).await;
                    for result in &results {
                        tools_used.push(result.tool_name().to_string());
                        if ToolRegistry::is_knowledge_tool(result.tool_name())
                            && result.is_empty_payload()
                        {
                            verified_empty = true;
                        }
                    }

                    if !results.is_empty() {
                        let body = results
                            .iter()
                            .map(ToolResult::render)
                            .collect::<Vec<_>>()
                            .join("\n");
                        let message =
                            Message::tool(body).map_err(|e| TurnError::Context(e.to_string()))?;
                        self.context.append(request.session_id, message).await?;
                    }

                    if rounds >= self.config.max_iterations {
                        debug!(session = %request.session_id, "iteration limit reached");
                        break None;
                    }
                }
                TurnOutcome::FinalAnswer { text } => break Some(text),
            }
        };

        let (text, source) = match verified_answer {
            Some(text) if !needs_fallback(&text, verified_empty) => (text, SourceTag::Verified),
            _ => {
                match self
                    .run_fallback(request.session_id, &metadata, &mut tools_used, &mut costs)
                    .await?
                {
                    Some(text) => (text, SourceTag::Fallback),
                    None => {
                        info!(session = %request.session_id, "both paths exhausted");
                        self.record_usage(&request, SourceTag::Fallback, rounds, 0).await;
                        return Ok(AgentResponse::failed(APOLOGY, SourceTag::Fallback, tools_used));
                    }
                }
            }
        };

        let message = Message::assistant(&text).map_err(|e| TurnError::Context(e.to_string()))?;
        self.context.append(request.session_id, message).await?;

        let report = self.safety.classify(&text);
        let estimated = costs.estimate(source, rounds, &self.config);
        self.record_usage(&request, source, rounds, estimated).await;

        info!(
            session = %request.session_id,
            source = ?source,
            rounds,
            safety = ?report.level,
            tokens = estimated,
            "turn completed"
        );
        Ok(AgentResponse::new(text, source, tools_used, report.level, estimated))
    }

    /// Runs the one-shot fallback sequence.
    ///
    /// One fresh reasoning call with only the web-search tool; at most one
    /// tool round, then one closing call. `None` means both paths failed.
    async fn run_fallback(
        &self,
        session_id: SessionId,
        metadata: &RequestMetadata,
        tools_used: &mut Vec<String>,
        costs: &mut CostAccumulator,
    ) -> Result<Option<String>, TurnError> {
        info!(session = %session_id, "verified path exhausted, falling back to web search");

        let history = self.context.bounded_history(session_id).await?;
        let generation = GenerationRequest::new(metadata.clone())
            .with_messages(to_chat_messages(&history))
            .with_system_prompt(FALLBACK_SYSTEM_PROMPT)
            .with_tools(self.registry.fallback_tools());

        let reply = match timeout(self.config.engine_timeout, self.engine.generate(generation)).await
        {
            Ok(Ok(reply)) => reply,
            Ok(Err(err)) => {
                warn!(session = %session_id, %err, "fallback reasoning call failed");
                return Ok(None);
            }
            Err(_) => {
                warn!(session = %session_id, "fallback reasoning call timed out");
                return Ok(None);
            }
        };
        costs.observe(reply.usage);

        let calls = match reply.outcome {
            TurnOutcome::FinalAnswer { text } if !text.trim().is_empty() => {
                return Ok(Some(text));
            }
            TurnOutcome::FinalAnswer { .. } => return Ok(None),
            TurnOutcome::Clarification { question } => return Ok(Some(question)),
            TurnOutcome::ToolBatch { calls } => calls,
        };

        // Search runs once per turn; dispatch the first web_search call
        // and mark any sibling as spent.
        let mut results = Vec::with_capacity(calls.len());
        let mut searched = false;
        for call in &calls {
            if call.name() == WEB_SEARCH && !searched {
                searched = true;
                let result = self.registry.execute(call).await;
                tools_used.push(result.tool_name().to_string());
                results.push(result);
            } else {
                results.push(ToolResult::failure(
                    call.id().clone(),
                    call.name(),
                    ToolErrorKind::ConnectorUnavailable,
                ));
            }
        }

        let any_success = results.iter().any(ToolResult::is_success);
        if !results.is_empty() {
            let body = results
                .iter()
                .map(ToolResult::render)
                .collect::<Vec<_>>()
                .join("\n");
            let message = Message::tool(body).map_err(|e| TurnError::Context(e.to_string()))?;
            self.context.append(session_id, message).await?;
        }

        if !any_success {
            return Ok(None);
        }

        let history = self.context.bounded_history(session_id).await?;
        let closing = GenerationRequest::new(metadata.clone())
            .with_messages(to_chat_messages(&history))
            .with_system_prompt(FALLBACK_SYSTEM_PROMPT);

        let reply = match timeout(self.config.engine_timeout, self.engine.generate(closing)).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(err)) => {
                warn!(session = %session_id, %err, "fallback closing call failed");
                return Ok(None);
            }
            Err(_) => {
                warn!(session = %session_id, "fallback closing call timed out");
                return Ok(None);
            }
        };
        costs.observe(reply.usage);

        match reply.outcome {
            TurnOutcome::FinalAnswer { text } if !text.trim().is_empty() => Ok(Some(text)),
            _ => Ok(None),
        }
    }

    /// Emits the turn's usage record; accounting failures never fail turns.
    async fn record_usage(&self, request: &TurnRequest, source: SourceTag, rounds: u32, tokens: u32) {
        let record = UsageRecord::new(
            request.user_id.clone(),
            request.session_id,
            self.engine.engine_info().model,
            source,
            rounds,
            tokens,
        );
        if let Err(err) = self.usage.record_usage(record).await {
            warn!(session = %request.session_id, %err, "usage recording failed");
        }
    }

    fn turn_lock(&self, session_id: SessionId) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.turn_locks.lock().unwrap();
        locks
            .entry(session_id)
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }
}

/// Returns true if the verified answer must be replaced by fallback.
fn needs_fallback(text: &str, verified_empty: bool) -> bool {
    verified_empty || text.trim().is_empty() || text.to_lowercase().contains(NOT_FOUND_SENTINEL)
}

fn to_chat_messages(history: &[Message]) -> Vec<ChatMessage> {
    history
        .iter()
        .map(|message| {
            let role = match message.role() {
                Role::System => ChatRole::System,
                Role::User => ChatRole::User,
                Role::Assistant => ChatRole::Assistant,
                Role::Tool => ChatRole::Tool,
            };
            ChatMessage::new(role, message.content())
        })
        .collect()
}
