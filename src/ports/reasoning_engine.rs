//! Reasoning Engine Port - Interface for the language-model backend.
//!
//! Abstracts all reasoning calls behind one trait so the orchestrator can
//! run against any provider or a test double. A call takes bounded history
//! plus declared tool schemas and returns a tagged `TurnOutcome`; the
//! engine never executes tools itself.
//!
//! # Design
//!
//! - Every outcome branch (final text, tool batch, clarification) is an
//!   explicit variant, handled exhaustively by the caller
//! - Metered token usage is reported when the provider exposes it; callers
//!   fall back to heuristic cost constants otherwise
//! - Streaming is supported but carries the same terminal outcome semantics

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

use crate::domain::agent::tools::ToolDefinition;
use crate::domain::agent::TurnOutcome;
use crate::domain::foundation::{SessionId, UserId};

/// Port for reasoning-engine invocations.
#[async_trait]
pub trait ReasoningEngine: Send + Sync {
    /// Runs one reasoning call and returns its tagged outcome.
    async fn generate(&self, request: GenerationRequest) -> Result<EngineReply, EngineError>;

    /// Streaming variant: emits incremental text chunks, terminating in a
    /// final chunk that carries the same `TurnOutcome` semantics.
    async fn stream_generate(
        &self,
        request: GenerationRequest,
    ) -> Result<Pin<Box<dyn Stream<Item = Result<StreamChunk, EngineError>> + Send>>, EngineError>;

    /// Plain text completion without tools.
    ///
    /// Used by the context manager for summarization calls.
    async fn complete_text(&self, prompt: &str) -> Result<String, EngineError>;

    /// Engine information (provider name, model).
    fn engine_info(&self) -> EngineInfo;
}

/// A chat message in provider-neutral form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Who produced this message.
    pub role: ChatRole,
    /// Message content.
    pub content: String,
}

impl ChatMessage {
    /// Creates a new chat message.
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Creates a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(ChatRole::System, content)
    }

    /// Creates a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(ChatRole::User, content)
    }

    /// Creates an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(ChatRole::Assistant, content)
    }

    /// Creates a tool-result message.
    pub fn tool(content: impl Into<String>) -> Self {
        Self::new(ChatRole::Tool, content)
    }
}

/// Role of a chat message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// System instructions.
    System,
    /// User input.
    User,
    /// Engine output.
    Assistant,
    /// Combined tool results fed back to the engine.
    Tool,
}

/// Request for one reasoning call.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Bounded conversation history plus the current user message.
    pub messages: Vec<ChatMessage>,
    /// System prompt guiding engine behavior.
    pub system_prompt: Option<String>,
    /// Tools the engine may request this round.
    pub tools: Vec<ToolDefinition>,
    /// Maximum tokens to generate.
    pub max_tokens: Option<u32>,
    /// Temperature for response randomness.
    pub temperature: Option<f32>,
    /// Request metadata for tracing.
    pub metadata: RequestMetadata,
}

impl GenerationRequest {
    /// Creates a new request with required metadata.
    pub fn new(metadata: RequestMetadata) -> Self {
        Self {
            messages: Vec::new(),
            system_prompt: None,
            tools: Vec::new(),
            max_tokens: None,
            temperature: None,
            metadata,
        }
    }

    /// Adds a message to the conversation.
    pub fn with_message(mut self, role: ChatRole, content: impl Into<String>) -> Self {
        self.messages.push(ChatMessage::new(role, content));
        self
    }

    /// Replaces the message list.
    pub fn with_messages(mut self, messages: Vec<ChatMessage>) -> Self {
        self.messages = messages;
        self
    }

    /// Sets the system prompt.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Declares the tools available this round.
    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }

    /// Sets the maximum tokens to generate.
    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    /// Sets the temperature.
    pub fn with_temperature(mut self, temp: f32) -> Self {
        self.temperature = Some(temp);
        self
    }
}

/// Request metadata for tracing.
#[derive(Debug, Clone)]
pub struct RequestMetadata {
    /// User the turn belongs to.
    pub user_id: UserId,
    /// Session containing the turn.
    pub session_id: SessionId,
    /// Trace ID for distributed tracing.
    pub trace_id: String,
}

impl RequestMetadata {
    /// Creates new request metadata.
    pub fn new(user_id: UserId, session_id: SessionId, trace_id: impl Into<String>) -> Self {
        Self {
            user_id,
            session_id,
            trace_id: trace_id.into(),
        }
    }
}

/// Reply from one reasoning call.
#[derive(Debug, Clone)]
pub struct EngineReply {
    /// The tagged outcome of the call.
    pub outcome: TurnOutcome,
    /// Metered token usage, when the provider reports it.
    pub usage: Option<TokenUsage>,
    /// Model that produced the reply.
    pub model: String,
}

impl EngineReply {
    /// Creates a reply without metered usage.
    pub fn new(outcome: TurnOutcome, model: impl Into<String>) -> Self {
        Self {
            outcome,
            usage: None,
            model: model.into(),
        }
    }

    /// Attaches metered usage.
    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = Some(usage);
        self
    }
}

/// Metered token usage for one call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Tokens in the prompt.
    pub prompt_tokens: u32,
    /// Tokens in the completion.
    pub completion_tokens: u32,
    /// Total tokens (prompt + completion).
    pub total_tokens: u32,
}

impl TokenUsage {
    /// Creates new token usage.
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

/// Streaming chunk from a reasoning call.
#[derive(Debug, Clone)]
pub struct StreamChunk {
    /// New text in this chunk.
    pub delta: String,
    /// Present only on the final chunk.
    pub outcome: Option<TurnOutcome>,
    /// Metered usage (only present on the final chunk, when reported).
    pub usage: Option<TokenUsage>,
}

impl StreamChunk {
    /// Creates a content chunk.
    pub fn content(delta: impl Into<String>) -> Self {
        Self {
            delta: delta.into(),
            outcome: None,
            usage: None,
        }
    }

    /// Creates the final chunk carrying the turn outcome.
    pub fn final_chunk(outcome: TurnOutcome, usage: Option<TokenUsage>) -> Self {
        Self {
            delta: String::new(),
            outcome: Some(outcome),
            usage,
        }
    }

    /// Returns true if this is the final chunk.
    pub fn is_final(&self) -> bool {
        self.outcome.is_some()
    }
}

/// Engine information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineInfo {
    /// Provider name (e.g., "anthropic", "mock").
    pub provider: String,
    /// Model identifier.
    pub model: String,
}

impl EngineInfo {
    /// Creates new engine info.
    pub fn new(provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
        }
    }
}

/// Reasoning-engine errors.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Request timed out.
    #[error("reasoning call timed out after {timeout_secs}s")]
    Timeout {
        /// Configured timeout.
        timeout_secs: u32,
    },

    /// Rate limited by provider.
    #[error("rate limited: retry after {retry_after_secs}s")]
    RateLimited {
        /// Seconds until retry is allowed.
        retry_after_secs: u32,
    },

    /// Provider is unavailable.
    #[error("engine unavailable: {message}")]
    Unavailable {
        /// Error details.
        message: String,
    },

    /// API key or authentication failed.
    #[error("authentication failed")]
    AuthenticationFailed,

    /// Network error during request.
    #[error("network error: {0}")]
    Network(String),

    /// Failed to parse the provider response.
    #[error("parse error: {0}")]
    Parse(String),

    /// Invalid request configuration.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl EngineError {
    /// Creates an unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Creates a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    /// Creates a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }

    /// Returns true if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            EngineError::Timeout { .. }
                | EngineError::RateLimited { .. }
                | EngineError::Unavailable { .. }
                | EngineError::Network(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_metadata() -> RequestMetadata {
        RequestMetadata::new(UserId::new("test-user").unwrap(), SessionId::new(), "trace-1")
    }

    #[test]
    fn generation_request_builder_works() {
        let request = GenerationRequest::new(test_metadata())
            .with_message(ChatRole::User, "My controller drifts")
            .with_system_prompt("You are a repair assistant")
            .with_max_tokens(1024)
            .with_temperature(0.2);

        assert_eq!(request.messages.len(), 1);
        assert_eq!(request.messages[0].role, ChatRole::User);
        assert_eq!(request.system_prompt.as_deref(), Some("You are a repair assistant"));
        assert_eq!(request.max_tokens, Some(1024));
        assert_eq!(request.temperature, Some(0.2));
    }

    #[test]
    fn chat_message_constructors_set_role() {
        assert_eq!(ChatMessage::system("s").role, ChatRole::System);
        assert_eq!(ChatMessage::user("u").role, ChatRole::User);
        assert_eq!(ChatMessage::assistant("a").role, ChatRole::Assistant);
        assert_eq!(ChatMessage::tool("t").role, ChatRole::Tool);
    }

    #[test]
    fn token_usage_calculates_total() {
        let usage = TokenUsage::new(100, 40);
        assert_eq!(usage.total_tokens, 140);
    }

    #[test]
    fn stream_chunk_content_is_not_final() {
        let chunk = StreamChunk::content("Step 1");
        assert!(!chunk.is_final());
        assert!(chunk.usage.is_none());
    }

    #[test]
    fn stream_chunk_final_carries_outcome() {
        let chunk = StreamChunk::final_chunk(
            TurnOutcome::FinalAnswer {
                text: "done".to_string(),
            },
            Some(TokenUsage::new(10, 5)),
        );
        assert!(chunk.is_final());
        assert!(chunk.usage.is_some());
    }

    #[test]
    fn retryable_classification() {
        assert!(EngineError::Timeout { timeout_secs: 30 }.is_retryable());
        assert!(EngineError::RateLimited { retry_after_secs: 5 }.is_retryable());
        assert!(EngineError::unavailable("down").is_retryable());
        assert!(EngineError::network("reset").is_retryable());

        assert!(!EngineError::AuthenticationFailed.is_retryable());
        assert!(!EngineError::parse("bad json").is_retryable());
        assert!(!EngineError::InvalidRequest("empty".to_string()).is_retryable());
    }

    #[test]
    fn chat_role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&ChatRole::Tool).unwrap(), "\"tool\"");
    }
}
