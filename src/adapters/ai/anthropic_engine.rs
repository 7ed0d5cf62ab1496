//! Anthropic Engine - Implementation of ReasoningEngine for the Messages API.
//!
//! Declares the agent's tools in Anthropic's tool-use format, maps
//! `tool_use` content blocks to `TurnOutcome::ToolBatch`, and reserves a
//! `request_clarification` tool so the model has a structured channel for
//! clarification questions.
//!
//! # Configuration
//!
//! ```ignore
//! let config = AnthropicConfig::new(api_key)
//!     .with_model("claude-sonnet-4-20250514")
//!     .with_base_url("https://api.anthropic.com");
//!
//! let engine = AnthropicEngine::new(config);
//! ```
//!
//! # Streaming
//!
//! Uses Server-Sent Events with Anthropic's event format. Text deltas are
//! forwarded as they arrive; tool-use blocks are assembled across
//! `content_block_start`/`input_json_delta` events and surfaced in the
//! final chunk's `TurnOutcome`.

use async_trait::async_trait;
use futures::stream::{self, Stream, StreamExt};
use reqwest::{Client, Response};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use std::time::Duration;
use tokio::time::sleep;

use crate::domain::agent::tools::ToolCallRequest;
use crate::domain::agent::TurnOutcome;
use crate::ports::{
    ChatRole, EngineError, EngineInfo, EngineReply, GenerationRequest, ReasoningEngine,
    StreamChunk, TokenUsage,
};

/// Anthropic API version header value.
const ANTHROPIC_API_VERSION: &str = "2023-06-01";

/// Reserved tool giving the model a structured clarification channel.
const CLARIFICATION_TOOL: &str = "request_clarification";

/// Configuration for the Anthropic engine.
#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    /// API key for authentication.
    api_key: Secret<String>,
    /// Model to use.
    pub model: String,
    /// Base URL for the API (default: https://api.anthropic.com).
    pub base_url: String,
    /// Request timeout.
    pub timeout: Duration,
    /// Maximum retries on transient failures.
    pub max_retries: u32,
}

impl AnthropicConfig {
    /// Creates a new configuration with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Secret::new(api_key.into()),
            model: "claude-sonnet-4-20250514".to_string(),
            base_url: "https://api.anthropic.com".to_string(),
            timeout: Duration::from_secs(60),
            max_retries: 3,
        }
    }

    /// Sets the model to use.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the maximum retry count.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }
}

/// Anthropic Messages API engine implementation.
pub struct AnthropicEngine {
    config: AnthropicConfig,
    client: Client,
}

impl AnthropicEngine {
    /// Creates a new engine with the given configuration.
    pub fn new(config: AnthropicConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self { config, client }
    }

    fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.config.base_url)
    }

    /// Converts a generation request to Anthropic's wire format.
    fn to_anthropic_request(&self, request: &GenerationRequest, stream: bool) -> AnthropicRequest {
        let mut messages = Vec::new();

        for msg in &request.messages {
            let role = match msg.role {
                // System content travels in the dedicated field.
                ChatRole::System => continue,
                ChatRole::User => "user",
                ChatRole::Assistant => "assistant",
                // Tool turns are replayed as user content; the combined
                // results were already rendered to text by the orchestrator.
                ChatRole::Tool => "user",
            };
            messages.push(AnthropicMessage {
                role: role.to_string(),
                content: msg.content.clone(),
            });
        }

        // Fold history-resident system messages (the rolling summary) into
        // the system field alongside the instruction prompt.
        let mut system_parts: Vec<String> = Vec::new();
        if let Some(prompt) = &request.system_prompt {
            system_parts.push(prompt.clone());
        }
        for msg in &request.messages {
            if msg.role == ChatRole::System {
                system_parts.push(msg.content.clone());
            }
        }
        let system = if system_parts.is_empty() {
            None
        } else {
            Some(system_parts.join("\n\n"))
        };

        let mut tools: Vec<serde_json::Value> = request
            .tools
            .iter()
            .map(|tool| tool.to_anthropic_format())
            .collect();
        if !tools.is_empty() {
            tools.push(clarification_tool_schema());
        }

        AnthropicRequest {
            model: self.config.model.clone(),
            messages,
            system,
            max_tokens: request.max_tokens.unwrap_or(4096),
            temperature: request.temperature,
            stream: Some(stream),
            tools,
        }
    }

    async fn send_request(
        &self,
        body: &AnthropicRequest,
    ) -> Result<Response, EngineError> {
        self.client
            .post(self.messages_url())
            .header("x-api-key", self.config.api_key())
            .header("anthropic-version", ANTHROPIC_API_VERSION)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    EngineError::Timeout {
                        timeout_secs: self.config.timeout.as_secs() as u32,
                    }
                } else if e.is_connect() {
                    EngineError::network(format!("Connection failed: {}", e))
                } else {
                    EngineError::network(e.to_string())
                }
            })
    }

    async fn handle_response_status(&self, response: Response) -> Result<Response, EngineError> {
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let error_body = response.text().await.unwrap_or_default();

        match status.as_u16() {
            401 => Err(EngineError::AuthenticationFailed),
            429 => Err(EngineError::RateLimited {
                retry_after_secs: parse_retry_after(&error_body),
            }),
            400 => Err(EngineError::InvalidRequest(error_body)),
            500..=599 => Err(EngineError::unavailable(format!(
                "Server error {}: {}",
                status, error_body
            ))),
            _ => Err(EngineError::network(format!(
                "Unexpected status {}: {}",
                status, error_body
            ))),
        }
    }

    async fn parse_response(&self, response: Response) -> Result<EngineReply, EngineError> {
        let response = self.handle_response_status(response).await?;

        let anthropic_response: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| EngineError::parse(format!("Failed to parse response: {}", e)))?;

        let usage = TokenUsage::new(
            anthropic_response.usage.input_tokens,
            anthropic_response.usage.output_tokens,
        );
        let model = anthropic_response.model.clone();
        let outcome = outcome_from_blocks(anthropic_response.content)?;

        Ok(EngineReply::new(outcome, model).with_usage(usage))
    }

    async fn request_with_retries(
        &self,
        body: &AnthropicRequest,
    ) -> Result<EngineReply, EngineError> {
        let mut last_error = EngineError::network("No attempts made");
        let mut retry_count = 0;

        while retry_count <= self.config.max_retries {
            match self.send_request(body).await {
                Ok(response) => match self.parse_response(response).await {
                    Ok(reply) => return Ok(reply),
                    Err(err) => {
                        if !err.is_retryable() || retry_count >= self.config.max_retries {
                            return Err(err);
                        }
                        last_error = err;
                    }
                },
                Err(err) => {
                    if !err.is_retryable() || retry_count >= self.config.max_retries {
                        return Err(err);
                    }
                    last_error = err;
                }
            }

            // Exponential backoff: 1s, 2s, 4s, ...
            let delay = Duration::from_secs(1 << retry_count);
            sleep(delay).await;
            retry_count += 1;
        }

        Err(last_error)
    }
}

#[async_trait]
impl ReasoningEngine for AnthropicEngine {
    async fn generate(&self, request: GenerationRequest) -> Result<EngineReply, EngineError> {
        let body = self.to_anthropic_request(&request, false);
        self.request_with_retries(&body).await
    }

    async fn stream_generate(
        &self,
        request: GenerationRequest,
    ) -> Result<Pin<Box<dyn Stream<Item = Result<StreamChunk, EngineError>> + Send>>, EngineError>
    {
        let body = self.to_anthropic_request(&request, true);
        let response = self.send_request(&body).await?;
        let response = self.handle_response_status(response).await?;

        let bytes_stream = response.bytes_stream();
        let mut collector = SseCollector::default();

        let stream = bytes_stream
            .map(|chunk_result| {
                chunk_result.map_err(|e| EngineError::network(format!("Stream error: {}", e)))
            })
            .map(move |chunk_result| match chunk_result {
                Ok(bytes) => collector.feed(&String::from_utf8_lossy(&bytes)),
                Err(e) => vec![Err(e)],
            })
            .flat_map(stream::iter);

        Ok(Box::pin(stream))
    }

    async fn complete_text(&self, prompt: &str) -> Result<String, EngineError> {
        let body = AnthropicRequest {
            model: self.config.model.clone(),
            messages: vec![AnthropicMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            system: None,
            max_tokens: 1024,
            temperature: Some(0.0),
            stream: Some(false),
            tools: Vec::new(),
        };

        let reply = self.request_with_retries(&body).await?;
        match reply.outcome {
            TurnOutcome::FinalAnswer { text } => Ok(text),
            other => Err(EngineError::parse(format!(
                "expected plain text, got {:?}",
                other
            ))),
        }
    }

    fn engine_info(&self) -> EngineInfo {
        EngineInfo::new("anthropic", &self.config.model)
    }
}

/// Schema of the reserved clarification tool.
fn clarification_tool_schema() -> serde_json::Value {
    serde_json::json!({
        "name": CLARIFICATION_TOOL,
        "description": "Ask the user one clarifying question when the device or problem is unclear. Use before any lookup tools.",
        "input_schema": {
            "type": "object",
            "properties": {
                "question": {
                    "type": "string",
                    "description": "The question to ask the user"
                }
            },
            "required": ["question"]
        }
    })
}

/// Maps response content blocks to a tagged turn outcome.
fn outcome_from_blocks(blocks: Vec<ContentBlock>) -> Result<TurnOutcome, EngineError> {
    let mut text_parts: Vec<String> = Vec::new();
    let mut calls: Vec<ToolCallRequest> = Vec::new();

    for block in blocks {
        match block.block_type.as_str() {
            "text" => {
                if let Some(text) = block.text {
                    text_parts.push(text);
                }
            }
            "tool_use" => {
                let id = block
                    .id
                    .ok_or_else(|| EngineError::parse("tool_use block without id"))?;
                let name = block
                    .name
                    .ok_or_else(|| EngineError::parse("tool_use block without name"))?;
                let input = block.input.unwrap_or(serde_json::json!({}));

                if name == CLARIFICATION_TOOL {
                    let question = input
                        .get("question")
                        .and_then(|q| q.as_str())
                        .unwrap_or("Could you clarify the device and the problem?")
                        .to_string();
                    return Ok(TurnOutcome::Clarification { question });
                }
                calls.push(ToolCallRequest::new(id, name, input));
            }
            _ => {}
        }
    }

    if !calls.is_empty() {
        Ok(TurnOutcome::ToolBatch { calls })
    } else {
        Ok(TurnOutcome::FinalAnswer {
            text: text_parts.join(""),
        })
    }
}

/// Parses retry-after seconds from an error response body.
fn parse_retry_after(error_body: &str) -> u32 {
    if let Ok(parsed) = serde_json::from_str::<serde_json::Value>(error_body) {
        if let Some(msg) = parsed.get("error").and_then(|e| e.get("message")) {
            if let Some(s) = msg.as_str() {
                if let Some(idx) = s.find("try again in ") {
                    let rest = &s[idx + 13..];
                    if let Some(num_end) = rest.find(|c: char| !c.is_ascii_digit()) {
                        if let Ok(secs) = rest[..num_end].parse::<u32>() {
                            return secs;
                        }
                    }
                }
            }
        }
    }
    60
}

/// Stateful SSE parser assembling text deltas and tool-use blocks.
///
/// Lines may split across network chunks; an internal buffer carries the
/// remainder. Tool-use inputs arrive as `input_json_delta` fragments and
/// are assembled per block index.
#[derive(Default)]
struct SseCollector {
    line_buffer: String,
    current_event: String,
    text: String,
    tool_blocks: Vec<PendingToolBlock>,
    usage: Option<TokenUsage>,
}

struct PendingToolBlock {
    id: String,
    name: String,
    input_json: String,
}

impl SseCollector {
    fn feed(&mut self, chunk: &str) -> Vec<Result<StreamChunk, EngineError>> {
        self.line_buffer.push_str(chunk);
        let mut results = Vec::new();

        while let Some(newline) = self.line_buffer.find('\n') {
            let line: String = self.line_buffer.drain(..=newline).collect();
            let line = line.trim_end();

            if let Some(event_type) = line.strip_prefix("event: ") {
                self.current_event = event_type.to_string();
            } else if let Some(data) = line.strip_prefix("data: ") {
                self.handle_data(data, &mut results);
            }
        }

        results
    }

    fn handle_data(&mut self, data: &str, results: &mut Vec<Result<StreamChunk, EngineError>>) {
        match self.current_event.as_str() {
            "content_block_start" => {
                if let Ok(start) = serde_json::from_str::<ContentBlockStart>(data) {
                    if start.content_block.block_type == "tool_use" {
                        self.tool_blocks.push(PendingToolBlock {
                            id: start.content_block.id.unwrap_or_default(),
                            name: start.content_block.name.unwrap_or_default(),
                            input_json: String::new(),
                        });
                    }
                }
            }
            "content_block_delta" => {
                if let Ok(delta) = serde_json::from_str::<ContentBlockDelta>(data) {
                    if let Some(text) = delta.delta.text {
                        if !text.is_empty() {
                            self.text.push_str(&text);
                            results.push(Ok(StreamChunk::content(&text)));
                        }
                    }
                    if let Some(partial) = delta.delta.partial_json {
                        if let Some(block) = self.tool_blocks.last_mut() {
                            block.input_json.push_str(&partial);
                        }
                    }
                }
            }
            "message_delta" => {
                if let Ok(delta) = serde_json::from_str::<MessageDelta>(data) {
                    if let Some(u) = delta.usage {
                        self.usage = Some(TokenUsage::new(
                            u.input_tokens.unwrap_or(0),
                            u.output_tokens,
                        ));
                    }
                    results.push(Ok(StreamChunk::final_chunk(self.final_outcome(), self.usage)));
                }
            }
            "error" => {
                if let Ok(error) = serde_json::from_str::<StreamError>(data) {
                    results.push(Err(EngineError::unavailable(
                        error
                            .error
                            .message
                            .unwrap_or_else(|| "Stream error".to_string()),
                    )));
                }
            }
            _ => {
                // Ignore message_start, content_block_stop, ping, etc.
            }
        }
    }

    fn final_outcome(&self) -> TurnOutcome {
        for block in &self.tool_blocks {
            if block.name == CLARIFICATION_TOOL {
                let question = serde_json::from_str::<serde_json::Value>(&block.input_json)
                    .ok()
                    .and_then(|v| v.get("question").and_then(|q| q.as_str()).map(String::from))
                    .unwrap_or_else(|| "Could you clarify the device and the problem?".to_string());
                return TurnOutcome::Clarification { question };
            }
        }

        if !self.tool_blocks.is_empty() {
            let calls = self
                .tool_blocks
                .iter()
                .map(|block| {
                    let input = serde_json::from_str(&block.input_json)
                        .unwrap_or(serde_json::json!({}));
                    ToolCallRequest::new(block.id.as_str(), block.name.as_str(), input)
                })
                .collect();
            return TurnOutcome::ToolBatch { calls };
        }

        TurnOutcome::FinalAnswer {
            text: self.text.clone(),
        }
    }
}

// ----- Anthropic API Types -----

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    messages: Vec<AnthropicMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize)]
struct AnthropicMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    model: String,
    content: Vec<ContentBlock>,
    #[allow(dead_code)]
    stop_reason: Option<String>,
    usage: AnthropicUsage,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
    id: Option<String>,
    name: Option<String>,
    input: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}

// Streaming response types

#[derive(Debug, Deserialize)]
struct ContentBlockStart {
    content_block: ContentBlockStartInner,
}

#[derive(Debug, Deserialize)]
struct ContentBlockStartInner {
    #[serde(rename = "type")]
    block_type: String,
    id: Option<String>,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContentBlockDelta {
    delta: BlockDelta,
}

#[derive(Debug, Deserialize)]
struct BlockDelta {
    text: Option<String>,
    partial_json: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessageDelta {
    #[allow(dead_code)]
    delta: MessageDeltaContent,
    usage: Option<StreamUsage>,
}

#[derive(Debug, Deserialize)]
struct MessageDeltaContent {
    #[allow(dead_code)]
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamUsage {
    input_tokens: Option<u32>,
    output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct StreamError {
    error: StreamErrorContent,
}

#[derive(Debug, Deserialize)]
struct StreamErrorContent {
    message: Option<String>,
}
