//! Mock reasoning engine for testing.
//!
//! Scripts a queue of outcomes for `generate` and a separate queue of plain
//! texts for `complete_text`, with error injection and call capture. Lets
//! the whole agent loop run without a real model.
//!
//! # Example
//!
//! ```ignore
//! let engine = MockReasoningEngine::new()
//!     .with_outcome(TurnOutcome::ToolBatch { calls })
//!     .with_outcome(TurnOutcome::FinalAnswer { text: "done".into() });
//! ```

use async_trait::async_trait;
use futures::stream::{self, Stream};
use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use crate::domain::agent::TurnOutcome;
use crate::ports::{
    EngineError, EngineInfo, EngineReply, GenerationRequest, ReasoningEngine, StreamChunk,
    TokenUsage,
};

/// Text chunk size used by the mock stream.
const STREAM_CHUNK_CHARS: usize = 16;

/// Configurable mock implementation of the `ReasoningEngine` port.
#[derive(Clone, Default)]
pub struct MockReasoningEngine {
    replies: Arc<Mutex<VecDeque<Result<EngineReply, EngineError>>>>,
    texts: Arc<Mutex<VecDeque<Result<String, EngineError>>>>,
    generate_requests: Arc<Mutex<Vec<GenerationRequest>>>,
    text_prompts: Arc<Mutex<Vec<String>>>,
}

impl MockReasoningEngine {
    /// Creates a mock with empty script queues.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a `generate` outcome without metered usage.
    pub fn with_outcome(self, outcome: TurnOutcome) -> Self {
        self.with_reply(outcome, None)
    }

    /// Queues a `generate` outcome with optional metered usage.
    pub fn with_reply(self, outcome: TurnOutcome, usage: Option<TokenUsage>) -> Self {
        let mut reply = EngineReply::new(outcome, "mock-model");
        if let Some(usage) = usage {
            reply = reply.with_usage(usage);
        }
        self.replies.lock().unwrap().push_back(Ok(reply));
        self
    }

    /// Queues a `generate` error.
    pub fn with_error(self, error: EngineError) -> Self {
        self.replies.lock().unwrap().push_back(Err(error));
        self
    }

    /// Queues a `complete_text` response.
    pub fn with_text(self, text: impl Into<String>) -> Self {
        self.texts.lock().unwrap().push_back(Ok(text.into()));
        self
    }

    /// Queues a `complete_text` error.
    pub fn with_text_error(self, error: EngineError) -> Self {
        self.texts.lock().unwrap().push_back(Err(error));
        self
    }

    /// Number of `generate` calls observed.
    pub fn generate_calls(&self) -> usize {
        self.generate_requests.lock().unwrap().len()
    }

    /// Captured `generate` requests, in call order.
    pub fn captured_requests(&self) -> Vec<GenerationRequest> {
        self.generate_requests.lock().unwrap().clone()
    }

    /// Captured `complete_text` prompts, in call order.
    pub fn captured_text_prompts(&self) -> Vec<String> {
        self.text_prompts.lock().unwrap().clone()
    }

    fn next_reply(&self) -> Result<EngineReply, EngineError> {
        match self.replies.lock().unwrap().pop_front() {
            Some(reply) => reply,
            None => Ok(EngineReply::new(
                TurnOutcome::FinalAnswer {
                    text: "Mock reply.".to_string(),
                },
                "mock-model",
            )),
        }
    }
}

#[async_trait]
impl ReasoningEngine for MockReasoningEngine {
    async fn generate(&self, request: GenerationRequest) -> Result<EngineReply, EngineError> {
        self.generate_requests.lock().unwrap().push(request);
        self.next_reply()
    }

    async fn stream_generate(
        &self,
        request: GenerationRequest,
    ) -> Result<Pin<Box<dyn Stream<Item = Result<StreamChunk, EngineError>> + Send>>, EngineError>
    {
        self.generate_requests.lock().unwrap().push(request);
        let reply = self.next_reply()?;

        let mut chunks: Vec<Result<StreamChunk, EngineError>> = Vec::new();
        if let TurnOutcome::FinalAnswer { text } = &reply.outcome {
            let chars: Vec<char> = text.chars().collect();
            for piece in chars.chunks(STREAM_CHUNK_CHARS) {
                chunks.push(Ok(StreamChunk::content(piece.iter().collect::<String>())));
            }
        }
        chunks.push(Ok(StreamChunk::final_chunk(reply.outcome, reply.usage)));

        Ok(Box::pin(stream::iter(chunks)))
    }

    async fn complete_text(&self, prompt: &str) -> Result<String, EngineError> {
        self.text_prompts.lock().unwrap().push(prompt.to_string());
        match self.texts.lock().unwrap().pop_front() {
            Some(text) => text,
            None => Ok("Conversation summary.".to_string()),
        }
    }

    fn engine_info(&self) -> EngineInfo {
        EngineInfo::new("mock", "mock-model")
    }
}
