//! AI adapters - Reasoning engine implementations.

mod anthropic_engine;
mod mock_engine;

pub use anthropic_engine::{AnthropicConfig, AnthropicEngine};
pub use mock_engine::MockReasoningEngine;
