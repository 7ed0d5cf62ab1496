//! Turn outcome and response value objects.
//!
//! `TurnOutcome` is the tagged result of one reasoning-engine call; every
//! branch is handled exhaustively by the orchestrator. `AgentResponse` is
//! the final annotated answer of a turn.

use serde::{Deserialize, Serialize};

use super::safety::SafetyLevel;
use super::tools::ToolCallRequest;

/// Result of a single reasoning-engine invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The engine produced a final textual answer.
    FinalAnswer {
        /// Answer text.
        text: String,
    },

    /// The engine requested a batch of tool calls, in order.
    ToolBatch {
        /// Requested calls; order is preserved through execution.
        calls: Vec<ToolCallRequest>,
    },

    /// The engine needs more information from the user before using tools.
    Clarification {
        /// The question to relay to the user.
        question: String,
    },
}

impl TurnOutcome {
    /// Returns true if this outcome ends the tool loop.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::ToolBatch { .. })
    }
}

/// Provenance of a final answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceTag {
    /// Derived solely from the verified manual source.
    Verified,
    /// Derived from open web search after the verified path was exhausted.
    Fallback,
}

/// Final annotated answer of one turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentResponse {
    /// Answer text.
    pub text: String,

    /// Which path produced the answer.
    pub source_tag: SourceTag,

    /// Names of every tool executed this turn, in dispatch order.
    pub tools_used: Vec<String>,

    /// Hazard classification of the answer text.
    pub safety_level: SafetyLevel,

    /// Approximate token cost of the turn.
    pub estimated_tokens: u32,
}

impl AgentResponse {
    /// Creates a response for a completed turn.
    pub fn new(
        text: impl Into<String>,
        source_tag: SourceTag,
        tools_used: Vec<String>,
        safety_level: SafetyLevel,
        estimated_tokens: u32,
    ) -> Self {
        Self {
            text: text.into(),
            source_tag,
            tools_used,
            safety_level,
            estimated_tokens,
        }
    }

    /// Creates the zero-cost apology response for a failed turn.
    pub fn failed(text: impl Into<String>, source_tag: SourceTag, tools_used: Vec<String>) -> Self {
        Self {
            text: text.into(),
            source_tag,
            tools_used,
            safety_level: SafetyLevel::Safe,
            estimated_tokens: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn final_answer_is_terminal() {
        let outcome = TurnOutcome::FinalAnswer {
            text: "done".to_string(),
        };
        assert!(outcome.is_terminal());
    }

    #[test]
    fn clarification_is_terminal() {
        let outcome = TurnOutcome::Clarification {
            question: "Which model?".to_string(),
        };
        assert!(outcome.is_terminal());
    }

    #[test]
    fn tool_batch_is_not_terminal() {
        let outcome = TurnOutcome::ToolBatch { calls: vec![] };
        assert!(!outcome.is_terminal());
    }

    #[test]
    fn source_tag_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&SourceTag::Verified).unwrap(), "\"verified\"");
        assert_eq!(serde_json::to_string(&SourceTag::Fallback).unwrap(), "\"fallback\"");
    }

    #[test]
    fn failed_response_costs_nothing() {
        let response = AgentResponse::failed("sorry", SourceTag::Fallback, vec![]);
        assert_eq!(response.estimated_tokens, 0);
        assert_eq!(response.safety_level, SafetyLevel::Safe);
    }
}
