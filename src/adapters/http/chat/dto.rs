//! HTTP DTOs for the chat endpoint.
//!
//! These types decouple the wire contract from domain types, allowing
//! independent evolution.

use serde::{Deserialize, Serialize};

use crate::domain::agent::{AgentResponse, SafetyLevel, SourceTag};

/// Incoming turn request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    /// Session the message belongs to.
    pub session_id: String,
    /// User sending the message.
    pub user_id: String,
    /// The message content.
    pub message: String,
}

/// Final turn response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    /// Answer text.
    pub text: String,
    /// Which path produced the answer.
    pub source_tag: SourceTag,
    /// Hazard classification of the answer.
    pub safety_level: SafetyLevel,
    /// Tools executed this turn, in dispatch order.
    pub tools_used: Vec<String>,
    /// Approximate token cost.
    pub estimated_tokens: u32,
}

impl From<AgentResponse> for ChatResponse {
    fn from(response: AgentResponse) -> Self {
        Self {
            text: response.text,
            source_tag: response.source_tag,
            safety_level: response.safety_level,
            tools_used: response.tools_used,
            estimated_tokens: response.estimated_tokens,
        }
    }
}

/// Error payload for failed requests.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    /// Human-readable error description.
    pub error: String,
}
