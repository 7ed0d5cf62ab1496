//! Agent loop configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Limits and cost constants for the agent loop
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// Maximum tool rounds per turn
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Recency window: maximum stored messages before compaction
    #[serde(default = "default_context_window")]
    pub context_window: usize,

    /// Per-call tool timeout in seconds
    #[serde(default = "default_tool_timeout")]
    pub tool_timeout_secs: u64,

    /// Summarization call timeout in seconds
    #[serde(default = "default_summarize_timeout")]
    pub summarize_timeout_secs: u64,

    /// Heuristic base cost of a verified turn, in tokens
    #[serde(default = "default_base_cost")]
    pub base_cost_tokens: u32,

    /// Heuristic per-round increment, in tokens
    #[serde(default = "default_round_cost")]
    pub round_cost_tokens: u32,

    /// Heuristic flat cost of a fallback turn, in tokens
    #[serde(default = "default_fallback_cost")]
    pub fallback_cost_tokens: u32,
}

impl AgentConfig {
    /// Get the tool timeout as Duration
    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }

    /// Get the summarization timeout as Duration
    pub fn summarize_timeout(&self) -> Duration {
        Duration::from_secs(self.summarize_timeout_secs)
    }

    /// Validate agent configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_iterations == 0 {
            return Err(ValidationError::InvalidIterationLimit);
        }
        if self.context_window < 2 {
            return Err(ValidationError::InvalidContextWindow);
        }
        Ok(())
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            context_window: default_context_window(),
            tool_timeout_secs: default_tool_timeout(),
            summarize_timeout_secs: default_summarize_timeout(),
            base_cost_tokens: default_base_cost(),
            round_cost_tokens: default_round_cost(),
            fallback_cost_tokens: default_fallback_cost(),
        }
    }
}

fn default_max_iterations() -> u32 {
    3
}

fn default_context_window() -> usize {
    20
}

fn default_tool_timeout() -> u64 {
    15
}

fn default_summarize_timeout() -> u64 {
    30
}

fn default_base_cost() -> u32 {
    1200
}

fn default_round_cost() -> u32 {
    300
}

fn default_fallback_cost() -> u32 {
    2200
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_config_defaults() {
        let config = AgentConfig::default();
        assert_eq!(config.max_iterations, 3);
        assert_eq!(config.context_window, 20);
        assert_eq!(config.base_cost_tokens, 1200);
        assert_eq!(config.round_cost_tokens, 300);
        assert_eq!(config.fallback_cost_tokens, 2200);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_iterations_is_invalid() {
        let config = AgentConfig {
            max_iterations: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_tiny_context_window_is_invalid() {
        let config = AgentConfig {
            context_window: 1,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
