//! Fallback search configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Open web search configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    /// Search API endpoint
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Search API key
    pub api_key: Option<String>,

    /// Per-call timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Maximum results to request
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

impl SearchConfig {
    /// Get timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Check if an API key is configured
    pub fn has_api_key(&self) -> bool {
        self.api_key.as_ref().is_some_and(|k| !k.is_empty())
    }

    /// Validate search configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.endpoint.starts_with("http://") && !self.endpoint.starts_with("https://") {
            return Err(ValidationError::InvalidSearchEndpoint);
        }
        if !self.has_api_key() {
            return Err(ValidationError::MissingRequired("SEARCH_API_KEY"));
        }
        Ok(())
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            api_key: None,
            timeout_secs: default_timeout(),
            max_results: default_max_results(),
        }
    }
}

fn default_endpoint() -> String {
    "https://api.tavily.com/search".to_string()
}

fn default_timeout() -> u64 {
    20
}

fn default_max_results() -> usize {
    5
}
