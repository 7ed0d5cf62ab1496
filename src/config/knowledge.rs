//! Knowledge connector configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Verified manual source configuration
#[derive(Debug, Clone, Deserialize)]
pub struct KnowledgeConfig {
    /// Base URL of the manual source API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-call timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl KnowledgeConfig {
    /// Get timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Validate knowledge configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ValidationError::InvalidKnowledgeUrl);
        }
        Ok(())
    }
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
        }
    }
}

fn default_base_url() -> String {
    "https://www.ifixit.com/api/2.0".to_string()
}

fn default_timeout() -> u64 {
    15
}
