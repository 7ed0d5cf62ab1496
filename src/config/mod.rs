//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment
//! variables using the `config` and `dotenvy` crates. Configuration is
//! loaded with the `FIXMASTER` prefix and nested values use double
//! underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use fixmaster::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Server running on {}", config.server.socket_addr());
//! ```

mod agent;
mod ai;
mod error;
mod knowledge;
mod search;
mod server;

pub use agent::AgentConfig;
pub use ai::AiConfig;
pub use error::{ConfigError, ValidationError};
pub use knowledge::KnowledgeConfig;
pub use search::SearchConfig;
pub use server::{Environment, ServerConfig};

use serde::Deserialize;

/// Root application configuration
///
/// Contains all configuration sections for the FixMaster backend.
/// Load using [`AppConfig::load()`] which reads from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment)
    #[serde(default)]
    pub server: ServerConfig,

    /// Reasoning engine configuration (Anthropic)
    #[serde(default)]
    pub ai: AiConfig,

    /// Verified manual source configuration (iFixit)
    #[serde(default)]
    pub knowledge: KnowledgeConfig,

    /// Fallback web-search configuration
    #[serde(default)]
    pub search: SearchConfig,

    /// Agent loop limits and cost constants
    #[serde(default)]
    pub agent: AgentConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `FIXMASTER` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `FIXMASTER__SERVER__PORT=4000` -> `server.port = 4000`
    /// - `FIXMASTER__AI__ANTHROPIC_API_KEY=...` -> `ai.anthropic_api_key = ...`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if values cannot be parsed into expected types.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("FIXMASTER")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.ai.validate()?;
        self.knowledge.validate()?;
        self.search.validate()?;
        self.agent.validate()?;
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Mutex to ensure tests don't run in parallel (env vars are global)
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    fn set_minimal_env() {
        env::set_var("FIXMASTER__AI__ANTHROPIC_API_KEY", "sk-ant-xxx");
        env::set_var("FIXMASTER__SEARCH__API_KEY", "tvly-xxx");
    }

    fn clear_env() {
        env::remove_var("FIXMASTER__AI__ANTHROPIC_API_KEY");
        env::remove_var("FIXMASTER__SEARCH__API_KEY");
        env::remove_var("FIXMASTER__SERVER__PORT");
        env::remove_var("FIXMASTER__AGENT__MAX_ITERATIONS");
    }

    #[test]
    fn test_load_from_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        assert!(result.is_ok(), "Failed to load config: {:?}", result.err());
        let config = result.unwrap();
        assert_eq!(config.ai.anthropic_api_key.as_deref(), Some("sk-ant-xxx"));
        assert_eq!(config.search.api_key.as_deref(), Some("tvly-xxx"));
    }

    #[test]
    fn test_validate_full_config() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        assert!(result.is_ok());
        assert!(result.unwrap().validate().is_ok());
    }

    #[test]
    fn test_nested_overrides_apply() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("FIXMASTER__SERVER__PORT", "9999");
        env::set_var("FIXMASTER__AGENT__MAX_ITERATIONS", "5");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.server.port, 9999);
        assert_eq!(config.agent.max_iterations, 5);
    }

    #[test]
    fn test_validation_fails_without_keys() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        let config = AppConfig {
            server: ServerConfig::default(),
            ai: AiConfig::default(),
            knowledge: KnowledgeConfig::default(),
            search: SearchConfig::default(),
            agent: AgentConfig::default(),
        };
        assert!(config.validate().is_err());
    }
}
