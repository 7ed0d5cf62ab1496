//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid port number")]
    InvalidPort,

    #[error("Invalid request timeout")]
    InvalidTimeout,

    #[error("Invalid knowledge source URL format")]
    InvalidKnowledgeUrl,

    #[error("Invalid search endpoint URL format")]
    InvalidSearchEndpoint,

    #[error("Agent iteration limit must be at least 1")]
    InvalidIterationLimit,

    #[error("Context window must be at least 2 messages")]
    InvalidContextWindow,
}
