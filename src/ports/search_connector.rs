//! Search Connector Port - Open web search with citation grounding.
//!
//! Invoked at most once per turn, only after the verified path is empty or
//! exhausted. Answers carry their sources so the caller can keep the
//! fallback provenance visible.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::knowledge_connector::ConnectorError;

/// Port for the open web search fallback.
#[async_trait]
pub trait SearchConnector: Send + Sync {
    /// Searches the open web and returns a grounded answer.
    async fn web_search(&self, query: &str) -> Result<GroundedAnswer, ConnectorError>;
}

/// A source backing part of a grounded answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    /// Source page title.
    pub title: String,
    /// Source URL.
    pub url: String,
}

/// Web-search answer with provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundedAnswer {
    /// Answer text assembled from search results.
    pub text: String,
    /// Sources the text is grounded in.
    pub citations: Vec<Citation>,
}

impl GroundedAnswer {
    /// Creates a grounded answer.
    pub fn new(text: impl Into<String>, citations: Vec<Citation>) -> Self {
        Self {
            text: text.into(),
            citations,
        }
    }
}
