//! Knowledge Connector Port - Verified repair-manual source.
//!
//! Three lookups against the manual source: device search, guide listing,
//! and step retrieval. Empty results are data, not errors; they mark the
//! verified path as exhausted and drive the fallback decision.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::GuideId;

/// Port for the verified manual source.
#[async_trait]
pub trait KnowledgeConnector: Send + Sync {
    /// Searches for devices matching a query. Returns at most the top 3
    /// hits, or an empty vec when the source knows nothing about the query.
    async fn search_device(&self, query: &str) -> Result<Vec<DeviceHit>, ConnectorError>;

    /// Lists repair guides for a device title. Returns at most the top 5.
    async fn list_guides(&self, device_title: &str) -> Result<Vec<GuideSummary>, ConnectorError>;

    /// Retrieves the full ordered steps of one guide, or `None` when the
    /// guide does not exist.
    async fn get_guide_steps(&self, guide_id: GuideId) -> Result<Option<Guide>, ConnectorError>;
}

/// A device search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceHit {
    /// Canonical device title in the manual source.
    pub title: String,
    /// Link to the device page.
    pub url: String,
}

/// Summary of one repair guide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuideSummary {
    /// Guide id for step retrieval.
    pub id: GuideId,
    /// Guide title.
    pub title: String,
    /// One-line guide summary.
    pub summary: String,
}

/// A single step of a repair guide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuideStep {
    /// Instruction text.
    pub text: String,
    /// First image attached to the step, if any.
    pub image_url: Option<String>,
}

/// Full repair guide with ordered steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guide {
    /// Guide title.
    pub title: String,
    /// Steps in execution order.
    pub steps: Vec<GuideStep>,
    /// Link to the guide page.
    pub url: String,
}

/// Transport-level connector failure.
///
/// Shared by the knowledge and search connectors. Every kind is recoverable
/// per call: the registry converts it to a `ToolResult` error kind.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConnectorError {
    /// The call exceeded its timeout.
    #[error("connector call timed out after {timeout_secs}s")]
    Timeout {
        /// Configured timeout.
        timeout_secs: u32,
    },

    /// The connector was unreachable or answered with a server failure.
    #[error("connector unavailable: {message}")]
    Unavailable {
        /// Error details.
        message: String,
    },

    /// The connector answered with something unparseable.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl ConnectorError {
    /// Creates an unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Creates a protocol error.
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }

    /// Returns true if the failure was a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}
