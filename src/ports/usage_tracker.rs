//! Usage Tracker Port - Accounting of per-turn token costs.
//!
//! The orchestrator emits one record per completed turn instead of mutating
//! a shared counter; aggregation is this collaborator's concern.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::agent::SourceTag;
use crate::domain::foundation::{SessionId, Timestamp, UserId};

/// Record of one turn's token cost.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageRecord {
    /// User who made the turn.
    pub user_id: UserId,
    /// Session containing the turn.
    pub session_id: SessionId,
    /// Model that answered.
    pub model: String,
    /// Which path produced the answer.
    pub source_tag: SourceTag,
    /// Tool rounds executed this turn.
    pub rounds: u32,
    /// Estimated (or metered) token cost.
    pub estimated_tokens: u32,
    /// When the turn completed.
    pub occurred_at: Timestamp,
}

impl UsageRecord {
    /// Creates a new usage record stamped with the current time.
    pub fn new(
        user_id: UserId,
        session_id: SessionId,
        model: impl Into<String>,
        source_tag: SourceTag,
        rounds: u32,
        estimated_tokens: u32,
    ) -> Self {
        Self {
            user_id,
            session_id,
            model: model.into(),
            source_tag,
            rounds,
            estimated_tokens,
            occurred_at: Timestamp::now(),
        }
    }
}

/// Port for usage accounting.
#[async_trait]
pub trait UsageTracker: Send + Sync {
    /// Records one turn's usage.
    async fn record_usage(&self, record: UsageRecord) -> Result<(), UsageTrackerError>;

    /// Total estimated tokens a user has spent.
    async fn total_for_user(&self, user_id: &UserId) -> Result<u64, UsageTrackerError>;

    /// Total estimated tokens spent within a session.
    async fn total_for_session(&self, session_id: SessionId) -> Result<u64, UsageTrackerError>;
}

/// Errors from the usage tracker.
#[derive(Debug, thiserror::Error)]
pub enum UsageTrackerError {
    /// Underlying storage failure.
    #[error("storage error: {0}")]
    Storage(String),
}
