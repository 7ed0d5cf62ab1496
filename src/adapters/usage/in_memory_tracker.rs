//! In-memory usage tracker implementation.
//!
//! In-memory implementation of the `UsageTracker` port for development,
//! testing, and single-server deployments. Durable accounting belongs to a
//! database-backed implementation of the same port.

use async_trait::async_trait;
use std::sync::Mutex;

use crate::domain::foundation::{SessionId, UserId};
use crate::ports::{UsageRecord, UsageTracker, UsageTrackerError};

/// In-memory implementation of the `UsageTracker` port.
///
/// Thread-safe via internal `Mutex`. Does not persist across restarts.
#[derive(Default)]
pub struct InMemoryUsageTracker {
    records: Mutex<Vec<UsageRecord>>,
}

impl InMemoryUsageTracker {
    /// Creates an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all recorded usage records.
    pub fn records(&self) -> Vec<UsageRecord> {
        self.records.lock().unwrap().clone()
    }

    /// Clears all recorded usage.
    pub fn clear(&self) {
        self.records.lock().unwrap().clear();
    }

    /// Returns the total number of records.
    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    /// Returns true if no records exist.
    pub fn is_empty(&self) -> bool {
        self.records.lock().unwrap().is_empty()
    }
}

#[async_trait]
impl UsageTracker for InMemoryUsageTracker {
    async fn record_usage(&self, record: UsageRecord) -> Result<(), UsageTrackerError> {
        self.records.lock().unwrap().push(record);
        Ok(())
    }

    async fn total_for_user(&self, user_id: &UserId) -> Result<u64, UsageTrackerError> {
        let records = self.records.lock().unwrap();
        Ok(records
            .iter()
            .filter(|r| &r.user_id == user_id)
            .map(|r| u64::from(r.estimated_tokens))
            .sum())
    }

    async fn total_for_session(&self, session_id: SessionId) -> Result<u64, UsageTrackerError> {
        let records = self.records.lock().unwrap();
        Ok(records
            .iter()
            .filter(|r| r.session_id == session_id)
            .map(|r| u64::from(r.estimated_tokens))
            .sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::agent::SourceTag;

    fn record(user: &str, session_id: SessionId, tokens: u32) -> UsageRecord {
        UsageRecord::new(
            UserId::new(user).unwrap(),
            session_id,
            "mock-model",
            SourceTag::Verified,
            1,
            tokens,
        )
    }

    #[tokio::test]
    async fn totals_are_summed_per_user() {
        let tracker = InMemoryUsageTracker::new();
        let session = SessionId::new();

        tracker.record_usage(record("alice", session, 1200)).await.unwrap();
        tracker.record_usage(record("alice", session, 300)).await.unwrap();
        tracker.record_usage(record("bob", session, 500)).await.unwrap();

        let alice = UserId::new("alice").unwrap();
        assert_eq!(tracker.total_for_user(&alice).await.unwrap(), 1500);
        assert_eq!(tracker.len(), 3);
    }

    #[tokio::test]
    async fn totals_are_summed_per_session() {
        let tracker = InMemoryUsageTracker::new();
        let a = SessionId::new();
        let b = SessionId::new();

        tracker.record_usage(record("alice", a, 1000)).await.unwrap();
        tracker.record_usage(record("alice", b, 2200)).await.unwrap();

        assert_eq!(tracker.total_for_session(a).await.unwrap(), 1000);
        assert_eq!(tracker.total_for_session(b).await.unwrap(), 2200);
    }

    #[tokio::test]
    async fn clear_empties_the_tracker() {
        let tracker = InMemoryUsageTracker::new();
        tracker
            .record_usage(record("alice", SessionId::new(), 100))
            .await
            .unwrap();

        tracker.clear();

        assert!(tracker.is_empty());
    }
}
