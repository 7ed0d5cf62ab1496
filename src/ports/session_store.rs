//! Session Store Port - Persisted conversation log.
//!
//! External persistence for per-session message logs and rolling summaries.
//! The context manager is the only caller; it owns compaction and the
//! bounded-history invariant, the store just keeps ordered messages.

use async_trait::async_trait;

use crate::domain::conversation::Message;
use crate::domain::foundation::SessionId;

/// Port for the persisted session log.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Appends a message to the session's log.
    async fn append_message(
        &self,
        session_id: SessionId,
        message: Message,
    ) -> Result<(), SessionStoreError>;

    /// Fetches the most recent `limit` messages in chronological order.
    async fn fetch_recent(
        &self,
        session_id: SessionId,
        limit: usize,
    ) -> Result<Vec<Message>, SessionStoreError>;

    /// Fetches the entire log in chronological order.
    async fn fetch_all(&self, session_id: SessionId) -> Result<Vec<Message>, SessionStoreError>;

    /// Returns the number of messages in the log.
    async fn message_count(&self, session_id: SessionId) -> Result<usize, SessionStoreError>;

    /// Replaces the session's rolling summary.
    async fn store_summary(
        &self,
        session_id: SessionId,
        summary: String,
    ) -> Result<(), SessionStoreError>;

    /// Loads the session's rolling summary, if one exists.
    async fn load_summary(&self, session_id: SessionId)
        -> Result<Option<String>, SessionStoreError>;

    /// Removes the `count` oldest messages from the log.
    ///
    /// Compaction folds those messages into the summary first; degraded
    /// truncation drops them outright.
    async fn remove_oldest(
        &self,
        session_id: SessionId,
        count: usize,
    ) -> Result<(), SessionStoreError>;
}

/// Errors from the session store.
#[derive(Debug, thiserror::Error)]
pub enum SessionStoreError {
    /// Underlying storage failure.
    #[error("storage error: {0}")]
    Storage(String),

    /// Session does not exist.
    #[error("session not found: {0}")]
    SessionNotFound(SessionId),
}

impl SessionStoreError {
    /// Creates a storage error.
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_error_displays_message() {
        let err = SessionStoreError::storage("disk full");
        assert_eq!(err.to_string(), "storage error: disk full");
    }

    #[test]
    fn not_found_carries_session_id() {
        let id = SessionId::new();
        let err = SessionStoreError::SessionNotFound(id);
        assert!(err.to_string().contains(&id.to_string()));
    }
}
