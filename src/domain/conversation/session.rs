//! Session context aggregate.
//!
//! A `SessionContext` is the in-memory view of one persisted conversation:
//! the ordered message log plus the optional rolling summary produced by
//! compaction. It is owned exclusively by the context manager and mutated
//! only through its append/summarize operations.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{SessionId, UserId};

use super::Message;

/// Ordered conversation state for a single session.
///
/// # Invariants
///
/// - `messages` is append-only and chronologically ordered
/// - at most one summary exists at a time; it always describes messages
///   older than every entry currently in `messages`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionContext {
    session_id: SessionId,
    user_id: UserId,
    messages: Vec<Message>,
    summary: Option<String>,
}

impl SessionContext {
    /// Creates an empty context for a new session.
    pub fn new(session_id: SessionId, user_id: UserId) -> Self {
        Self {
            session_id,
            user_id,
            messages: Vec::new(),
            summary: None,
        }
    }

    /// Reconstitutes a context from persistence.
    pub fn reconstitute(
        session_id: SessionId,
        user_id: UserId,
        messages: Vec<Message>,
        summary: Option<String>,
    ) -> Self {
        Self {
            session_id,
            user_id,
            messages,
            summary,
        }
    }

    /// Appends a message to the log.
    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Replaces the rolling summary.
    pub fn set_summary(&mut self, summary: impl Into<String>) {
        self.summary = Some(summary.into());
    }

    /// Drops the `count` oldest messages from the log.
    ///
    /// Used by compaction after the dropped messages have been folded into
    /// the summary (or discarded under degraded truncation).
    pub fn remove_oldest(&mut self, count: usize) {
        let count = count.min(self.messages.len());
        self.messages.drain(..count);
    }

    /// Returns the session ID.
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Returns the owning user.
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// Returns the message log in chronological order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Returns the number of messages in the log.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns true if the log is empty.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Returns the rolling summary, if one exists.
    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> SessionContext {
        SessionContext::new(SessionId::new(), UserId::new("user-1").unwrap())
    }

    #[test]
    fn new_context_is_empty() {
        let ctx = context();
        assert!(ctx.is_empty());
        assert!(ctx.summary().is_none());
    }

    #[test]
    fn append_preserves_order() {
        let mut ctx = context();
        ctx.append(Message::user("first").unwrap());
        ctx.append(Message::assistant("second").unwrap());

        assert_eq!(ctx.len(), 2);
        assert_eq!(ctx.messages()[0].content(), "first");
        assert_eq!(ctx.messages()[1].content(), "second");
    }

    #[test]
    fn remove_oldest_drops_from_the_front() {
        let mut ctx = context();
        for i in 0..5 {
            ctx.append(Message::user(format!("m{}", i)).unwrap());
        }

        ctx.remove_oldest(3);

        assert_eq!(ctx.len(), 2);
        assert_eq!(ctx.messages()[0].content(), "m3");
    }

    #[test]
    fn remove_oldest_saturates_at_log_length() {
        let mut ctx = context();
        ctx.append(Message::user("only").unwrap());

        ctx.remove_oldest(10);

        assert!(ctx.is_empty());
    }

    #[test]
    fn set_summary_replaces_previous() {
        let mut ctx = context();
        ctx.set_summary("first summary");
        ctx.set_summary("second summary");

        assert_eq!(ctx.summary(), Some("second summary"));
    }

    #[test]
    fn reconstitute_preserves_fields() {
        let session_id = SessionId::new();
        let user_id = UserId::new("user-9").unwrap();
        let messages = vec![Message::user("hello").unwrap()];

        let ctx = SessionContext::reconstitute(
            session_id,
            user_id.clone(),
            messages,
            Some("old summary".to_string()),
        );

        assert_eq!(ctx.session_id(), session_id);
        assert_eq!(ctx.user_id(), &user_id);
        assert_eq!(ctx.len(), 1);
        assert_eq!(ctx.summary(), Some("old summary"));
    }
}
