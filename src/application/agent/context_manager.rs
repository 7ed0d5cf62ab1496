//! Context Manager - Bounded history with summarization.
//!
//! Owns every session's message log. When a log outgrows the recency window
//! the manager compacts it: the oldest messages (folded together with any
//! previous summary) are condensed into one summary through a dedicated
//! reasoning call, then pruned from the stored log. A failed or timed-out
//! summarization degrades to plain truncation so the turn is never blocked.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::domain::conversation::{Message, Role};
use crate::domain::foundation::SessionId;
use crate::ports::{ReasoningEngine, SessionStore, SessionStoreError};

/// Default recency window (K): maximum stored messages before compaction.
pub const DEFAULT_MAX_RECENT: usize = 20;

/// Errors surfaced to the orchestrator.
///
/// Summarization failures are handled internally and never appear here.
#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    /// The session store failed.
    #[error("session store error: {0}")]
    Store(#[from] SessionStoreError),

    /// A message could not be constructed.
    #[error("message error: {0}")]
    Message(String),
}

/// Manages per-session conversation context.
pub struct ContextManager {
    store: Arc<dyn SessionStore>,
    engine: Arc<dyn ReasoningEngine>,
    max_recent: usize,
    summarize_timeout: Duration,
}

impl ContextManager {
    /// Creates a manager over the given store and summarization engine.
    pub fn new(
        store: Arc<dyn SessionStore>,
        engine: Arc<dyn ReasoningEngine>,
        max_recent: usize,
        summarize_timeout: Duration,
    ) -> Self {
        Self {
            store,
            engine,
            max_recent,
            summarize_timeout,
        }
    }

    /// Appends a message to the session's log.
    pub async fn append(&self, session_id: SessionId, message: Message) -> Result<(), ContextError> {
        self.store.append_message(session_id, message).await?;
        Ok(())
    }

    /// Returns the bounded history for the next reasoning call.
    ///
    /// Compacts first when the stored log exceeds the recency window. The
    /// result is the stored summary (as one system message, when present)
    /// followed by at most `max_recent` messages in chronological order.
    pub async fn bounded_history(
        &self,
        session_id: SessionId,
    ) -> Result<Vec<Message>, ContextError> {
        let length = self.store.message_count(session_id).await?;
        if length > self.max_recent {
            self.compact(session_id, length).await?;
        }

        let mut history = Vec::new();
        if let Some(summary) = self.store.load_summary(session_id).await? {
            let message =
                Message::system(format!("Summary of the earlier conversation:\n{summary}"))
                    .map_err(|e| ContextError::Message(e.to_string()))?;
            history.push(message);
        }
        history.extend(self.store.fetch_recent(session_id, self.max_recent).await?);

        Ok(history)
    }

    /// Compacts the oldest `length - max_recent/2` messages into the
    /// rolling summary, degrading to truncation when summarization fails.
    async fn compact(&self, session_id: SessionId, length: usize) -> Result<(), ContextError> {
        let excess = length - self.max_recent / 2;
        let all = self.store.fetch_all(session_id).await?;
        let aged = &all[..excess.min(all.len())];
        let previous_summary = self.store.load_summary(session_id).await?;

        let prompt = summarization_prompt(previous_summary.as_deref(), aged);
        let summarized =
            tokio::time::timeout(self.summarize_timeout, self.engine.complete_text(&prompt)).await;

        match summarized {
            Ok(Ok(summary)) if !summary.trim().is_empty() => {
                debug!(%session_id, folded = aged.len(), "context compacted");
                self.store.store_summary(session_id, summary).await?;
                self.store.remove_oldest(session_id, excess).await?;
            }
            outcome => {
                // Degraded mode: drop the oldest excess without a summary.
                match outcome {
                    Ok(Err(err)) => warn!(%session_id, %err, "summarization failed, truncating"),
                    Err(_) => warn!(%session_id, "summarization timed out, truncating"),
                    Ok(Ok(_)) => warn!(%session_id, "summarization returned nothing, truncating"),
                }
                let drop_count = length.saturating_sub(self.max_recent);
                self.store.remove_oldest(session_id, drop_count).await?;
            }
        }

        Ok(())
    }
}

/// Builds the summarization prompt, folding in the previous summary.
fn summarization_prompt(previous_summary: Option<&str>, aged: &[Message]) -> String {
    let mut prompt =
        String::from("Summarize the following chat history for context retention.\n");
    prompt.push_str("Keep device names, reported symptoms, and repair progress.\n\n");

    if let Some(previous) = previous_summary {
        prompt.push_str("Earlier summary:\n");
        prompt.push_str(previous);
        prompt.push_str("\n\n");
    }

    prompt.push_str("History:\n");
    for message in aged {
        let role = match message.role() {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        };
        prompt.push_str(&format!("{}: {}\n", role, message.content()));
    }

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ai::MockReasoningEngine;
    use crate::adapters::session::InMemorySessionStore;
    use crate::ports::EngineError;

    fn manager(engine: MockReasoningEngine) -> (ContextManager, Arc<InMemorySessionStore>) {
        let store = Arc::new(InMemorySessionStore::new());
        let manager = ContextManager::new(
            store.clone(),
            Arc::new(engine),
            DEFAULT_MAX_RECENT,
            Duration::from_secs(5),
        );
        (manager, store)
    }

    async fn seed(manager: &ContextManager, session_id: SessionId, count: usize) {
        for i in 0..count {
            manager
                .append(session_id, Message::user(format!("message {i}")).unwrap())
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn short_log_is_returned_verbatim() {
        let (manager, _) = manager(MockReasoningEngine::new());
        let session_id = SessionId::new();
        seed(&manager, session_id, 5).await;

        let history = manager.bounded_history(session_id).await.unwrap();

        assert_eq!(history.len(), 5);
        assert_eq!(history[0].content(), "message 0");
    }

    #[tokio::test]
    async fn oversized_log_is_compacted_to_summary_plus_recent() {
        let engine = MockReasoningEngine::new().with_text("the user is fixing a controller");
        let (manager, store) = manager(engine);
        let session_id = SessionId::new();
        seed(&manager, session_id, 25).await;

        let history = manager.bounded_history(session_id).await.unwrap();

        // 25 - K/2 = 15 oldest folded away, 10 remain, plus 1 summary.
        assert_eq!(history.len(), 11);
        assert_eq!(history[0].role(), Role::System);
        assert!(history[0].content().contains("fixing a controller"));
        assert_eq!(history[1].content(), "message 15");
        assert_eq!(store.message_count(session_id).await.unwrap(), 10);
    }

    #[tokio::test]
    async fn bounded_history_never_exceeds_k_plus_one() {
        let engine = MockReasoningEngine::new().with_text("summary");
        let (manager, _) = manager(engine);
        let session_id = SessionId::new();
        seed(&manager, session_id, 60).await;

        let history = manager.bounded_history(session_id).await.unwrap();

        assert!(history.len() <= DEFAULT_MAX_RECENT + 1);
    }

    #[tokio::test]
    async fn compaction_folds_previous_summary() {
        let engine = MockReasoningEngine::new()
            .with_text("first summary")
            .with_text("second summary");
        let (manager, store) = manager(engine);
        let session_id = SessionId::new();

        seed(&manager, session_id, 25).await;
        manager.bounded_history(session_id).await.unwrap();
        assert_eq!(
            store.load_summary(session_id).await.unwrap().as_deref(),
            Some("first summary")
        );

        // Age the log past the window again; the next compaction replaces
        // the summary rather than accumulating a second one.
        seed(&manager, session_id, 15).await;
        let history = manager.bounded_history(session_id).await.unwrap();

        assert_eq!(
            store.load_summary(session_id).await.unwrap().as_deref(),
            Some("second summary")
        );
        let summaries = history
            .iter()
            .filter(|m| m.role() == Role::System)
            .count();
        assert_eq!(summaries, 1);
    }

    #[tokio::test]
    async fn failed_summarization_degrades_to_truncation() {
        let engine =
            MockReasoningEngine::new().with_text_error(EngineError::unavailable("model down"));
        let (manager, store) = manager(engine);
        let session_id = SessionId::new();
        seed(&manager, session_id, 25).await;

        let history = manager.bounded_history(session_id).await.unwrap();

        // No summary, oldest 5 dropped, exactly K remain.
        assert!(store.load_summary(session_id).await.unwrap().is_none());
        assert_eq!(history.len(), DEFAULT_MAX_RECENT);
        assert_eq!(history[0].content(), "message 5");
    }

    #[tokio::test]
    async fn chronological_order_is_preserved_across_compaction() {
        let engine = MockReasoningEngine::new().with_text("summary");
        let (manager, _) = manager(engine);
        let session_id = SessionId::new();
        seed(&manager, session_id, 30).await;

        let history = manager.bounded_history(session_id).await.unwrap();

        let contents: Vec<&str> = history
            .iter()
            .filter(|m| m.role() == Role::User)
            .map(|m| m.content())
            .collect();
        let mut sorted = contents.clone();
        sorted.sort_by_key(|c| {
            c.trim_start_matches("message ").parse::<usize>().unwrap()
        });
        assert_eq!(contents, sorted);
    }

    #[test]
    fn summarization_prompt_includes_previous_summary_and_roles() {
        let aged = vec![
            Message::user("my ps5 controller drifts").unwrap(),
            Message::assistant("let me look that up").unwrap(),
        ];
        let prompt = summarization_prompt(Some("earlier context"), &aged);

        assert!(prompt.contains("Earlier summary:\nearlier context"));
        assert!(prompt.contains("user: my ps5 controller drifts"));
        assert!(prompt.contains("assistant: let me look that up"));
    }
}
