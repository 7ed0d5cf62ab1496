//! In-memory session store implementation.
//!
//! This adapter provides an in-memory implementation of the `SessionStore`
//! port. Useful for development, testing, and single-server deployments
//! without persistence requirements; production deployments put a real
//! database behind the same port.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::domain::conversation::Message;
use crate::domain::foundation::SessionId;
use crate::ports::{SessionStore, SessionStoreError};

#[derive(Default)]
struct StoredSession {
    messages: Vec<Message>,
    summary: Option<String>,
}

/// In-memory implementation of the `SessionStore` port.
///
/// Thread-safe via internal `Mutex`. Sessions are created on first append;
/// reads of unknown sessions return empty results rather than errors, so a
/// brand-new session needs no explicit setup.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: Mutex<HashMap<SessionId, StoredSession>>,
}

impl InMemorySessionStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sessions with at least one stored message or summary.
    pub fn session_count(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }

    /// Clears all stored sessions.
    pub fn clear(&self) {
        self.sessions.lock().unwrap().clear();
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn append_message(
        &self,
        session_id: SessionId,
        message: Message,
    ) -> Result<(), SessionStoreError> {
        let mut sessions = self.sessions.lock().unwrap();
        sessions.entry(session_id).or_default().messages.push(message);
        Ok(())
    }

    async fn fetch_recent(
        &self,
        session_id: SessionId,
        limit: usize,
    ) -> Result<Vec<Message>, SessionStoreError> {
        let sessions = self.sessions.lock().unwrap();
        let messages = sessions
            .get(&session_id)
            .map(|s| {
                let start = s.messages.len().saturating_sub(limit);
                s.messages[start..].to_vec()
            })
            .unwrap_or_default();
        Ok(messages)
    }

    async fn fetch_all(&self, session_id: SessionId) -> Result<Vec<Message>, SessionStoreError> {
        let sessions = self.sessions.lock().unwrap();
        Ok(sessions
            .get(&session_id)
            .map(|s| s.messages.clone())
            .unwrap_or_default())
    }

    async fn message_count(&self, session_id: SessionId) -> Result<usize, SessionStoreError> {
        let sessions = self.sessions.lock().unwrap();
        Ok(sessions.get(&session_id).map(|s| s.messages.len()).unwrap_or(0))
    }

    async fn store_summary(
        &self,
        session_id: SessionId,
        summary: String,
    ) -> Result<(), SessionStoreError> {
        let mut sessions = self.sessions.lock().unwrap();
        sessions.entry(session_id).or_default().summary = Some(summary);
        Ok(())
    }

    async fn load_summary(
        &self,
        session_id: SessionId,
    ) -> Result<Option<String>, SessionStoreError> {
        let sessions = self.sessions.lock().unwrap();
        Ok(sessions.get(&session_id).and_then(|s| s.summary.clone()))
    }

    async fn remove_oldest(
        &self,
        session_id: SessionId,
        count: usize,
    ) -> Result<(), SessionStoreError> {
        let mut sessions = self.sessions.lock().unwrap();
        if let Some(session) = sessions.get_mut(&session_id) {
            let count = count.min(session.messages.len());
            session.messages.drain(..count);
        }
        Ok(())
    }
}
