//! Message entity for repair conversations.
//!
//! Messages are immutable records of the exchanges within a session.
//! Each message has a role (system/user/assistant/tool), content, and
//! timestamp. Tool messages carry the combined results of one tool batch.

use crate::domain::foundation::{DomainError, Timestamp};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a message within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(Uuid);

impl MessageId {
    /// Creates a new random MessageId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a MessageId from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Role of a message sender in a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// System instructions or stored conversation summary.
    System,
    /// User input.
    User,
    /// Reasoning engine response.
    Assistant,
    /// Combined results of one tool batch, fed back to the engine.
    Tool,
}

impl Role {
    /// Returns true if this is a user-visible role.
    pub fn is_user_visible(&self) -> bool {
        matches!(self, Self::User | Self::Assistant)
    }
}

/// An immutable message within a session.
///
/// # Invariants
///
/// - `id` is globally unique
/// - `content` is non-empty (validated at construction)
/// - `created_at` is set at construction and never changes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    id: MessageId,
    role: Role,
    content: String,
    created_at: Timestamp,
}

impl Message {
    /// Creates a new message with the given role and content.
    ///
    /// # Errors
    ///
    /// - `ValidationFailed` if content is empty
    pub fn new(role: Role, content: impl Into<String>) -> Result<Self, DomainError> {
        let content = content.into();
        if content.trim().is_empty() {
            return Err(DomainError::validation(
                "content",
                "Message content cannot be empty",
            ));
        }

        Ok(Self {
            id: MessageId::new(),
            role,
            content,
            created_at: Timestamp::now(),
        })
    }

    /// Creates a user message.
    pub fn user(content: impl Into<String>) -> Result<Self, DomainError> {
        Self::new(Role::User, content)
    }

    /// Creates an assistant message.
    pub fn assistant(content: impl Into<String>) -> Result<Self, DomainError> {
        Self::new(Role::Assistant, content)
    }

    /// Creates a system message.
    pub fn system(content: impl Into<String>) -> Result<Self, DomainError> {
        Self::new(Role::System, content)
    }

    /// Creates a tool-turn message.
    pub fn tool(content: impl Into<String>) -> Result<Self, DomainError> {
        Self::new(Role::Tool, content)
    }

    /// Reconstitutes a message from persistence (no validation).
    pub fn reconstitute(id: MessageId, role: Role, content: String, created_at: Timestamp) -> Self {
        Self {
            id,
            role,
            content,
            created_at,
        }
    }

    /// Returns the message ID.
    pub fn id(&self) -> &MessageId {
        &self.id
    }

    /// Returns the role.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Returns the content.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Returns when the message was created.
    pub fn created_at(&self) -> &Timestamp {
        &self.created_at
    }

    /// Returns true if this message is from the user.
    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }

    /// Returns true if this message is from the assistant.
    pub fn is_assistant(&self) -> bool {
        self.role == Role::Assistant
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod role {
        use super::*;

        #[test]
        fn user_and_assistant_are_visible() {
            assert!(Role::User.is_user_visible());
            assert!(Role::Assistant.is_user_visible());
        }

        #[test]
        fn system_and_tool_are_not_visible() {
            assert!(!Role::System.is_user_visible());
            assert!(!Role::Tool.is_user_visible());
        }

        #[test]
        fn serializes_to_snake_case() {
            assert_eq!(serde_json::to_string(&Role::Tool).unwrap(), "\"tool\"");
            assert_eq!(serde_json::to_string(&Role::User).unwrap(), "\"user\"");
        }
    }

    mod construction {
        use super::*;

        #[test]
        fn constructors_set_role() {
            assert_eq!(Message::user("hi").unwrap().role(), Role::User);
            assert_eq!(Message::assistant("hi").unwrap().role(), Role::Assistant);
            assert_eq!(Message::system("hi").unwrap().role(), Role::System);
            assert_eq!(Message::tool("{}").unwrap().role(), Role::Tool);
        }

        #[test]
        fn rejects_empty_content() {
            assert!(Message::user("").is_err());
        }

        #[test]
        fn rejects_whitespace_only_content() {
            assert!(Message::user("   \n\t").is_err());
        }

        #[test]
        fn sets_created_at() {
            let msg = Message::user("Hello").unwrap();
            let now = Timestamp::now();
            assert!(msg.created_at().as_datetime() <= now.as_datetime());
        }

        #[test]
        fn ids_are_unique() {
            let a = Message::user("a").unwrap();
            let b = Message::user("b").unwrap();
            assert_ne!(a.id(), b.id());
        }
    }

    mod reconstitute {
        use super::*;

        #[test]
        fn preserves_all_fields() {
            let id = MessageId::new();
            let created_at = Timestamp::now();

            let msg = Message::reconstitute(id, Role::Tool, "results".to_string(), created_at);

            assert_eq!(msg.id(), &id);
            assert_eq!(msg.role(), Role::Tool);
            assert_eq!(msg.content(), "results");
            assert_eq!(msg.created_at(), &created_at);
        }
    }
}
