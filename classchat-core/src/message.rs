//! Chat message types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identifier::{generate_message_id, now_utc};

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// The person typing into the chat surface.
    User,
    /// The streamed reply.
    Assistant,
}

/// A single message within a chat session.
///
/// An assistant message is assembled exactly once, when its stream
/// settles on `done`; it is never emitted partially.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Wire-assigned id (`msg_…` for client-minted ones).
    pub id: String,
    /// Session the message belongs to, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Who authored the message.
    pub role: ChatRole,
    /// Full message text.
    pub content: String,
    /// When the message was assembled.
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    /// Create a message with an explicit id.
    pub fn new(
        id: impl Into<String>,
        session_id: Option<String>,
        role: ChatRole,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            session_id,
            role,
            content: content.into(),
            timestamp: now_utc(),
        }
    }

    /// An optimistic user message with a freshly minted id.
    pub fn user(session_id: Option<String>, content: impl Into<String>) -> Self {
        Self::new(generate_message_id(), session_id, ChatRole::User, content)
    }

    /// The assistant message assembled from a settled stream.
    pub fn assistant(
        id: impl Into<String>,
        session_id: Option<String>,
        content: impl Into<String>,
    ) -> Self {
        Self::new(id, session_id, ChatRole::Assistant, content)
    }
}
