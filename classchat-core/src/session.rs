//! Session metadata and the persistence collaborator seam.
//!
//! Chat surfaces load prior messages on mount through [`SessionStore`].
//! The streaming pipe itself never touches persistence; the trait exists
//! so UI code and the pipe can share one set of domain types.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::message::ChatMessage;

/// Metadata for one chat session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    /// Session id (`sess_…`).
    pub id: String,
    /// Display title, when the backend has assigned one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
}

/// A session together with its prior messages, as returned on mount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionHistory {
    /// The session metadata.
    pub session: SessionInfo,
    /// Messages in chronological order.
    pub messages: Vec<ChatMessage>,
}

/// Errors from the persistence collaborator.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No session with the given id.
    #[error("session not found: {0}")]
    NotFound(String),

    /// The backing service failed.
    #[error("session store error: {0}")]
    Backend(String),
}

/// Read-side seam over the session persistence service.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Fetch a session and its prior messages.
    async fn fetch_history(&self, session_id: &str) -> Result<SessionHistory, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifier::now_utc;

    #[test]
    fn test_history_round_trip() {
        let history = SessionHistory {
            session: SessionInfo {
                id: "sess_1".to_string(),
                title: Some("Algebra help".to_string()),
                created_at: now_utc(),
            },
            messages: vec![ChatMessage::user(Some("sess_1".to_string()), "hi")],
        };

        let json = serde_json::to_string(&history).unwrap();
        let parsed: SessionHistory = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, history);
    }

    #[test]
    fn test_store_error_display() {
        let err = StoreError::NotFound("sess_9".to_string());
        assert_eq!(err.to_string(), "session not found: sess_9");
    }

    struct EmptyStore;

    #[async_trait]
    impl SessionStore for EmptyStore {
        async fn fetch_history(&self, session_id: &str) -> Result<SessionHistory, StoreError> {
            Err(StoreError::NotFound(session_id.to_string()))
        }
    }

    #[tokio::test]
    async fn test_store_seam_is_object_safe() {
        let store: Box<dyn SessionStore> = Box::new(EmptyStore);
        let result = store.fetch_history("sess_1").await;
        assert!(matches!(result, Err(StoreError::NotFound(id)) if id == "sess_1"));
    }
}
