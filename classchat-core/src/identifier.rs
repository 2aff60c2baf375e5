//! ID generation utilities.
//!
//! Backends usually mint the message ids carried on the wire; these
//! helpers cover the client-side cases (optimistic user messages, new
//! sessions started before the first reply).

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Generate a unique message ID.
///
/// # Example
///
/// ```rust
/// use classchat_core::identifier::generate_message_id;
///
/// let id = generate_message_id();
/// assert!(id.starts_with("msg_"));
/// assert_eq!(id.len(), 36); // "msg_" + 32 hex chars
/// ```
#[must_use]
pub fn generate_message_id() -> String {
    format!("msg_{}", Uuid::new_v4().simple())
}

/// Generate a unique session ID.
///
/// # Example
///
/// ```rust
/// use classchat_core::identifier::generate_session_id;
///
/// let id = generate_session_id();
/// assert!(id.starts_with("sess_"));
/// ```
#[must_use]
pub fn generate_session_id() -> String {
    format!("sess_{}", Uuid::new_v4().simple())
}

/// Get the current UTC timestamp.
#[must_use]
pub fn now_utc() -> DateTime<Utc> {
    Utc::now()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_id_unique() {
        let a = generate_message_id();
        let b = generate_message_id();
        assert_ne!(a, b);
    }

    #[test]
    fn test_session_id_prefix() {
        let id = generate_session_id();
        assert!(id.starts_with("sess_"));
        assert_eq!(id.len(), 37);
    }
}
