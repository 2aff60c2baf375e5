//! Wire events and per-line payload decoding.
//!
//! Payload lines carry the `data:` prefix followed by a JSON object with
//! a `type` tag. Blank separator lines, `:` comments, and other fields
//! are ignored.

use serde::{Deserialize, Serialize};

/// Prefix marking a payload line.
const DATA_PREFIX: &str = "data:";

/// One decoded wire event.
///
/// Exactly one variant tag per payload. Tags this client does not
/// understand decode to [`WireEvent::Unknown`] and are dropped by the
/// parser, never fatal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WireEvent {
    /// Stream opened; carries the ids minted for this exchange.
    #[serde(rename_all = "camelCase")]
    Start {
        /// Id assigned to the user's message.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        user_message_id: Option<String>,
        /// Id the assistant reply will be stored under.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        assistant_message_id: Option<String>,
        /// Session the exchange belongs to.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session_id: Option<String>,
    },

    /// One increment of assistant text.
    #[serde(rename_all = "camelCase")]
    Token {
        /// The text delta.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<String>,
    },

    /// Terminal success marker.
    #[serde(rename_all = "camelCase")]
    Done {
        /// Id the assembled reply was stored under, when the `start`
        /// event did not already carry it.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        assistant_message_id: Option<String>,
    },

    /// Terminal failure reported by the server.
    Error {
        /// Server-supplied message.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },

    /// Any tag this client does not understand.
    #[serde(other)]
    Unknown,
}

/// Per-line payload filter and decoder.
///
/// A malformed payload line is skipped, never fatal; the count of skipped
/// lines is kept so callers can observe partial data loss.
#[derive(Debug, Default)]
pub struct EventParser {
    malformed_lines: u64,
}

impl EventParser {
    /// Create a new event parser.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode one line.
    ///
    /// Returns `None` for non-payload lines, blank separators, unknown
    /// tags, and payloads that fail to decode.
    pub fn parse_line(&mut self, line: &str) -> Option<WireEvent> {
        let payload = line.strip_prefix(DATA_PREFIX)?.trim();
        if payload.is_empty() {
            return None;
        }

        match serde_json::from_str::<WireEvent>(payload) {
            Ok(WireEvent::Unknown) => {
                tracing::debug!(payload, "ignoring unrecognized event tag");
                None
            }
            Ok(event) => Some(event),
            Err(error) => {
                self.malformed_lines += 1;
                tracing::warn!(%error, payload, "skipping malformed event payload");
                None
            }
        }
    }

    /// Payload lines that failed structured decoding so far.
    #[must_use]
    pub fn malformed_lines(&self) -> u64 {
        self.malformed_lines
    }
}
