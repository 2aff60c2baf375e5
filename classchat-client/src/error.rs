//! Client errors.

use classchat_streaming::StreamError;
use thiserror::Error;

/// Errors surfaced by the transport seam.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Endpoint answered with a non-success status.
    #[error("connection failed with status {0}")]
    Status(u16),

    /// The request could not be issued or the connection dropped before
    /// a response arrived.
    #[error("connection failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The target could not be parsed as a URL.
    #[error("invalid stream target: {0}")]
    Target(#[from] url::ParseError),
}

impl From<TransportError> for StreamError {
    fn from(error: TransportError) -> Self {
        match error {
            TransportError::Status(status) => StreamError::ConnectionFailed { status },
            TransportError::Request(error) => StreamError::Connection(error.to_string()),
            TransportError::Target(error) => StreamError::Connection(error.to_string()),
        }
    }
}

/// Errors returned by pipe operations.
///
/// Stream-level failures do not surface here; they settle into the
/// pipe's observable error state instead.
#[derive(Debug, Error)]
pub enum PipeError {
    /// A stream is already in flight for this pipe; callers must check
    /// readiness before sending.
    #[error("a stream is already in flight")]
    Busy,
}
