//! Streaming errors.

use thiserror::Error;

/// Errors that can occur while decoding or driving a stream.
#[derive(Debug, Error)]
pub enum StreamError {
    /// Endpoint answered with a non-success status.
    #[error("connection failed with status {status}")]
    ConnectionFailed {
        /// The HTTP status code.
        status: u16,
    },

    /// The request could not be issued or the connection dropped.
    #[error("connection failed: {0}")]
    Connection(String),

    /// The server reported a terminal error event; carries the
    /// server-supplied message verbatim.
    #[error("upstream error: {0}")]
    Upstream(String),

    /// The pending-line buffer grew past its cap without a line break.
    #[error("frame buffer overflow")]
    BufferOverflow,

    /// IO error from the underlying byte source.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream was cancelled by the caller.
    #[error("stream cancelled")]
    Cancelled,
}

impl StreamError {
    /// True for caller-initiated aborts, which must never reach the
    /// user-visible error field.
    #[must_use]
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Result type for streaming operations.
pub type StreamResult<T> = Result<T, StreamError>;
