//! # classchat-client
//!
//! The client side of the classchat streaming pipe: the transport seam,
//! single-flight stream session control with cooperative cancellation,
//! and the [`ChatPipe`] façade every chat surface talks to.
//!
//! ## Core Concepts
//!
//! - **[`ChatPipe`]**: `send` / `cancel` plus state accessors; the only
//!   surface other UI code may depend on
//! - **[`StreamTransport`]**: "a fetch-like call that streams a body" —
//!   credentials and timeouts ride on the injected [`reqwest::Client`]
//! - **[`StreamSessionController`]**: at most one live stream per pipe;
//!   a new send cancels and replaces the previous stream, never queues
//!   behind it
//!
//! ## Example
//!
//! ```ignore
//! use classchat_client::{ChatPipe, SendRequest};
//!
//! let pipe = ChatPipe::new("https://api.example.edu/chat/stream");
//! pipe.send(SendRequest::new("Explain fractions").with_session("sess_1")).await?;
//! println!("{}", pipe.current_response());
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod error;
pub mod pipe;
pub mod session;
pub mod transport;

pub use error::{PipeError, TransportError};
pub use pipe::ChatPipe;
pub use session::StreamSessionController;
pub use transport::{ByteStream, HttpTransport, SendRequest, StreamTransport};

/// Prelude for common imports.
pub mod prelude {
    pub use crate::{ChatPipe, HttpTransport, PipeError, SendRequest, StreamTransport};
}
