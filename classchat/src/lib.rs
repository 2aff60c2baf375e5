//! # classchat
//!
//! Client-side streaming pipe for a conversational education UI.
//!
//! A [`ChatPipe`] opens a long-lived request to a token-streaming
//! endpoint, decodes the line-oriented wire format out of raw network
//! chunks, reassembles it into typed lifecycle events, and drives an
//! accumulation state machine that produces the growing assistant reply —
//! with deterministic single-flight cancellation.
//!
//! ## Quick Start
//!
//! ```ignore
//! use classchat::prelude::*;
//!
//! #[tokio::main]
//! async fn main() {
//!     let pipe = ChatPipe::new("https://api.example.edu/chat/stream");
//!
//!     pipe.send(SendRequest::new("Explain fractions").with_session("sess_1"))
//!         .await
//!         .expect("no stream in flight");
//!
//!     match pipe.error() {
//!         Some(error) => eprintln!("stream failed: {error}"),
//!         None => println!("{}", pipe.current_response()),
//!     }
//! }
//! ```
//!
//! ## Architecture
//!
//! classchat is organized as a workspace of focused crates:
//!
//! - [`core`]: chat messages, sessions, id helpers
//! - [`streaming`]: frame decoder, wire events, response accumulator
//! - [`client`]: transport seam, session controller, the [`ChatPipe`] façade
//!
//! Data flows strictly downward: network bytes → lines → events →
//! accumulated reply → observer callbacks and state accessors.

#![warn(missing_docs)]
#![deny(unsafe_code)]

/// Shared domain types.
pub use classchat_core as core;

/// Wire decoding and response accumulation.
pub use classchat_streaming as streaming;

/// Transport, session control, and the pipe façade.
pub use classchat_client as client;

pub use classchat_client::{ChatPipe, HttpTransport, PipeError, SendRequest, StreamTransport};
pub use classchat_core::{ChatMessage, ChatRole, SessionHistory, SessionInfo, SessionStore};
pub use classchat_streaming::{
    NullObserver, StreamError, StreamObserver, StreamPhase, StreamStart, WireEvent,
};

/// Prelude for common imports.
pub mod prelude {
    pub use crate::{
        ChatMessage, ChatPipe, ChatRole, NullObserver, PipeError, SendRequest, StreamObserver,
        StreamPhase, WireEvent,
    };
}
