//! # classchat-streaming
//!
//! The protocol engine of the classchat streaming pipe: incremental frame
//! decoding out of raw network chunks, wire-event parsing, and the
//! accumulation state machine that produces the growing assistant reply.
//!
//! ## Core Concepts
//!
//! - **[`FrameDecoder`]**: byte chunks to complete text lines, partial
//!   lines buffered across arbitrary chunk boundaries
//! - **[`EventParser`]** / **[`WireEvent`]**: `data:`-prefixed payload
//!   lines to typed lifecycle events; malformed payloads are skipped
//! - **[`ResponseAccumulator`]** / **[`StreamObserver`]**: events to the
//!   running reply, with synchronous in-order callbacks
//! - **[`WireEventStream`]**: `futures::Stream` adapter wiring the three
//!   together over any byte stream
//!
//! ## Example
//!
//! ```ignore
//! use classchat_streaming::{NullObserver, ResponseAccumulator, WireEventStream};
//! use futures::StreamExt;
//!
//! let mut events = WireEventStream::new(byte_stream);
//! let mut accumulator = ResponseAccumulator::new();
//! accumulator.begin();
//!
//! while let Some(event) = events.next().await {
//!     accumulator.apply(event?, &NullObserver);
//!     if accumulator.is_settled() {
//!         break;
//!     }
//! }
//! println!("{}", accumulator.text());
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod accumulator;
pub mod error;
pub mod frame;
pub mod stream;
pub mod wire;

pub use accumulator::{
    NullObserver, ResponseAccumulator, StreamObserver, StreamPhase, StreamStart,
};
pub use error::{StreamError, StreamResult};
pub use frame::FrameDecoder;
pub use stream::WireEventStream;
pub use wire::{EventParser, WireEvent};

/// Prelude for common imports.
pub mod prelude {
    pub use crate::{
        NullObserver, ResponseAccumulator, StreamError, StreamObserver, StreamPhase, StreamResult,
        StreamStart, WireEvent, WireEventStream,
    };
}
