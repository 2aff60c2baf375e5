//! Response accumulation: the per-stream state machine.
//!
//! Consumes decoded wire events in arrival order, grows the assistant
//! reply, and notifies an observer. A stream settles exactly once — on
//! `done`, on `error`, or silently when the source ends — and delivers
//! nothing after that. An abandoned stream (superseded or cancelled)
//! delivers nothing at all from the moment it is abandoned.

use classchat_core::ChatMessage;

use crate::error::StreamError;
use crate::wire::WireEvent;

/// Phase of one stream's lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamPhase {
    /// No send has been issued.
    #[default]
    Idle,
    /// A send is in flight; tokens may still arrive.
    Streaming,
    /// Terminal: `done`, `error`, or source completion.
    Settled,
}

/// Ids captured from the `start` event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamStart {
    /// Id assigned to the user's message.
    pub user_message_id: Option<String>,
    /// Id the assistant reply will be stored under.
    pub assistant_message_id: Option<String>,
    /// Session the exchange belongs to.
    pub session_id: Option<String>,
}

/// Observer over one stream's lifecycle.
///
/// Callbacks fire synchronously, in decode order, at most once per event,
/// and never after the stream settles. Methods have empty default bodies
/// so call sites implement only what they need. Implementations must be
/// lightweight; blocking delays stream processing.
pub trait StreamObserver: Send + Sync {
    /// The stream opened and announced its ids.
    fn on_start(&self, meta: &StreamStart) {
        let _ = meta;
    }

    /// A token arrived; `text` is the full accumulated reply so far, so
    /// observers can render the running response without keeping their
    /// own concatenation.
    fn on_delta(&self, text: &str) {
        let _ = text;
    }

    /// The stream settled on `done`. `message` is present only when an
    /// assistant message id was captured; `text` is always the final
    /// accumulated reply.
    fn on_done(&self, message: Option<&ChatMessage>, text: &str) {
        let _ = (message, text);
    }

    /// The stream settled on a terminal error.
    fn on_error(&self, error: &str) {
        let _ = error;
    }
}

/// No-op observer for callers that only poll state.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl StreamObserver for NullObserver {}

/// Accumulates wire events into the growing assistant reply.
#[derive(Debug, Default)]
pub struct ResponseAccumulator {
    phase: StreamPhase,
    text: String,
    start: StreamStart,
    error: Option<String>,
    message: Option<ChatMessage>,
    abandoned: bool,
}

impl ResponseAccumulator {
    /// Create an accumulator in the `Idle` phase.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Send-time entry into `Streaming`, before any event arrives.
    pub fn begin(&mut self) {
        if self.phase == StreamPhase::Idle {
            self.phase = StreamPhase::Streaming;
        }
    }

    /// Apply one decoded event, firing observer callbacks in order.
    ///
    /// Events applied after settle or abandonment are dropped.
    pub fn apply(&mut self, event: WireEvent, observer: &dyn StreamObserver) {
        if self.abandoned || self.phase == StreamPhase::Settled {
            return;
        }
        self.phase = StreamPhase::Streaming;

        match event {
            WireEvent::Start {
                user_message_id,
                assistant_message_id,
                session_id,
            } => {
                if user_message_id.is_some() {
                    self.start.user_message_id = user_message_id;
                }
                if assistant_message_id.is_some() {
                    self.start.assistant_message_id = assistant_message_id;
                }
                if session_id.is_some() {
                    self.start.session_id = session_id;
                }
                observer.on_start(&self.start);
            }

            WireEvent::Token { content } => {
                if let Some(content) = &content {
                    self.text.push_str(content);
                }
                observer.on_delta(&self.text);
            }

            WireEvent::Done {
                assistant_message_id,
            } => {
                if assistant_message_id.is_some() {
                    self.start.assistant_message_id = assistant_message_id;
                }
                self.message = self.start.assistant_message_id.clone().map(|id| {
                    ChatMessage::assistant(id, self.start.session_id.clone(), self.text.clone())
                });
                self.phase = StreamPhase::Settled;
                observer.on_done(self.message.as_ref(), &self.text);
            }

            WireEvent::Error { error } => {
                let message = error.unwrap_or_else(|| "unknown upstream error".to_string());
                self.fail(StreamError::Upstream(message), observer);
            }

            WireEvent::Unknown => {}
        }
    }

    /// Route a failure through the terminal `error` path.
    ///
    /// A cancellation abandons the stream instead of settling it: a
    /// caller-initiated abort is never a user-visible error.
    pub fn fail(&mut self, error: StreamError, observer: &dyn StreamObserver) {
        if self.abandoned || self.phase == StreamPhase::Settled {
            return;
        }
        if error.is_cancellation() {
            self.abandon();
            return;
        }
        let message = match &error {
            StreamError::Upstream(message) => message.clone(),
            other => other.to_string(),
        };
        self.settle_with_error(message, observer);
    }

    /// Natural source completion without a terminal event: settle
    /// silently, with no callback and no error.
    pub fn finish(&mut self) {
        self.phase = StreamPhase::Settled;
    }

    /// Retire the stream; every further callback is suppressed,
    /// including any the retirement itself caused.
    pub fn abandon(&mut self) {
        self.abandoned = true;
    }

    fn settle_with_error(&mut self, message: String, observer: &dyn StreamObserver) {
        self.phase = StreamPhase::Settled;
        observer.on_error(self.error.insert(message));
    }

    /// Current lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> StreamPhase {
        self.phase
    }

    /// The accumulated reply text so far.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Ids captured from the `start` event.
    #[must_use]
    pub fn start(&self) -> &StreamStart {
        &self.start
    }

    /// Terminal error, when the stream settled on one.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// The assembled assistant message, once settled on `done` with a
    /// captured id.
    #[must_use]
    pub fn message(&self) -> Option<&ChatMessage> {
        self.message.as_ref()
    }

    /// True once the stream has reached its terminal phase.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.phase == StreamPhase::Settled
    }

    /// True if the stream was retired by cancellation or supersession.
    #[must_use]
    pub fn is_abandoned(&self) -> bool {
        self.abandoned
    }
}
