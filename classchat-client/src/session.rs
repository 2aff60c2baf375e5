//! Stream session ownership: single-flight cancellation and the read loop.

use crate::transport::{SendRequest, StreamTransport};
use classchat_streaming::{ResponseAccumulator, StreamError, StreamObserver, WireEventStream};
use futures::StreamExt;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

/// Handle over one outstanding request-and-decode pipeline.
#[derive(Debug)]
struct ActiveStream {
    token: CancellationToken,
    generation: u64,
}

#[derive(Debug, Default)]
struct Slot {
    active: Option<ActiveStream>,
    generation: u64,
}

/// What one driven stream reported back to the façade.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RunReport {
    /// Generation of the handle this run owned.
    pub generation: u64,
    /// Malformed payload lines skipped during the run.
    pub malformed_lines: u64,
}

/// Owns at most one live stream per consumer instance and is the only
/// component with lifecycle authority over the underlying connection.
#[derive(Debug, Default)]
pub struct StreamSessionController {
    slot: Mutex<Slot>,
}

impl StreamSessionController {
    /// Create an idle controller.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel the live stream, if any. Idempotent; a second call is a
    /// no-op. Returns whether a stream was actually cancelled.
    pub fn cancel(&self) -> bool {
        let mut slot = self.slot.lock();
        match slot.active.take() {
            Some(active) => {
                active.token.cancel();
                true
            }
            None => false,
        }
    }

    /// True while a stream handle is installed.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.slot.lock().active.is_some()
    }

    /// Install a fresh handle, cancelling any previous one first.
    ///
    /// The old token is cancelled before the new handle becomes visible,
    /// so there is never a window with two live streams.
    fn begin(&self) -> (CancellationToken, u64) {
        let mut slot = self.slot.lock();
        if let Some(prev) = slot.active.take() {
            prev.token.cancel();
        }
        slot.generation += 1;
        let token = CancellationToken::new();
        slot.active = Some(ActiveStream {
            token: token.clone(),
            generation: slot.generation,
        });
        (token, slot.generation)
    }

    /// Release the handle installed by `begin`, unless a newer stream
    /// owns the slot by now.
    fn finish(&self, generation: u64) {
        let mut slot = self.slot.lock();
        if slot
            .active
            .as_ref()
            .is_some_and(|active| active.generation == generation)
        {
            slot.active = None;
        }
    }

    /// Generation of the newest handle ever installed.
    pub(crate) fn current_generation(&self) -> u64 {
        self.slot.lock().generation
    }

    /// Drive one stream to its end: open the request, decode and apply
    /// events, tear down.
    ///
    /// Cancellation is observed at the single suspension point (waiting
    /// for the next event); a cancelled run abandons its accumulator so
    /// nothing still in flight is delivered. The handle is released on
    /// every exit path.
    pub(crate) async fn run(
        &self,
        transport: &dyn StreamTransport,
        target: &str,
        request: &SendRequest,
        accumulator: &mut ResponseAccumulator,
        observer: &dyn StreamObserver,
    ) -> RunReport {
        let (token, generation) = self.begin();
        accumulator.begin();

        let malformed_lines = match transport.open(target, request).await {
            Ok(bytes) => {
                let mut events = WireEventStream::new(bytes);
                if token.is_cancelled() {
                    accumulator.fail(StreamError::Cancelled, observer);
                } else {
                    loop {
                        tokio::select! {
                            biased;
                            _ = token.cancelled() => {
                                tracing::debug!("stream cancelled; dropping events still in flight");
                                accumulator.fail(StreamError::Cancelled, observer);
                                break;
                            }
                            next = events.next() => match next {
                                Some(Ok(event)) => {
                                    accumulator.apply(event, observer);
                                    if accumulator.is_settled() {
                                        break;
                                    }
                                }
                                Some(Err(error)) => {
                                    accumulator.fail(error, observer);
                                    break;
                                }
                                None => {
                                    accumulator.finish();
                                    break;
                                }
                            }
                        }
                    }
                }
                events.malformed_lines()
            }
            Err(error) => {
                tracing::warn!(%error, "failed to open stream");
                if token.is_cancelled() {
                    accumulator.fail(StreamError::Cancelled, observer);
                } else {
                    accumulator.fail(error.into(), observer);
                }
                0
            }
        };

        // Teardown on every exit path: the handle is released here and
        // the response stream dropped with this frame.
        self.finish(generation);

        RunReport {
            generation,
            malformed_lines,
        }
    }
}
