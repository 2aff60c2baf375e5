//! Byte-stream to event-stream adapter.

use crate::error::{StreamError, StreamResult};
use crate::frame::FrameDecoder;
use crate::wire::{EventParser, WireEvent};
use bytes::Bytes;
use futures::Stream;
use pin_project_lite::pin_project;
use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

pin_project! {
    /// Adapter that decodes wire events out of a raw byte stream.
    ///
    /// Waiting for the next network chunk is the pipeline's only
    /// suspension point. Every event a chunk completes is queued and
    /// handed out one per poll, in arrival order.
    pub struct WireEventStream<S> {
        #[pin]
        inner: S,
        decoder: FrameDecoder,
        parser: EventParser,
        queue: VecDeque<WireEvent>,
        finished: bool,
    }
}

impl<S> WireEventStream<S>
where
    S: Stream<Item = Result<Bytes, std::io::Error>>,
{
    /// Create a new event stream over a byte stream.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            decoder: FrameDecoder::new(),
            parser: EventParser::new(),
            queue: VecDeque::new(),
            finished: false,
        }
    }

    /// Payload lines that failed structured decoding so far.
    #[must_use]
    pub fn malformed_lines(&self) -> u64 {
        self.parser.malformed_lines()
    }
}

impl<S> Stream for WireEventStream<S>
where
    S: Stream<Item = Result<Bytes, std::io::Error>>,
{
    type Item = StreamResult<WireEvent>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        loop {
            if let Some(event) = this.queue.pop_front() {
                return Poll::Ready(Some(Ok(event)));
            }

            if *this.finished {
                return Poll::Ready(None);
            }

            match this.inner.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(bytes))) => {
                    let lines = match this.decoder.feed(&bytes) {
                        Ok(lines) => lines,
                        Err(error) => return Poll::Ready(Some(Err(error))),
                    };
                    for line in lines {
                        if let Some(event) = this.parser.parse_line(&line) {
                            this.queue.push_back(event);
                        }
                    }
                }
                Poll::Ready(Some(Err(error))) => {
                    return Poll::Ready(Some(Err(StreamError::Io(error))));
                }
                Poll::Ready(None) => {
                    this.decoder.finish();
                    *this.finished = true;
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::{stream, StreamExt};
    use pretty_assertions::assert_eq;

    fn chunks(parts: &[&str]) -> Vec<Result<Bytes, std::io::Error>> {
        parts
            .iter()
            .map(|p| Ok(Bytes::copy_from_slice(p.as_bytes())))
            .collect()
    }

    async fn collect(parts: &[&str]) -> Vec<WireEvent> {
        let mut events = Vec::new();
        let mut stream = WireEventStream::new(stream::iter(chunks(parts)));
        while let Some(item) = stream.next().await {
            events.push(item.unwrap());
        }
        events
    }

    #[tokio::test]
    async fn test_events_across_chunk_boundaries() {
        let whole = collect(&[
            "data: {\"type\":\"token\",\"content\":\"Hel\"}\n\ndata: {\"type\":\"token\",\"content\":\"lo\"}\n\n",
        ])
        .await;

        let split = collect(&[
            "data: {\"type\":\"token\",\"co",
            "ntent\":\"Hel\"}\n\ndata: {\"type\":\"to",
            "ken\",\"content\":\"lo\"}\n\n",
        ])
        .await;

        assert_eq!(whole, split);
        assert_eq!(whole.len(), 2);
    }

    #[tokio::test]
    async fn test_malformed_line_skipped_stream_continues() {
        let parts = [
            "data: {\"type\":\"token\",\"content\":\"a\"}\n",
            "data: {broken\n",
            "data: {\"type\":\"token\",\"content\":\"b\"}\n",
        ];
        let mut stream = WireEventStream::new(stream::iter(chunks(&parts)));

        let mut events = Vec::new();
        while let Some(item) = stream.next().await {
            events.push(item.unwrap());
        }

        assert_eq!(
            events,
            vec![
                WireEvent::Token {
                    content: Some("a".to_string())
                },
                WireEvent::Token {
                    content: Some("b".to_string())
                },
            ]
        );
        assert_eq!(stream.malformed_lines(), 1);
    }

    #[tokio::test]
    async fn test_unterminated_tail_dropped_at_eof() {
        let events = collect(&[
            "data: {\"type\":\"done\"}\ndata: {\"type\":\"token\",\"content\":\"tail",
        ])
        .await;

        assert_eq!(
            events,
            vec![WireEvent::Done {
                assistant_message_id: None
            }]
        );
    }

    #[tokio::test]
    async fn test_io_error_surfaces() {
        let items: Vec<Result<Bytes, std::io::Error>> = vec![
            Ok(Bytes::from_static(b"data: {\"type\":\"token\",\"content\":\"x\"}\n")),
            Err(std::io::Error::other("reset")),
        ];
        let mut stream = WireEventStream::new(stream::iter(items));

        assert!(stream.next().await.unwrap().is_ok());
        let err = stream.next().await.unwrap().unwrap_err();
        assert!(matches!(err, StreamError::Io(_)));
    }
}
