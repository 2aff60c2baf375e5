//! The pipe façade: the single entry point chat surfaces depend on.

use crate::error::PipeError;
use crate::session::StreamSessionController;
use crate::transport::{HttpTransport, SendRequest, StreamTransport};
use classchat_core::ChatMessage;
use classchat_streaming::{ResponseAccumulator, StreamObserver, StreamStart};
use parking_lot::Mutex;
use std::sync::Arc;

/// Poller-visible snapshot of one pipe's transient state.
#[derive(Debug, Clone, Default)]
struct PipeState {
    is_streaming: bool,
    current_response: String,
    error: Option<String>,
    last_message: Option<ChatMessage>,
    malformed_lines: u64,
}

/// Client-side streaming pipe for one chat surface.
///
/// Owns a single-flight session: a send while a stream is live is
/// rejected, a send after cancel is accepted immediately, and the state
/// accessors reflect the running reply as tokens arrive. Cancellation is
/// never surfaced as a user-visible error.
///
/// # Example
///
/// ```ignore
/// use classchat_client::{ChatPipe, SendRequest};
///
/// let pipe = ChatPipe::new("https://api.example.edu/chat/stream");
/// pipe.send(SendRequest::new("Explain fractions").with_session("sess_1")).await?;
/// if let Some(reply) = pipe.last_message() {
///     println!("{}", reply.content);
/// }
/// ```
pub struct ChatPipe {
    target: String,
    transport: Arc<dyn StreamTransport>,
    controller: StreamSessionController,
    observer: Option<Arc<dyn StreamObserver>>,
    state: Arc<Mutex<PipeState>>,
}

impl ChatPipe {
    /// Pipe over the default HTTP transport.
    pub fn new(target: impl Into<String>) -> Self {
        Self::with_transport(target, Arc::new(HttpTransport::new()))
    }

    /// Pipe over a caller-supplied transport (authenticated client,
    /// test double).
    pub fn with_transport(target: impl Into<String>, transport: Arc<dyn StreamTransport>) -> Self {
        Self {
            target: target.into(),
            transport,
            controller: StreamSessionController::new(),
            observer: None,
            state: Arc::new(Mutex::new(PipeState::default())),
        }
    }

    /// Attach a lifecycle observer.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn StreamObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Stream one reply to completion.
    ///
    /// Rejects with [`PipeError::Busy`] while a stream is live; callers
    /// check [`is_streaming`](Self::is_streaming) first. Stream-level
    /// failures settle into [`error`](Self::error) rather than returning
    /// `Err`; the future resolves once the stream settles or is
    /// cancelled, and `is_streaming` is cleared on every exit path.
    pub async fn send(&self, request: SendRequest) -> Result<(), PipeError> {
        {
            let mut state = self.state.lock();
            if state.is_streaming {
                return Err(PipeError::Busy);
            }
            state.is_streaming = true;
            state.current_response.clear();
            state.error = None;
            state.last_message = None;
        }

        let mut accumulator = ResponseAccumulator::new();
        let mirror = MirrorObserver {
            state: Arc::clone(&self.state),
            next: self.observer.clone(),
        };
        let report = self
            .controller
            .run(
                self.transport.as_ref(),
                &self.target,
                &request,
                &mut accumulator,
                &mirror,
            )
            .await;

        // A superseded run must not clobber the state its successor owns.
        let still_current = self.controller.current_generation() == report.generation;
        let mut state = self.state.lock();
        state.malformed_lines += report.malformed_lines;
        if still_current {
            state.is_streaming = false;
        }
        Ok(())
    }

    /// Cancel the live stream, if any.
    ///
    /// Idempotent. Suppresses every further callback from the cancelled
    /// stream, including the abort it causes itself; the error field
    /// stays untouched.
    pub fn cancel(&self) {
        if self.controller.cancel() {
            tracing::debug!("stream cancelled by caller");
        }
        self.state.lock().is_streaming = false;
    }

    /// True while a stream is live.
    #[must_use]
    pub fn is_streaming(&self) -> bool {
        self.state.lock().is_streaming
    }

    /// The running reply text, growing as tokens arrive.
    #[must_use]
    pub fn current_response(&self) -> String {
        self.state.lock().current_response.clone()
    }

    /// Terminal error of the most recent stream, if it failed.
    #[must_use]
    pub fn error(&self) -> Option<String> {
        self.state.lock().error.clone()
    }

    /// The assistant message assembled by the most recent settled stream.
    #[must_use]
    pub fn last_message(&self) -> Option<ChatMessage> {
        self.state.lock().last_message.clone()
    }

    /// Malformed payload lines skipped over this pipe's lifetime.
    #[must_use]
    pub fn malformed_lines(&self) -> u64 {
        self.state.lock().malformed_lines
    }
}

/// Keeps the poller-visible snapshot in lockstep with the observer
/// callbacks, then forwards to the caller's observer.
struct MirrorObserver {
    state: Arc<Mutex<PipeState>>,
    next: Option<Arc<dyn StreamObserver>>,
}

impl StreamObserver for MirrorObserver {
    fn on_start(&self, meta: &StreamStart) {
        if let Some(next) = &self.next {
            next.on_start(meta);
        }
    }

    fn on_delta(&self, text: &str) {
        self.state.lock().current_response = text.to_string();
        if let Some(next) = &self.next {
            next.on_delta(text);
        }
    }

    fn on_done(&self, message: Option<&ChatMessage>, text: &str) {
        {
            let mut state = self.state.lock();
            state.current_response = text.to_string();
            state.last_message = message.cloned();
        }
        if let Some(next) = &self.next {
            next.on_done(message, text);
        }
    }

    fn on_error(&self, error: &str) {
        self.state.lock().error = Some(error.to_string());
        if let Some(next) = &self.next {
            next.on_error(error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::transport::ByteStream;
    use async_trait::async_trait;
    use bytes::Bytes;
    use futures::channel::mpsc;
    use futures::{stream, SinkExt};
    use pretty_assertions::assert_eq;
    use std::collections::VecDeque;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<String>>,
    }

    impl Recorder {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().clone()
        }
    }

    impl StreamObserver for Recorder {
        fn on_start(&self, meta: &StreamStart) {
            self.calls.lock().push(format!(
                "start:{}",
                meta.assistant_message_id.as_deref().unwrap_or("-")
            ));
        }

        fn on_delta(&self, text: &str) {
            self.calls.lock().push(format!("delta:{text}"));
        }

        fn on_done(&self, message: Option<&ChatMessage>, text: &str) {
            let id = message.map_or("-", |m| m.id.as_str());
            self.calls.lock().push(format!("done:{id}:{text}"));
        }

        fn on_error(&self, error: &str) {
            self.calls.lock().push(format!("error:{error}"));
        }
    }

    struct ScriptedTransport {
        streams: Mutex<VecDeque<Result<ByteStream, TransportError>>>,
    }

    impl ScriptedTransport {
        fn new(streams: Vec<Result<ByteStream, TransportError>>) -> Arc<Self> {
            Arc::new(Self {
                streams: Mutex::new(streams.into_iter().collect()),
            })
        }
    }

    #[async_trait]
    impl StreamTransport for ScriptedTransport {
        async fn open(
            &self,
            _target: &str,
            _request: &SendRequest,
        ) -> Result<ByteStream, TransportError> {
            self.streams.lock().pop_front().expect("unexpected open")
        }
    }

    fn static_stream(parts: &[&str]) -> ByteStream {
        let chunks: Vec<Result<Bytes, std::io::Error>> = parts
            .iter()
            .map(|p| Ok(Bytes::copy_from_slice(p.as_bytes())))
            .collect();
        Box::pin(stream::iter(chunks))
    }

    fn channel_stream() -> (mpsc::Sender<Result<Bytes, std::io::Error>>, ByteStream) {
        let (tx, rx) = mpsc::channel(16);
        (tx, Box::pin(rx))
    }

    async fn wait_until(mut cond: impl FnMut() -> bool) {
        for _ in 0..10_000 {
            if cond() {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("condition not reached");
    }

    const HAPPY_BODY: &[&str] = &[
        "data: {\"type\":\"start\",\"assistantMessageId\":\"m1\",\"sessionId\":\"s1\"}\n\n",
        "data: {\"type\":\"token\",\"content\":\"Hel\"}\n\n",
        "data: {\"type\":\"token\",\"content\":\"lo\"}\n\n",
        "data: {\"type\":\"done\"}\n\n",
    ];

    #[tokio::test]
    async fn test_full_stream_assembles_reply() {
        let observer = Arc::new(Recorder::default());
        let transport = ScriptedTransport::new(vec![Ok(static_stream(HAPPY_BODY))]);
        let pipe = ChatPipe::with_transport("http://test.invalid/stream", transport)
            .with_observer(observer.clone());

        pipe.send(SendRequest::new("hi")).await.unwrap();

        assert_eq!(
            observer.calls(),
            vec!["start:m1", "delta:Hel", "delta:Hello", "done:m1:Hello"]
        );
        assert!(!pipe.is_streaming());
        assert_eq!(pipe.current_response(), "Hello");
        assert_eq!(pipe.error(), None);

        let message = pipe.last_message().unwrap();
        assert_eq!(message.id, "m1");
        assert_eq!(message.content, "Hello");
        assert_eq!(message.session_id.as_deref(), Some("s1"));
    }

    #[tokio::test]
    async fn test_running_response_visible_mid_stream() {
        let (mut tx, stream) = channel_stream();
        let transport = ScriptedTransport::new(vec![Ok(stream)]);
        let pipe = Arc::new(ChatPipe::with_transport("http://test.invalid/s", transport));

        let task = tokio::spawn({
            let pipe = Arc::clone(&pipe);
            async move { pipe.send(SendRequest::new("hi")).await }
        });

        tx.send(Ok(Bytes::from_static(
            b"data: {\"type\":\"token\",\"content\":\"Hel\"}\n\n",
        )))
        .await
        .unwrap();
        wait_until(|| pipe.current_response() == "Hel").await;
        assert!(pipe.is_streaming());

        tx.send(Ok(Bytes::from_static(
            b"data: {\"type\":\"token\",\"content\":\"lo\"}\n\ndata: {\"type\":\"done\"}\n\n",
        )))
        .await
        .unwrap();
        task.await.unwrap().unwrap();

        assert_eq!(pipe.current_response(), "Hello");
        assert!(!pipe.is_streaming());
    }

    #[tokio::test]
    async fn test_send_while_streaming_is_rejected() {
        let (_tx, stream) = channel_stream();
        let transport = ScriptedTransport::new(vec![Ok(stream)]);
        let pipe = Arc::new(ChatPipe::with_transport("http://test.invalid/s", transport));

        let task = tokio::spawn({
            let pipe = Arc::clone(&pipe);
            async move { pipe.send(SendRequest::new("first")).await }
        });
        wait_until(|| pipe.is_streaming()).await;

        let second = pipe.send(SendRequest::new("second")).await;
        assert!(matches!(second, Err(PipeError::Busy)));

        pipe.cancel();
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_cancel_mid_stream_suppresses_callbacks() {
        let observer = Arc::new(Recorder::default());
        let (mut tx, stream) = channel_stream();
        let transport = ScriptedTransport::new(vec![Ok(stream)]);
        let pipe = Arc::new(
            ChatPipe::with_transport("http://test.invalid/s", transport)
                .with_observer(observer.clone()),
        );

        let task = tokio::spawn({
            let pipe = Arc::clone(&pipe);
            async move { pipe.send(SendRequest::new("hi")).await }
        });

        tx.send(Ok(Bytes::from_static(
            b"data: {\"type\":\"token\",\"content\":\"Hel\"}\n\n",
        )))
        .await
        .unwrap();
        wait_until(|| pipe.current_response() == "Hel").await;

        pipe.cancel();
        assert!(!pipe.is_streaming());
        task.await.unwrap().unwrap();

        // Events that were still in flight are dropped, not delivered.
        let _ = tx
            .send(Ok(Bytes::from_static(b"data: {\"type\":\"done\"}\n\n")))
            .await;

        assert_eq!(observer.calls(), vec!["delta:Hel"]);
        assert_eq!(pipe.error(), None);
        assert!(pipe.last_message().is_none());
        assert!(!pipe.is_streaming());
    }

    #[tokio::test]
    async fn test_cancel_twice_is_noop() {
        let transport = ScriptedTransport::new(vec![]);
        let pipe = ChatPipe::with_transport("http://test.invalid/s", transport);

        pipe.cancel();
        pipe.cancel();
        assert!(!pipe.is_streaming());
        assert_eq!(pipe.error(), None);
    }

    #[tokio::test]
    async fn test_upstream_error_settles_state() {
        let transport = ScriptedTransport::new(vec![Ok(static_stream(&[
            "data: {\"type\":\"token\",\"content\":\"par\"}\n\n",
            "data: {\"type\":\"error\",\"error\":\"overloaded\"}\n\n",
        ]))]);
        let pipe = ChatPipe::with_transport("http://test.invalid/s", transport);

        pipe.send(SendRequest::new("hi")).await.unwrap();

        assert_eq!(pipe.error().as_deref(), Some("overloaded"));
        assert!(pipe.last_message().is_none());
        assert!(!pipe.is_streaming());
    }

    #[tokio::test]
    async fn test_connection_failure_routes_to_error_state() {
        let observer = Arc::new(Recorder::default());
        let transport = ScriptedTransport::new(vec![Err(TransportError::Status(500))]);
        let pipe = ChatPipe::with_transport("http://test.invalid/s", transport)
            .with_observer(observer.clone());

        pipe.send(SendRequest::new("hi")).await.unwrap();

        let error = pipe.error().unwrap();
        assert!(error.contains("500"), "unexpected error: {error}");
        assert!(!pipe.is_streaming());
        assert!(pipe.last_message().is_none());
        assert_eq!(observer.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_line_does_not_abort_stream() {
        let transport = ScriptedTransport::new(vec![Ok(static_stream(&[
            "data: {\"type\":\"start\",\"assistantMessageId\":\"m1\"}\n\n",
            "data: {not json\n\n",
            "data: {\"type\":\"token\",\"content\":\"Hello\"}\n\n",
            "data: {\"type\":\"done\"}\n\n",
        ]))]);
        let pipe = ChatPipe::with_transport("http://test.invalid/s", transport);

        pipe.send(SendRequest::new("hi")).await.unwrap();

        assert_eq!(pipe.last_message().unwrap().content, "Hello");
        assert_eq!(pipe.malformed_lines(), 1);
        assert_eq!(pipe.error(), None);
    }

    #[tokio::test]
    async fn test_send_after_cancel_supersedes_old_stream() {
        let observer = Arc::new(Recorder::default());
        let (_tx, hung) = channel_stream();
        let quick = static_stream(&[
            "data: {\"type\":\"start\",\"assistantMessageId\":\"m2\"}\n\n",
            "data: {\"type\":\"token\",\"content\":\"Second\"}\n\n",
            "data: {\"type\":\"done\"}\n\n",
        ]);
        let transport = ScriptedTransport::new(vec![Ok(hung), Ok(quick)]);
        let pipe = Arc::new(
            ChatPipe::with_transport("http://test.invalid/s", transport)
                .with_observer(observer.clone()),
        );

        let first = tokio::spawn({
            let pipe = Arc::clone(&pipe);
            async move { pipe.send(SendRequest::new("first")).await }
        });
        wait_until(|| pipe.is_streaming()).await;

        pipe.cancel();
        pipe.send(SendRequest::new("second")).await.unwrap();
        first.await.unwrap().unwrap();

        // The superseded stream contributed nothing and did not clobber
        // its successor's state.
        assert_eq!(
            observer.calls(),
            vec!["start:m2", "delta:Second", "done:m2:Second"]
        );
        assert_eq!(pipe.last_message().unwrap().id, "m2");
        assert!(!pipe.is_streaming());
    }

    fn init_test_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("classchat_client=debug,classchat_streaming=debug")
            .try_init();
    }

    #[tokio::test]
    async fn test_http_round_trip_over_wiremock() {
        init_test_tracing();
        let server = MockServer::start().await;
        let body = HAPPY_BODY.concat();
        Mock::given(method("GET"))
            .and(path("/chat/stream"))
            .and(query_param("message", "what is 2+2?"))
            .and(query_param("sessionId", "sess_1"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
            .mount(&server)
            .await;

        let pipe = ChatPipe::new(format!("{}/chat/stream", server.uri()));
        pipe.send(SendRequest::new("what is 2+2?").with_session("sess_1"))
            .await
            .unwrap();

        assert_eq!(pipe.last_message().unwrap().content, "Hello");
        assert_eq!(pipe.error(), None);
        assert!(!pipe.is_streaming());
    }

    #[tokio::test]
    async fn test_http_500_settles_into_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/chat/stream"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let pipe = ChatPipe::new(format!("{}/chat/stream", server.uri()));
        pipe.send(SendRequest::new("hi")).await.unwrap();

        let error = pipe.error().unwrap();
        assert!(error.contains("500"), "unexpected error: {error}");
        assert!(pipe.last_message().is_none());
        assert!(!pipe.is_streaming());
    }
}
