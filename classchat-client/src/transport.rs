//! Transport seam: anything that can open a long-lived streaming request.
//!
//! The pipe only requires a call that streams a body and releases the
//! connection on drop. Credentials are the implementation's concern; the
//! default [`HttpTransport`] carries them on the injected
//! [`reqwest::Client`].

use crate::error::TransportError;
use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::Client;
use serde::Serialize;
use std::pin::Pin;
use url::Url;

/// Byte stream handed back by a transport.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send>>;

/// Inputs for one send, carried as query parameters on the GET.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendRequest {
    /// The user's message text.
    pub message: String,

    /// Session to append to, when continuing a conversation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    /// Student the reply should be personalized for.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_id: Option<String>,

    /// Free-form context tag, e.g. a homework assignment id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

impl SendRequest {
    /// Request carrying just a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    /// Continue an existing session.
    #[must_use]
    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Personalize for a student.
    #[must_use]
    pub fn with_student(mut self, student_id: impl Into<String>) -> Self {
        self.student_id = Some(student_id.into());
        self
    }

    /// Attach a context tag.
    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

/// Anything that can open a streaming request against a target.
#[async_trait]
pub trait StreamTransport: Send + Sync {
    /// Open the request; resolve to a byte stream once headers are in.
    ///
    /// A non-success status must surface as an error here, not as an
    /// empty stream.
    async fn open(&self, target: &str, request: &SendRequest)
        -> Result<ByteStream, TransportError>;
}

/// reqwest-backed transport issuing a streaming GET.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Transport over a default client.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a caller-supplied client (auth headers, timeouts, proxies).
    #[must_use]
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }
}

#[async_trait]
impl StreamTransport for HttpTransport {
    async fn open(
        &self,
        target: &str,
        request: &SendRequest,
    ) -> Result<ByteStream, TransportError> {
        let url = Url::parse(target)?;
        let response = self.client.get(url).query(request).send().await?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "stream request rejected");
            return Err(TransportError::Status(status.as_u16()));
        }

        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(std::io::Error::other));
        Ok(Box::pin(stream))
    }
}
