//! Stream transport abstraction
//!
//! The manager only needs "open a named endpoint, give me text frames".
//! Production uses [`SseTransport`] over server-sent events; tests inject
//! scripted transports through the [`StreamTransport`] trait.

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use reqwest_eventsource::{Event, RequestBuilderExt};
use thiserror::Error;
use url::Url;

/// Stream of raw text frames from one transport connection
///
/// The stream ends (or yields an error) when the connection is lost; the
/// manager decides whether and when to reconnect.
pub type TransportStream = BoxStream<'static, Result<String, TransportError>>;

/// Transport-level failure
///
/// Every variant is transient from the manager's point of view.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The connection could not be opened
    #[error("failed to open stream: {0}")]
    Connect(String),

    /// The open connection failed mid-stream
    #[error("stream transport error: {0}")]
    Stream(String),

    /// The endpoint did not form a valid URL
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(#[from] url::ParseError),
}

/// A way of opening a push-update connection to a named endpoint
#[async_trait]
pub trait StreamTransport: Send + Sync {
    /// Open a new connection and return its frame stream
    async fn connect(&self, endpoint: &str) -> Result<TransportStream, TransportError>;
}

/// Server-sent-events transport
///
/// Connects with a plain GET and reads the event stream. Reconnection is
/// owned by the manager, not this transport: the first mid-stream error
/// closes the event source and ends the frame stream.
pub struct SseTransport {
    http: reqwest::Client,
    base_url: Url,
}

impl SseTransport {
    /// Create a transport rooted at a base URL
    ///
    /// Endpoint names passed to [`connect`](StreamTransport::connect) are
    /// resolved relative to this base, so it should end with a slash
    /// (e.g. `https://game.example/api/`).
    pub fn new(base_url: &str) -> Result<Self, TransportError> {
        Ok(Self {
            http: reqwest::Client::new(),
            base_url: Url::parse(base_url)?,
        })
    }

    /// Create a transport reusing an existing HTTP client
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }
}

#[async_trait]
impl StreamTransport for SseTransport {
    async fn connect(&self, endpoint: &str) -> Result<TransportStream, TransportError> {
        let url = self.base_url.join(endpoint)?;

        let source = self
            .http
            .get(url.clone())
            .eventsource()
            .map_err(|err| TransportError::Connect(err.to_string()))?;

        tracing::debug!(url = %url, "SSE transport connecting");

        let stream = futures::stream::unfold(Some(source), |state| async move {
            let mut source = state?;
            loop {
                match source.next().await {
                    Some(Ok(Event::Open)) => continue,
                    Some(Ok(Event::Message(message))) => {
                        return Some((Ok(message.data), Some(source)));
                    }
                    Some(Err(err)) => {
                        // The event source retries internally unless closed;
                        // close it so the manager owns the retry policy.
                        source.close();
                        return Some((Err(TransportError::Stream(err.to_string())), None));
                    }
                    None => return None,
                }
            }
        });

        Ok(Box::pin(stream))
    }
}
