//! SSE transport adapter
//!
//! One streaming connection per user turn. The request carries the utterance
//! in the path and the continuation token / active documents as query
//! parameters; the response is a stream of JSON frames parsed into
//! [`StreamEvent`]s.

use async_stream::stream;
use futures::StreamExt;
use reqwest::Url;
use reqwest_eventsource::{Event, EventSource};
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use tokio_stream::Stream;

use crate::{
    error::{Error, Result},
    events::StreamEvent,
};

/// Default backend base URL
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";

/// An active document serialized into the outgoing request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentContext {
    pub id: String,
    pub title: String,
    pub content: String,
}

/// A stream of chat events. An `Err` item is a transport-level failure;
/// the stream yields nothing further after one.
pub type StreamEventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent>> + Send>>;

/// Client for the chat stream endpoint
#[derive(Debug, Clone)]
pub struct ChatClient {
    client: reqwest::Client,
    base_url: String,
}

impl ChatClient {
    /// Create a client against the given backend base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    /// Get the configured base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Open a streaming connection for one turn.
    ///
    /// `checkpoint_id` is the opaque token from a prior turn, if any.
    /// `documents` is the active subset of the knowledge base; the query
    /// parameter is omitted when it is empty.
    pub fn stream_chat(
        &self,
        input: &str,
        checkpoint_id: Option<&str>,
        documents: &[DocumentContext],
    ) -> Result<StreamEventStream> {
        let url = self.endpoint_url(input, checkpoint_id, documents)?;
        tracing::debug!(%url, "opening chat stream");

        let request = self.client.get(url);
        let event_source = EventSource::new(request)
            .map_err(|e| Error::Sse(format!("failed to open event source: {e}")))?;

        Ok(Box::pin(read_events(event_source)))
    }

    /// Build the request URL for one turn
    fn endpoint_url(
        &self,
        input: &str,
        checkpoint_id: Option<&str>,
        documents: &[DocumentContext],
    ) -> Result<Url> {
        let base = self.base_url.trim_end_matches('/');
        let mut url = Url::parse(&format!(
            "{}/chat_stream/{}",
            base,
            urlencoding::encode(input)
        ))
        .map_err(|e| Error::InvalidBaseUrl(format!("{}: {e}", self.base_url)))?;

        if checkpoint_id.is_some() || !documents.is_empty() {
            let mut pairs = url.query_pairs_mut();
            if let Some(token) = checkpoint_id {
                pairs.append_pair("checkpoint_id", token);
            }
            if !documents.is_empty() {
                pairs.append_pair("documents", &serde_json::to_string(documents)?);
            }
        }

        Ok(url)
    }
}

/// Parse one SSE data payload into a typed event.
///
/// Malformed frames are logged and skipped; they never terminate the stream
/// and prior state stays untouched.
fn parse_frame(data: &str) -> Option<StreamEvent> {
    match serde_json::from_str::<StreamEvent>(data) {
        Ok(frame) => Some(frame),
        Err(e) => {
            tracing::warn!(error = %e, data = %data, "skipping malformed frame");
            None
        }
    }
}

/// Translate raw SSE messages into typed events.
///
/// The `end` frame closes the connection from our side. Any other
/// termination, including a clean server EOF, is surfaced as a single `Err`
/// item and ends the stream; only the `end` frame is a normal close.
fn read_events(mut event_source: EventSource) -> impl Stream<Item = Result<StreamEvent>> {
    stream! {
        while let Some(event) = event_source.next().await {
            match event {
                Ok(Event::Open) => {}
                Ok(Event::Message(msg)) => {
                    if let Some(frame) = parse_frame(&msg.data) {
                        let terminal = frame.is_terminal();
                        yield Ok(frame);
                        if terminal {
                            event_source.close();
                            break;
                        }
                    }
                }
                Err(reqwest_eventsource::Error::StreamEnded) => {
                    // The server hung up without sending `end`
                    yield Err(Error::Sse("connection closed by server".to_string()));
                    event_source.close();
                    break;
                }
                Err(e) => {
                    yield Err(Error::Sse(e.to_string()));
                    event_source.close();
                    break;
                }
            }
        }
    }
}
