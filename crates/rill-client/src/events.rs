//! Typed events carried on the chat stream

use serde::{Deserialize, Deserializer, Serialize};

/// One inbound frame from the backend, discriminated by its `type` field.
///
/// Every frame except `end` mutates the open assistant message; `end` tells
/// the client to close the connection. A backend `error` frame is fatal for
/// the turn's text but does not terminate the stream by itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Continuation token to echo on the next request
    Checkpoint { checkpoint_id: String },
    /// Text fragment appended to the streamed response
    Content { content: String },
    /// Ids of knowledge base documents the answer drew on
    DocumentRefs {
        #[serde(default)]
        documents: Vec<String>,
    },
    /// Web search started with the given query
    SearchStart { query: String },
    /// Search produced source URLs
    SearchResults {
        #[serde(deserialize_with = "urls_list_or_encoded")]
        urls: Vec<String>,
    },
    /// The search subsystem failed; the turn continues
    SearchError { error: String },
    /// Backend-signaled fatal error for this turn
    Error {
        #[serde(default)]
        message: Option<String>,
    },
    /// Terminal frame
    End,
}

impl StreamEvent {
    /// Whether this frame ends the stream. Only `end` does: a backend `error`
    /// frame replaces the response text but leaves the connection open.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::End)
    }
}

/// The backend sends `urls` either as a JSON list or as a JSON-encoded string
/// containing a list. An undecodable string fails the whole frame, so the
/// transport's skip-and-log policy applies.
fn urls_list_or_encoded<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        List(Vec<String>),
        Encoded(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::List(urls) => Ok(urls),
        Raw::Encoded(text) => serde_json::from_str(&text).map_err(serde::de::Error::custom),
    }
}
