//! Error types for rill-client

use thiserror::Error;

/// Result type alias using rill-client Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when talking to the chat backend
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Server-sent events transport failed
    #[error("SSE error: {0}")]
    Sse(String),

    /// The configured base URL could not be parsed
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
}

impl Error {
    /// Check if this error came from the transport layer (connection-level),
    /// as opposed to a local request-building failure.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Http(_) | Error::Sse(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_classification() {
        assert!(Error::Sse("connection reset".into()).is_transport());
        assert!(!Error::InvalidBaseUrl("not a url".into()).is_transport());
    }

    #[test]
    fn test_json_conversion() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: Error = err.into();
        assert!(matches!(err, Error::Json(_)));
    }
}
