//! Message and search-progress types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Message identifier, monotonically increasing within a session
pub type MessageId = u64;

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Author {
    User,
    Assistant,
}

/// Retrieval stages reported while a response is being produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStage {
    Searching,
    Reading,
    Writing,
    Error,
}

impl SearchStage {
    pub fn label(&self) -> &'static str {
        match self {
            SearchStage::Searching => "searching",
            SearchStage::Reading => "reading",
            SearchStage::Writing => "writing",
            SearchStage::Error => "error",
        }
    }
}

impl fmt::Display for SearchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Per-turn record of retrieval activity, owned by the assistant message it
/// annotates. The stage list is an insertion-ordered set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchProgress {
    pub stages: Vec<SearchStage>,
    pub query: String,
    pub urls: Vec<String>,
    pub error: Option<String>,
}

impl SearchProgress {
    /// Progress record for a search that just started
    pub fn started(query: impl Into<String>) -> Self {
        Self {
            stages: vec![SearchStage::Searching],
            query: query.into(),
            urls: Vec::new(),
            error: None,
        }
    }

    /// Append a stage unless it is already present. Stages are never
    /// reordered or removed.
    pub fn push_stage(&mut self, stage: SearchStage) {
        if !self.stages.contains(&stage) {
            self.stages.push(stage);
        }
    }
}

/// A single chat message. Assistant messages mutate in place while their
/// turn's stream is open; nothing is ever deleted except on session reset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub author: Author,
    pub text: String,
    /// Set on the assistant placeholder until the first frame that produces
    /// visible output arrives
    pub loading: bool,
    pub search: Option<SearchProgress>,
    /// Ids of knowledge base documents the answer referenced
    pub document_refs: Option<Vec<String>>,
    pub timestamp: i64,
}

impl Message {
    /// Create a user message
    pub fn user(id: MessageId, text: impl Into<String>) -> Self {
        Self {
            id,
            author: Author::User,
            text: text.into(),
            loading: false,
            search: None,
            document_refs: None,
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Create a completed assistant message
    pub fn assistant(id: MessageId, text: impl Into<String>) -> Self {
        Self {
            id,
            author: Author::Assistant,
            text: text.into(),
            loading: false,
            search: None,
            document_refs: None,
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Create the loading placeholder for a turn's response
    pub fn placeholder(id: MessageId) -> Self {
        Self {
            loading: true,
            ..Self::assistant(id, "")
        }
    }

    pub fn is_user(&self) -> bool {
        self.author == Author::User
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_stage_preserves_order_and_dedups() {
        let mut progress = SearchProgress::started("rust");
        progress.push_stage(SearchStage::Reading);
        progress.push_stage(SearchStage::Reading);
        progress.push_stage(SearchStage::Writing);
        assert_eq!(
            progress.stages,
            vec![
                SearchStage::Searching,
                SearchStage::Reading,
                SearchStage::Writing
            ]
        );
    }

    #[test]
    fn test_placeholder_starts_loading_without_search() {
        let msg = Message::placeholder(7);
        assert!(msg.loading);
        assert!(msg.text.is_empty());
        assert!(msg.search.is_none());
        assert_eq!(msg.author, Author::Assistant);
    }

    #[test]
    fn test_stage_labels() {
        assert_eq!(SearchStage::Searching.to_string(), "searching");
        assert_eq!(SearchStage::Error.label(), "error");
    }
}
