//! The conversation reducer
//!
//! [`Conversation`] is the single mutation entry point for the message list:
//! one call per user submission ([`Conversation::begin_turn`]) and one per
//! inbound stream frame ([`Conversation::apply`]). Updates touch only the
//! message matching the given id; no message is ever removed except by
//! [`Conversation::reset`].

use crate::message::{Message, MessageId, SearchProgress, SearchStage};
use rill_client::StreamEvent;

/// Greeting shown before the first turn
pub const GREETING: &str = "Hi there, how can I help you? Add documents to the \
                            knowledge base and I'll answer questions based on them.";

/// Fallback text for a backend `error` frame without a message
pub const DEFAULT_ERROR_TEXT: &str = "An error occurred";

/// Ids of the two messages created by a submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Turn {
    pub user_id: MessageId,
    pub assistant_id: MessageId,
}

/// Session-scoped conversation state: the message list and the continuation
/// token echoed to the backend on each request.
#[derive(Debug, Clone)]
pub struct Conversation {
    messages: Vec<Message>,
    next_id: MessageId,
    checkpoint_id: Option<String>,
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

impl Conversation {
    pub fn new() -> Self {
        Self {
            messages: vec![Message::assistant(1, GREETING)],
            next_id: 2,
            checkpoint_id: None,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn message(&self, id: MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    /// The continuation token from the last `checkpoint` frame, if any.
    /// Opaque: stored and echoed, never inspected.
    pub fn checkpoint_id(&self) -> Option<&str> {
        self.checkpoint_id.as_deref()
    }

    /// Drop all turn state and return to the greeting-only conversation
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Append the user message and the loading assistant placeholder for a
    /// new turn
    pub fn begin_turn(&mut self, input: &str) -> Turn {
        let user_id = self.alloc_id();
        self.messages.push(Message::user(user_id, input));

        let assistant_id = self.alloc_id();
        self.messages.push(Message::placeholder(assistant_id));

        Turn {
            user_id,
            assistant_id,
        }
    }

    /// Reduce one inbound frame into the conversation. Frames addressed to an
    /// unknown message id are ignored.
    pub fn apply(&mut self, assistant_id: MessageId, event: &StreamEvent) {
        if let StreamEvent::Checkpoint { checkpoint_id } = event {
            self.checkpoint_id = Some(checkpoint_id.clone());
            return;
        }

        let Some(msg) = self.messages.iter_mut().find(|m| m.id == assistant_id) else {
            tracing::debug!(assistant_id, "dropping frame for unknown message");
            return;
        };

        match event {
            StreamEvent::Checkpoint { .. } => {}
            StreamEvent::Content { content } => {
                msg.text.push_str(content);
                msg.loading = false;
            }
            StreamEvent::DocumentRefs { documents } => {
                msg.document_refs = Some(documents.clone());
            }
            StreamEvent::SearchStart { query } => {
                msg.search = Some(SearchProgress::started(query));
                msg.loading = false;
            }
            StreamEvent::SearchResults { urls } => {
                // May arrive before search_start; the progress record is
                // created on demand with an empty query.
                let search = msg.search.get_or_insert_with(SearchProgress::default);
                search.push_stage(SearchStage::Reading);
                search.urls = urls.clone();
                msg.loading = false;
            }
            StreamEvent::SearchError { error } => {
                let search = msg.search.get_or_insert_with(SearchProgress::default);
                search.push_stage(SearchStage::Error);
                search.error = Some(error.clone());
                // Results from the failed search are no longer trustworthy
                search.urls.clear();
                msg.loading = false;
            }
            StreamEvent::Error { message } => {
                msg.text = message
                    .clone()
                    .unwrap_or_else(|| DEFAULT_ERROR_TEXT.to_string());
                msg.loading = false;
            }
            StreamEvent::End => {
                if let Some(search) = &mut msg.search {
                    search.push_stage(SearchStage::Writing);
                }
            }
        }
    }

    /// Replace the assistant message with a failure notice. Used when the
    /// transport drops before any content has streamed.
    pub fn fail_turn(&mut self, assistant_id: MessageId, notice: &str) {
        if let Some(msg) = self.messages.iter_mut().find(|m| m.id == assistant_id) {
            msg.text = notice.to_string();
            msg.loading = false;
        }
    }

    /// Clear a loading flag left set by a stream that ended without visible
    /// output
    pub fn finish_turn(&mut self, assistant_id: MessageId) {
        if let Some(msg) = self.messages.iter_mut().find(|m| m.id == assistant_id) {
            msg.loading = false;
        }
    }

    fn alloc_id(&mut self) -> MessageId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Author;

    fn frame(data: &str) -> StreamEvent {
        serde_json::from_str(data).unwrap()
    }

    #[test]
    fn test_begin_turn_appends_user_and_placeholder() {
        let mut conv = Conversation::new();
        let turn = conv.begin_turn("What is RAG?");

        assert_eq!(turn.user_id, 2);
        assert_eq!(turn.assistant_id, 3);

        let user = conv.message(turn.user_id).unwrap();
        assert_eq!(user.author, Author::User);
        assert_eq!(user.text, "What is RAG?");

        let placeholder = conv.message(turn.assistant_id).unwrap();
        assert!(placeholder.loading);
        assert!(placeholder.search.is_none());
    }

    #[test]
    fn test_content_frames_concatenate_in_arrival_order() {
        let mut conv = Conversation::new();
        let turn = conv.begin_turn("hi");

        for part in ["RAG ", "is ", "retrieval."] {
            conv.apply(
                turn.assistant_id,
                &StreamEvent::Content {
                    content: part.to_string(),
                },
            );
        }

        let msg = conv.message(turn.assistant_id).unwrap();
        assert_eq!(msg.text, "RAG is retrieval.");
        assert!(!msg.loading);
    }

    #[test]
    fn test_checkpoint_replaces_token() {
        let mut conv = Conversation::new();
        let turn = conv.begin_turn("hi");

        conv.apply(turn.assistant_id, &frame(r#"{"type":"checkpoint","checkpoint_id":"a"}"#));
        assert_eq!(conv.checkpoint_id(), Some("a"));
        conv.apply(turn.assistant_id, &frame(r#"{"type":"checkpoint","checkpoint_id":"b"}"#));
        assert_eq!(conv.checkpoint_id(), Some("b"));
    }

    #[test]
    fn test_search_results_before_search_start() {
        let mut conv = Conversation::new();
        let turn = conv.begin_turn("hi");

        conv.apply(
            turn.assistant_id,
            &frame(r#"{"type":"search_results","urls":["http://a"]}"#),
        );

        let search = conv.message(turn.assistant_id).unwrap().search.as_ref().unwrap();
        assert_eq!(search.stages, vec![SearchStage::Reading]);
        assert_eq!(search.query, "");
        assert_eq!(search.urls, vec!["http://a"]);
    }

    #[test]
    fn test_repeated_search_results_do_not_duplicate_reading() {
        let mut conv = Conversation::new();
        let turn = conv.begin_turn("hi");

        conv.apply(turn.assistant_id, &frame(r#"{"type":"search_start","query":"RAG"}"#));
        conv.apply(turn.assistant_id, &frame(r#"{"type":"search_results","urls":["http://a"]}"#));
        conv.apply(turn.assistant_id, &frame(r#"{"type":"search_results","urls":["http://b"]}"#));

        let search = conv.message(turn.assistant_id).unwrap().search.as_ref().unwrap();
        assert_eq!(search.stages, vec![SearchStage::Searching, SearchStage::Reading]);
        // URL list is replaced, not appended
        assert_eq!(search.urls, vec!["http://b"]);
    }

    #[test]
    fn test_search_error_records_error_text() {
        let mut conv = Conversation::new();
        let turn = conv.begin_turn("hi");

        conv.apply(turn.assistant_id, &frame(r#"{"type":"search_start","query":"RAG"}"#));
        conv.apply(turn.assistant_id, &frame(r#"{"type":"search_error","error":"rate limited"}"#));

        let search = conv.message(turn.assistant_id).unwrap().search.as_ref().unwrap();
        assert_eq!(search.stages, vec![SearchStage::Searching, SearchStage::Error]);
        assert_eq!(search.error.as_deref(), Some("rate limited"));
    }

    #[test]
    fn test_search_error_drops_earlier_urls() {
        let mut conv = Conversation::new();
        let turn = conv.begin_turn("hi");

        conv.apply(turn.assistant_id, &frame(r#"{"type":"search_start","query":"RAG"}"#));
        conv.apply(turn.assistant_id, &frame(r#"{"type":"search_results","urls":["http://a"]}"#));
        conv.apply(turn.assistant_id, &frame(r#"{"type":"search_error","error":"timeout"}"#));

        let search = conv.message(turn.assistant_id).unwrap().search.as_ref().unwrap();
        assert!(search.urls.is_empty());
        assert_eq!(search.error.as_deref(), Some("timeout"));
    }

    #[test]
    fn test_end_without_search_leaves_no_progress() {
        let mut conv = Conversation::new();
        let turn = conv.begin_turn("hi");

        conv.apply(turn.assistant_id, &frame(r#"{"type":"content","content":"hello"}"#));
        conv.apply(turn.assistant_id, &frame(r#"{"type":"end"}"#));

        assert!(conv.message(turn.assistant_id).unwrap().search.is_none());
    }

    #[test]
    fn test_end_with_search_appends_writing_once() {
        let mut conv = Conversation::new();
        let turn = conv.begin_turn("hi");

        conv.apply(turn.assistant_id, &frame(r#"{"type":"search_start","query":"RAG"}"#));
        conv.apply(turn.assistant_id, &frame(r#"{"type":"end"}"#));
        conv.apply(turn.assistant_id, &frame(r#"{"type":"end"}"#));

        let search = conv.message(turn.assistant_id).unwrap().search.as_ref().unwrap();
        assert_eq!(search.stages, vec![SearchStage::Searching, SearchStage::Writing]);
    }

    #[test]
    fn test_error_frame_replaces_text() {
        let mut conv = Conversation::new();
        let turn = conv.begin_turn("hi");

        conv.apply(turn.assistant_id, &frame(r#"{"type":"content","content":"partial"}"#));
        conv.apply(turn.assistant_id, &frame(r#"{"type":"error","message":"backend exploded"}"#));

        let msg = conv.message(turn.assistant_id).unwrap();
        assert_eq!(msg.text, "backend exploded");
        assert!(!msg.loading);
    }

    #[test]
    fn test_error_frame_without_message_uses_default() {
        let mut conv = Conversation::new();
        let turn = conv.begin_turn("hi");

        conv.apply(turn.assistant_id, &frame(r#"{"type":"error"}"#));
        assert_eq!(conv.message(turn.assistant_id).unwrap().text, DEFAULT_ERROR_TEXT);
    }

    #[test]
    fn test_frames_for_unknown_id_leave_state_untouched() {
        let mut conv = Conversation::new();
        let turn = conv.begin_turn("hi");
        let before = conv.messages().len();

        conv.apply(999, &frame(r#"{"type":"content","content":"lost"}"#));

        assert_eq!(conv.messages().len(), before);
        assert!(conv.message(turn.assistant_id).unwrap().text.is_empty());
    }

    #[test]
    fn test_document_refs_attach_to_message() {
        let mut conv = Conversation::new();
        let turn = conv.begin_turn("hi");

        conv.apply(
            turn.assistant_id,
            &frame(r#"{"type":"document_refs","documents":["doc_1"]}"#),
        );

        let msg = conv.message(turn.assistant_id).unwrap();
        assert_eq!(msg.document_refs.as_deref(), Some(&["doc_1".to_string()][..]));
    }

    #[test]
    fn test_reset_returns_to_greeting() {
        let mut conv = Conversation::new();
        let turn = conv.begin_turn("hi");
        conv.apply(turn.assistant_id, &frame(r#"{"type":"checkpoint","checkpoint_id":"a"}"#));

        conv.reset();

        assert_eq!(conv.messages().len(), 1);
        assert_eq!(conv.messages()[0].text, GREETING);
        assert_eq!(conv.checkpoint_id(), None);
    }

    // Walks the full example scenario from the protocol description.
    #[test]
    fn test_streamed_turn_scenario() {
        let mut conv = Conversation::new();
        let turn = conv.begin_turn("What is RAG?");

        conv.apply(turn.assistant_id, &frame(r#"{"type":"search_start","query":"RAG"}"#));
        let search = conv.message(turn.assistant_id).unwrap().search.clone().unwrap();
        assert_eq!(search.stages, vec![SearchStage::Searching]);
        assert_eq!(search.query, "RAG");

        conv.apply(
            turn.assistant_id,
            &frame(r#"{"type":"search_results","urls":["http://a","http://b"]}"#),
        );
        let search = conv.message(turn.assistant_id).unwrap().search.clone().unwrap();
        assert_eq!(search.stages, vec![SearchStage::Searching, SearchStage::Reading]);
        assert_eq!(search.urls, vec!["http://a", "http://b"]);

        conv.apply(turn.assistant_id, &frame(r#"{"type":"content","content":"RAG is..."}"#));
        let msg = conv.message(turn.assistant_id).unwrap();
        assert_eq!(msg.text, "RAG is...");
        assert!(!msg.loading);

        conv.apply(turn.assistant_id, &frame(r#"{"type":"end"}"#));
        let search = conv.message(turn.assistant_id).unwrap().search.clone().unwrap();
        assert_eq!(
            search.stages,
            vec![SearchStage::Searching, SearchStage::Reading, SearchStage::Writing]
        );
    }
}
