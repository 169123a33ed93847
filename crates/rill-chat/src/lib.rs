//! rill-chat: conversation state for the rill chat client
//!
//! Holds the message list and document store, reduces inbound stream events
//! into message updates, and drives one turn at a time against the backend.

pub mod conversation;
pub mod documents;
pub mod message;
pub mod session;

pub use conversation::{Conversation, Turn, DEFAULT_ERROR_TEXT, GREETING};
pub use documents::{Document, DocumentStore};
pub use message::{Author, Message, MessageId, SearchProgress, SearchStage};
pub use session::{ChatSession, TurnOutcome, STREAM_FAILURE_NOTICE};
