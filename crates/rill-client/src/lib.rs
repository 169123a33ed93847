//! rill-client: wire protocol client for the rill chat backend
//!
//! Opens one server-sent-event stream per conversation turn and parses the
//! inbound frames into typed [`StreamEvent`]s.

pub mod error;
pub mod events;
pub mod transport;

pub use error::{Error, Result};
pub use events::StreamEvent;
pub use transport::{ChatClient, DocumentContext, StreamEventStream, DEFAULT_BASE_URL};
