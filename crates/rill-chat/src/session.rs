//! The turn driver
//!
//! [`ChatSession`] owns the shared conversation and document store and runs
//! one streaming turn at a time. Submitting while a turn is still in flight
//! cancels the previous stream before the new one opens.

use futures::StreamExt;
use parking_lot::Mutex;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use tokio_util::sync::CancellationToken;

use crate::conversation::Conversation;
use crate::documents::DocumentStore;
use crate::message::MessageId;
use rill_client::{ChatClient, StreamEvent, StreamEventStream};

/// Notice shown when the transport drops before any content has streamed
pub const STREAM_FAILURE_NOTICE: &str = "Sorry, there was an error processing your request.";

/// How a turn ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Stream ran to its `end` frame (or a benign disconnect after content)
    Completed,
    /// Transport failed before any content arrived
    Failed,
    /// Cancelled by a newer submission or an explicit abort
    Aborted,
}

/// Cloneable handle driving the conversation against the backend.
///
/// All fields are `Arc`-wrapped, so cloning is cheap. The UI reads state
/// through the shared conversation/document locks; only the driver writes.
#[derive(Clone)]
pub struct ChatSession {
    client: ChatClient,
    conversation: Arc<Mutex<Conversation>>,
    documents: Arc<Mutex<DocumentStore>>,
    cancel: Arc<Mutex<CancellationToken>>,
    is_streaming: Arc<AtomicBool>,
}

impl ChatSession {
    pub fn new(client: ChatClient) -> Self {
        Self {
            client,
            conversation: Arc::new(Mutex::new(Conversation::new())),
            documents: Arc::new(Mutex::new(DocumentStore::new())),
            cancel: Arc::new(Mutex::new(CancellationToken::new())),
            is_streaming: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn conversation(&self) -> Arc<Mutex<Conversation>> {
        Arc::clone(&self.conversation)
    }

    pub fn documents(&self) -> Arc<Mutex<DocumentStore>> {
        Arc::clone(&self.documents)
    }

    /// Whether a turn's stream is currently open
    pub fn is_streaming(&self) -> bool {
        self.is_streaming.load(Ordering::Acquire)
    }

    /// Cancel the in-flight stream, if any
    pub fn abort(&self) {
        self.cancel.lock().cancel();
    }

    /// Abort any in-flight turn and drop all conversation state. Documents
    /// survive a reset; they are session-scoped, not turn-scoped.
    pub fn reset(&self) {
        self.abort();
        self.conversation.lock().reset();
    }

    /// Run one full turn: append the user message and placeholder, open the
    /// stream, and reduce frames until it closes.
    pub async fn run_turn(&self, input: &str) -> TurnOutcome {
        // Cancel the previous stream before opening a new one; exactly one
        // assistant message is open per in-flight turn.
        let token = {
            let mut guard = self.cancel.lock();
            guard.cancel();
            *guard = CancellationToken::new();
            guard.clone()
        };

        let (assistant_id, checkpoint, context) = {
            let mut conversation = self.conversation.lock();
            let turn = conversation.begin_turn(input);
            let checkpoint = conversation.checkpoint_id().map(str::to_string);
            (turn.assistant_id, checkpoint, self.documents.lock().active_context())
        };

        let stream = match self.client.stream_chat(input, checkpoint.as_deref(), &context) {
            Ok(stream) => stream,
            Err(e) => {
                tracing::warn!(error = %e, "failed to open chat stream");
                self.conversation
                    .lock()
                    .fail_turn(assistant_id, STREAM_FAILURE_NOTICE);
                return TurnOutcome::Failed;
            }
        };

        self.is_streaming.store(true, Ordering::Release);
        let outcome = self.drive(assistant_id, stream, &token).await;
        self.is_streaming.store(false, Ordering::Release);
        outcome
    }

    /// Reduce frames from an open stream into the conversation, one frame one
    /// state update.
    async fn drive(
        &self,
        assistant_id: MessageId,
        mut stream: StreamEventStream,
        cancel: &CancellationToken,
    ) -> TurnOutcome {
        let mut saw_content = false;

        let outcome = loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!(assistant_id, "turn cancelled");
                    break TurnOutcome::Aborted;
                }
                frame = stream.next() => match frame {
                    None => break TurnOutcome::Completed,
                    Some(Ok(event)) => {
                        if matches!(event, StreamEvent::Content { .. }) {
                            saw_content = true;
                        }
                        let terminal = event.is_terminal();
                        self.conversation.lock().apply(assistant_id, &event);
                        if terminal {
                            break TurnOutcome::Completed;
                        }
                    }
                    Some(Err(e)) => {
                        // Transport failure is asymmetric: before content it
                        // replaces the placeholder with a notice, after
                        // content it is a benign end of stream and the
                        // partial text is preserved.
                        if saw_content {
                            tracing::debug!(error = %e, "stream dropped after content; keeping partial response");
                            break TurnOutcome::Completed;
                        }
                        tracing::warn!(error = %e, "stream failed before content");
                        self.conversation
                            .lock()
                            .fail_turn(assistant_id, STREAM_FAILURE_NOTICE);
                        break TurnOutcome::Failed;
                    }
                }
            }
        };

        // A stream can close without ever producing visible output; don't
        // leave the placeholder spinning.
        self.conversation.lock().finish_turn(assistant_id);
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rill_client::{DEFAULT_BASE_URL, Error};

    fn session() -> ChatSession {
        ChatSession::new(ChatClient::new(DEFAULT_BASE_URL))
    }

    fn begin(session: &ChatSession) -> MessageId {
        session.conversation.lock().begin_turn("question").assistant_id
    }

    fn events(items: Vec<rill_client::Result<StreamEvent>>) -> StreamEventStream {
        Box::pin(tokio_stream::iter(items))
    }

    fn content(text: &str) -> rill_client::Result<StreamEvent> {
        Ok(StreamEvent::Content {
            content: text.to_string(),
        })
    }

    #[tokio::test]
    async fn test_drive_applies_frames_until_end() {
        let session = session();
        let id = begin(&session);
        let token = CancellationToken::new();

        let outcome = session
            .drive(
                id,
                events(vec![content("hello "), content("world"), Ok(StreamEvent::End)]),
                &token,
            )
            .await;

        assert_eq!(outcome, TurnOutcome::Completed);
        let conversation = session.conversation.lock();
        let msg = conversation.message(id).unwrap();
        assert_eq!(msg.text, "hello world");
        assert!(!msg.loading);
    }

    #[tokio::test]
    async fn test_transport_failure_before_content_shows_notice() {
        let session = session();
        let id = begin(&session);
        let token = CancellationToken::new();

        let outcome = session
            .drive(id, events(vec![Err(Error::Sse("reset".into()))]), &token)
            .await;

        assert_eq!(outcome, TurnOutcome::Failed);
        let conversation = session.conversation.lock();
        let msg = conversation.message(id).unwrap();
        assert_eq!(msg.text, STREAM_FAILURE_NOTICE);
        assert!(!msg.loading);
    }

    #[tokio::test]
    async fn test_transport_failure_after_content_preserves_partial_text() {
        let session = session();
        let id = begin(&session);
        let token = CancellationToken::new();

        let outcome = session
            .drive(
                id,
                events(vec![content("partial answer"), Err(Error::Sse("reset".into()))]),
                &token,
            )
            .await;

        assert_eq!(outcome, TurnOutcome::Completed);
        let conversation = session.conversation.lock();
        let msg = conversation.message(id).unwrap();
        assert_eq!(msg.text, "partial answer");
        assert!(!msg.loading);
    }

    #[tokio::test]
    async fn test_cancellation_aborts_and_clears_loading() {
        let session = session();
        let id = begin(&session);
        let token = CancellationToken::new();
        token.cancel();

        let pending: StreamEventStream = Box::pin(futures::stream::pending());
        let outcome = session.drive(id, pending, &token).await;

        assert_eq!(outcome, TurnOutcome::Aborted);
        assert!(!session.conversation.lock().message(id).unwrap().loading);
    }

    #[tokio::test]
    async fn test_empty_stream_clears_loading() {
        let session = session();
        let id = begin(&session);
        let token = CancellationToken::new();

        let outcome = session.drive(id, events(vec![]), &token).await;

        assert_eq!(outcome, TurnOutcome::Completed);
        assert!(!session.conversation.lock().message(id).unwrap().loading);
    }

    #[tokio::test]
    async fn test_server_eof_before_content_fails_the_turn() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        // Accept one connection, send SSE headers, hang up without any frame
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            socket
                .write_all(b"HTTP/1.1 200 OK\r\ncontent-type: text/event-stream\r\n\r\n")
                .await
                .unwrap();
            socket.shutdown().await.unwrap();
        });

        let session = ChatSession::new(ChatClient::new(format!("http://{addr}")));
        let outcome = session.run_turn("hi").await;

        assert_eq!(outcome, TurnOutcome::Failed);
        let conversation = session.conversation.lock();
        let msg = conversation.messages().last().unwrap();
        assert_eq!(msg.text, STREAM_FAILURE_NOTICE);
        assert!(!msg.loading);
    }

    #[tokio::test]
    async fn test_reset_keeps_documents() {
        let session = session();
        session.documents.lock().add("Notes", "body");
        begin(&session);

        session.reset();

        assert_eq!(session.conversation.lock().messages().len(), 1);
        assert_eq!(session.documents.lock().len(), 1);
    }
}
