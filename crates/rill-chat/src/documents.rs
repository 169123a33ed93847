//! In-memory, session-scoped document store
//!
//! Documents are independent of any message; assistant messages refer to them
//! by id only. The "active" subset is what gets serialized into the outgoing
//! request as retrieval context.

use chrono::{DateTime, Utc};
use rill_client::DocumentContext;
use serde::{Deserialize, Serialize};

/// An ad-hoc text document added to the knowledge base
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Flat per-session collection of documents plus the active id set
#[derive(Debug, Clone, Default)]
pub struct DocumentStore {
    documents: Vec<Document>,
    active: Vec<String>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a document and mark it active. Returns the generated id.
    pub fn add(&mut self, title: impl Into<String>, content: impl Into<String>) -> String {
        let id = self.generate_id();
        self.documents.push(Document {
            id: id.clone(),
            title: title.into().trim().to_string(),
            content: content.into().trim().to_string(),
            created_at: Utc::now(),
        });
        self.active.push(id.clone());
        id
    }

    /// Delete a document and drop it from the active set. Returns whether a
    /// document was removed.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.documents.len();
        self.documents.retain(|d| d.id != id);
        self.active.retain(|a| a != id);
        self.documents.len() != before
    }

    /// Flip a document's membership in the active set without touching the
    /// document itself. Returns the new active state, or `None` if no such
    /// document exists.
    pub fn toggle_active(&mut self, id: &str) -> Option<bool> {
        if !self.documents.iter().any(|d| d.id == id) {
            return None;
        }
        if let Some(pos) = self.active.iter().position(|a| a == id) {
            self.active.remove(pos);
            Some(false)
        } else {
            self.active.push(id.to_string());
            Some(true)
        }
    }

    /// Set a document's active state explicitly. Returns the resulting state,
    /// or `None` if no such document exists.
    pub fn set_active(&mut self, id: &str, active: bool) -> Option<bool> {
        if !self.documents.iter().any(|d| d.id == id) {
            return None;
        }
        if active {
            if !self.is_active(id) {
                self.active.push(id.to_string());
            }
        } else {
            self.active.retain(|a| a != id);
        }
        Some(active)
    }

    pub fn is_active(&self, id: &str) -> bool {
        self.active.iter().any(|a| a == id)
    }

    pub fn get(&self, id: &str) -> Option<&Document> {
        self.documents.iter().find(|d| d.id == id)
    }

    /// Title for a document id, used when rendering `document_refs`
    pub fn title_of(&self, id: &str) -> Option<&str> {
        self.get(id).map(|d| d.title.as_str())
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// The active subset in store order, shaped for the outgoing request
    pub fn active_context(&self) -> Vec<DocumentContext> {
        self.documents
            .iter()
            .filter(|d| self.is_active(&d.id))
            .map(|d| DocumentContext {
                id: d.id.clone(),
                title: d.title.clone(),
                content: d.content.clone(),
            })
            .collect()
    }

    // Time-based ids after the original scheme; bumped forward when two
    // documents land in the same millisecond.
    fn generate_id(&self) -> String {
        let mut millis = Utc::now().timestamp_millis();
        loop {
            let id = format!("doc_{millis}");
            if !self.documents.iter().any(|d| d.id == id) {
                return id;
            }
            millis += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_marks_active_by_default() {
        let mut store = DocumentStore::new();
        let id = store.add("Notes", "some text");

        assert!(store.is_active(&id));
        assert_eq!(store.len(), 1);
        assert_eq!(store.active_count(), 1);
        assert!(id.starts_with("doc_"));
    }

    #[test]
    fn test_add_trims_title_and_content() {
        let mut store = DocumentStore::new();
        let id = store.add("  Notes  ", "  body  ");
        let doc = store.get(&id).unwrap();
        assert_eq!(doc.title, "Notes");
        assert_eq!(doc.content, "body");
    }

    #[test]
    fn test_ids_unique_within_a_millisecond() {
        let mut store = DocumentStore::new();
        let a = store.add("a", "a");
        let b = store.add("b", "b");
        let c = store.add("c", "c");
        assert_ne!(a, b);
        assert_ne!(b, c);
        assert_ne!(a, c);
    }

    #[test]
    fn test_toggle_deactivates_without_deleting() {
        let mut store = DocumentStore::new();
        let id = store.add("Notes", "text");

        assert_eq!(store.toggle_active(&id), Some(false));
        assert!(!store.is_active(&id));
        assert!(store.get(&id).is_some());

        assert_eq!(store.toggle_active(&id), Some(true));
        assert!(store.is_active(&id));
    }

    #[test]
    fn test_set_active_is_idempotent() {
        let mut store = DocumentStore::new();
        let id = store.add("Notes", "text");

        assert_eq!(store.set_active(&id, true), Some(true));
        assert_eq!(store.set_active(&id, true), Some(true));
        assert_eq!(store.active_count(), 1);

        assert_eq!(store.set_active(&id, false), Some(false));
        assert_eq!(store.set_active(&id, false), Some(false));
        assert_eq!(store.active_count(), 0);

        assert_eq!(store.set_active("doc_missing", true), None);
    }

    #[test]
    fn test_toggle_unknown_id() {
        let mut store = DocumentStore::new();
        assert_eq!(store.toggle_active("doc_0"), None);
    }

    #[test]
    fn test_remove_always_deactivates() {
        let mut store = DocumentStore::new();
        let id = store.add("Notes", "text");

        assert!(store.remove(&id));
        assert!(store.get(&id).is_none());
        assert!(!store.is_active(&id));
        assert_eq!(store.active_count(), 0);

        assert!(!store.remove(&id));
    }

    #[test]
    fn test_active_context_includes_only_active() {
        let mut store = DocumentStore::new();
        let kept = store.add("Kept", "kept body");
        let toggled = store.add("Toggled", "toggled body");
        store.toggle_active(&toggled);

        let context = store.active_context();
        assert_eq!(context.len(), 1);
        assert_eq!(context[0].id, kept);
        assert_eq!(context[0].title, "Kept");
        assert_eq!(context[0].content, "kept body");
    }

    #[test]
    fn test_title_lookup() {
        let mut store = DocumentStore::new();
        let id = store.add("Notes", "text");
        assert_eq!(store.title_of(&id), Some("Notes"));
        assert_eq!(store.title_of("doc_missing"), None);
    }
}
