//! /doc command for managing the knowledge base

use super::CommandResult;
use rill_chat::DocumentStore;

/// Document management command
pub struct DocCommand;

impl DocCommand {
    pub fn execute(args: &str, store: &mut DocumentStore) -> CommandResult {
        let (sub, rest) = match args.split_once(' ') {
            Some((sub, rest)) => (sub, rest.trim()),
            None => (args, ""),
        };

        match sub {
            "add" | "a" => Self::add(rest, store),
            "rm" | "remove" => Self::remove(rest, store),
            "on" => Self::set_active(rest, store, true),
            "off" => Self::set_active(rest, store, false),
            "list" | "ls" | "" => CommandResult::Message(Self::list_text(store)),
            _ => CommandResult::Message(format!("Unknown subcommand: {}\n{}", sub, usage())),
        }
    }

    fn add(rest: &str, store: &mut DocumentStore) -> CommandResult {
        let Some((title, content)) = rest.split_once("::") else {
            return CommandResult::Message(
                "Usage: /doc add <title> :: <content>\nExample: /doc add Notes :: We ship on Fridays."
                    .to_string(),
            );
        };
        let title = title.trim();
        let content = content.trim();
        if title.is_empty() || content.is_empty() {
            return CommandResult::Message("Both title and content are required.".to_string());
        }

        let id = store.add(title, content);
        CommandResult::Message(format!("Added \"{}\" ({})", title, id))
    }

    fn remove(id: &str, store: &mut DocumentStore) -> CommandResult {
        if id.is_empty() {
            return CommandResult::Message("Usage: /doc rm <id>".to_string());
        }
        if store.remove(id) {
            CommandResult::Message(format!("Removed {}", id))
        } else {
            CommandResult::Message(format!("No document with id {}", id))
        }
    }

    fn set_active(id: &str, store: &mut DocumentStore, active: bool) -> CommandResult {
        let verb = if active { "on" } else { "off" };
        if id.is_empty() {
            return CommandResult::Message(format!("Usage: /doc {} <id>", verb));
        }
        match store.set_active(id, active) {
            Some(true) => CommandResult::Message(format!("{} will be sent with requests", id)),
            Some(false) => CommandResult::Message(format!("{} excluded from requests", id)),
            None => CommandResult::Message(format!("No document with id {}", id)),
        }
    }

    /// Plain-text document listing, also used by the stdin/stdout mode
    pub fn list_text(store: &DocumentStore) -> String {
        if store.is_empty() {
            return "No documents. Add one with: /doc add <title> :: <content>".to_string();
        }

        let mut out = format!(
            "Documents ({}/{} active):\n",
            store.active_count(),
            store.len()
        );
        for doc in store.documents() {
            let marker = if store.is_active(&doc.id) { "●" } else { "○" };
            let words = doc.content.split_whitespace().count();
            out.push_str(&format!(
                "  {} {} ({} words)  {}\n",
                marker, doc.title, words, doc.id
            ));
        }
        out.push_str("\nToggle with /doc on|off <id>, remove with /doc rm <id>.");
        out
    }
}

fn usage() -> &'static str {
    "Usage: /doc add <title> :: <content> | /doc rm <id> | /doc on|off <id> | /doc list"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_requires_separator() {
        let mut store = DocumentStore::new();
        let result = DocCommand::execute("add just a title", &mut store);
        match result {
            CommandResult::Message(msg) => assert!(msg.starts_with("Usage:")),
            _ => panic!("expected usage message"),
        }
        assert!(store.is_empty());
    }

    #[test]
    fn test_on_off_round_trip() {
        let mut store = DocumentStore::new();
        let id = store.add("Notes", "body");

        DocCommand::execute(&format!("off {}", id), &mut store);
        assert!(!store.is_active(&id));

        DocCommand::execute(&format!("on {}", id), &mut store);
        assert!(store.is_active(&id));
    }

    #[test]
    fn test_list_shows_markers_and_ids() {
        let mut store = DocumentStore::new();
        let id = store.add("Notes", "one two");
        store.set_active(&id, false);

        let text = DocCommand::list_text(&store);
        assert!(text.contains(&format!("○ Notes (2 words)  {}", id)));
    }

    #[test]
    fn test_empty_args_lists() {
        let mut store = DocumentStore::new();
        match DocCommand::execute("", &mut store) {
            CommandResult::Message(msg) => assert!(msg.starts_with("No documents")),
            _ => panic!("expected listing"),
        }
    }
}
