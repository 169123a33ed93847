//! Slash commands for interactive mode

mod doc;

pub use doc::DocCommand;

use parking_lot::Mutex;
use rill_chat::DocumentStore;
use std::sync::Arc;

/// Result of executing a slash command
pub enum CommandResult {
    /// Show a message to the user (not sent to the backend)
    Message(String),
    /// Reset the conversation
    Clear,
    /// Exit the application
    Exit,
    /// Open the knowledge base panel (TUI only)
    OpenDocumentPanel,
    /// Unknown command
    Unknown(String),
}

/// Parse and execute a slash command
pub fn execute_command(input: &str, documents: &Arc<Mutex<DocumentStore>>) -> Option<CommandResult> {
    let input = input.trim();

    if !input.starts_with('/') {
        return None;
    }

    let parts: Vec<&str> = input[1..].splitn(2, ' ').collect();
    let command = parts[0].to_lowercase();
    let args = parts.get(1).map(|s| s.trim()).unwrap_or("");

    Some(match command.as_str() {
        "help" | "h" | "?" => CommandResult::Message(help_message()),

        "clear" | "c" => CommandResult::Clear,

        "quit" | "exit" | "q" => CommandResult::Exit,

        "docs" => CommandResult::OpenDocumentPanel,

        "doc" | "d" => DocCommand::execute(args, &mut documents.lock()),

        _ => CommandResult::Unknown(command),
    })
}

fn help_message() -> String {
    r#"Available commands:
  /help, /h, /?                      Show this help message
  /doc add <title> :: <content>      Add a document to the knowledge base
  /doc rm <id>                       Remove a document
  /doc on <id>                       Include a document in requests
  /doc off <id>                      Exclude a document from requests
  /doc list                          List documents with their ids
  /docs                              Open the knowledge base panel
  /clear, /c                         Reset the conversation (documents survive)
  /quit, /exit, /q                   Exit rill

Examples:
  /doc add Team handbook :: We ship on Fridays.
  /doc off doc_1718000000000
  /clear"#
        .to_string()
}
