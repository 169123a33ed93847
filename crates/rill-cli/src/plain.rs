//! Simple stdin/stdout mode
//!
//! Used for `-c` one-shot questions and `--no-tui`. Streamed answer text goes
//! to stdout; search progress and source listings go to stderr so piped
//! output stays clean.

use parking_lot::Mutex;
use rill_chat::{ChatSession, Conversation, TurnOutcome};
use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

/// Counters for what has already been printed from the in-progress message
#[derive(Default)]
struct Printed {
    chars: usize,
    stages: usize,
    urls: usize,
    error: bool,
}

/// Run a single question and stream the answer to stdout
pub async fn run_once(session: &ChatSession, input: &str) -> anyhow::Result<TurnOutcome> {
    let conversation = session.conversation();
    let run = session.run_turn(input);
    tokio::pin!(run);

    let mut printed = Printed::default();
    let mut ticker = tokio::time::interval(Duration::from_millis(50));

    let outcome = loop {
        tokio::select! {
            outcome = &mut run => break outcome,
            _ = ticker.tick() => {
                flush_progress(&conversation, &mut printed)?;
            }
        }
    };

    flush_progress(&conversation, &mut printed)?;
    println!();
    print_sources(session);

    Ok(outcome)
}

/// Print whatever the reducer has added since the last tick
fn flush_progress(
    conversation: &Arc<Mutex<Conversation>>,
    printed: &mut Printed,
) -> io::Result<()> {
    let guard = conversation.lock();
    let Some(msg) = guard.messages().last() else {
        return Ok(());
    };
    if msg.is_user() {
        return Ok(());
    }

    if let Some(search) = &msg.search {
        for stage in search.stages.iter().skip(printed.stages) {
            if search.query.is_empty() {
                eprintln!("[{}]", stage.label());
            } else {
                eprintln!("[{} \"{}\"]", stage.label(), search.query);
            }
        }
        printed.stages = search.stages.len();

        for url in search.urls.iter().skip(printed.urls) {
            eprintln!("  • {}", url);
        }
        printed.urls = search.urls.len();

        if let Some(error) = &search.error {
            if !printed.error {
                eprintln!("  ✗ {}", error);
                printed.error = true;
            }
        }
    }

    let chars: Vec<char> = msg.text.chars().collect();
    if chars.len() > printed.chars {
        let delta: String = chars[printed.chars..].iter().collect();
        print!("{}", delta);
        io::stdout().flush()?;
        printed.chars = chars.len();
    }

    Ok(())
}

/// Print referenced document titles after the answer, stderr only
fn print_sources(session: &ChatSession) {
    let conversation = session.conversation();
    let documents = session.documents();
    let conversation = conversation.lock();
    let store = documents.lock();

    let Some(msg) = conversation.messages().last() else {
        return;
    };
    if let Some(refs) = &msg.document_refs {
        if !refs.is_empty() {
            let titles: Vec<String> = refs
                .iter()
                .map(|id| {
                    store
                        .title_of(id)
                        .map(str::to_string)
                        .unwrap_or_else(|| id.clone())
                })
                .collect();
            eprintln!("[Sources: {}]", titles.join(", "));
        }
    }
}

/// Interactive stdin/stdout loop
pub async fn run_interactive(session: &ChatSession, server_url: &str) -> anyhow::Result<()> {
    use crate::commands::{CommandResult, DocCommand, execute_command};
    use std::io::IsTerminal;

    if io::stderr().is_terminal() {
        eprintln!("rill ({})", server_url);
        eprintln!();
    }
    println!("{}", rill_chat::GREETING);

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            // EOF
            break;
        }

        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        if input.starts_with('/') {
            if let Some(result) = execute_command(input, &session.documents()) {
                match result {
                    CommandResult::Message(msg) => {
                        println!("{}", msg);
                    }
                    CommandResult::Clear => {
                        session.reset();
                        println!("Cleared conversation.");
                    }
                    CommandResult::OpenDocumentPanel => {
                        // No panel here; fall back to the plain listing
                        println!("{}", DocCommand::list_text(&session.documents().lock()));
                    }
                    CommandResult::Exit => {
                        break;
                    }
                    CommandResult::Unknown(cmd) => {
                        println!("Unknown command: /{}", cmd);
                        println!("Type /help for available commands.");
                    }
                }
                println!();
                continue;
            }
        }

        println!();
        run_once(session, input).await?;
        println!();
    }

    Ok(())
}
