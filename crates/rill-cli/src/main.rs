//! rill - terminal client for streaming RAG chat backends

mod commands;
mod config;
mod plain;
mod ui;

use clap::Parser;
use rill_chat::{ChatSession, TurnOutcome};
use rill_client::ChatClient;

/// rill - chat with a retrieval-augmented backend from the terminal
#[derive(Parser, Debug)]
#[command(name = "rill")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Backend base URL (default: http://127.0.0.1:8000)
    #[arg(short, long)]
    server_url: Option<String>,

    /// Ask a single question and exit
    #[arg(short = 'c', long)]
    command: Option<String>,

    /// Disable TUI mode (use simple stdin/stdout)
    #[arg(long)]
    no_tui: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Initialize config file
    #[arg(long)]
    init_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Setup tracing
    if args.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("rill=debug")
            .init();
    }

    // Initialize config and exit
    if args.init_config {
        match config::Config::init() {
            Ok(path) => {
                println!("Config file created at: {}", path.display());
                println!("\nExample config:\n{}", config::example_config());
            }
            Err(e) => {
                eprintln!("Error creating config: {}", e);
                std::process::exit(1);
            }
        }
        return Ok(());
    }

    // Load config file; CLI args take precedence
    let cfg = config::Config::load();
    tracing::debug!(?cfg, "loaded config");

    let server_url = args
        .server_url
        .or(cfg.server_url)
        .unwrap_or_else(|| rill_client::DEFAULT_BASE_URL.to_string());

    let use_tui = !args.no_tui && cfg.tui.unwrap_or(true);

    let session = ChatSession::new(ChatClient::new(server_url.as_str()));

    // Non-interactive mode
    if let Some(question) = args.command {
        let outcome = plain::run_once(&session, &question).await?;
        if outcome == TurnOutcome::Failed {
            std::process::exit(1);
        }
        return Ok(());
    }

    // TUI mode
    if use_tui {
        return ui::run_tui(session, &server_url).await;
    }

    // Interactive mode (simple stdin/stdout)
    plain::run_interactive(&session, &server_url).await
}
