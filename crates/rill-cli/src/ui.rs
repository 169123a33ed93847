//! TUI implementation for rill

use tokio::sync::mpsc;

use crossterm::event::{Event, EventStream, MouseEventKind};
use futures::StreamExt;
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{
        Block, Borders, Clear, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState, Widget,
    },
};
use rill_chat::{ChatSession, TurnOutcome};
use rill_tui::{
    Theme,
    input::Action,
    widgets::{
        DocumentPanel, DocumentPanelState, InputBox, MessageList, Spinner,
        message_list::conversation_height,
    },
};
use std::time::Instant;

/// Messages sent from UI state to the run loop
#[derive(Debug)]
pub enum UiMessage {
    /// User submitted input
    Submit(String),
    /// Slash command
    Command(String),
    /// User requested quit
    Quit,
    /// User requested a conversation reset
    Clear,
    /// User requested abort of the current stream
    Abort,
}

/// TUI application state
pub struct TuiState {
    /// Shared session handle; the run loop drives turns, we only read
    session: ChatSession,
    /// Input box
    input: InputBox,
    /// Current scroll position
    scroll: usize,
    /// Whether the view follows the newest output
    follow: bool,
    /// Current status message
    status: String,
    /// Multi-line command output shown as a popup
    notice: Option<String>,
    /// Knowledge base panel state
    doc_panel: DocumentPanelState,
    /// Theme
    theme: Theme,
    /// Backend base URL, shown in the title bar
    server_url: String,
    /// Channel to the run loop
    ui_tx: mpsc::Sender<UiMessage>,
    /// Spinner start time for animation
    spinner_start: Instant,
}

impl TuiState {
    pub fn new(session: ChatSession, server_url: String, ui_tx: mpsc::Sender<UiMessage>) -> Self {
        let input = InputBox::new().with_placeholder("Ask a question...");

        Self {
            session,
            input,
            scroll: 0,
            follow: true,
            status: "Ready".to_string(),
            notice: None,
            doc_panel: DocumentPanelState::default(),
            theme: Theme::dark(),
            server_url,
            ui_tx,
            spinner_start: Instant::now(),
        }
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
    }

    pub fn show_notice(&mut self, text: impl Into<String>) {
        self.notice = Some(text.into());
    }

    pub fn restart_spinner(&mut self) {
        self.spinner_start = Instant::now();
    }

    fn scroll_to_bottom(&mut self) {
        self.follow = true;
        self.scroll = usize::MAX;
    }

    /// Handle a keyboard action. Returns false when the app should exit.
    pub async fn handle_action(&mut self, action: Action, width: u16) -> bool {
        // A visible notice swallows the next keypress
        if self.notice.is_some() {
            if !matches!(action, Action::Quit | Action::Interrupt) {
                self.notice = None;
                return true;
            }
            self.notice = None;
        }

        if self.doc_panel.visible {
            return self.handle_panel_action(action).await;
        }

        match action {
            Action::Submit => {
                let content = self.input.content().trim().to_string();
                if !content.is_empty() {
                    self.input.clear();
                    if content.starts_with('/') {
                        let _ = self.ui_tx.send(UiMessage::Command(content)).await;
                    } else {
                        self.scroll_to_bottom();
                        let _ = self.ui_tx.send(UiMessage::Submit(content)).await;
                    }
                }
                true
            }
            Action::Quit => {
                let _ = self.ui_tx.send(UiMessage::Quit).await;
                false
            }
            Action::Interrupt => {
                if self.session.is_streaming() {
                    let _ = self.ui_tx.send(UiMessage::Abort).await;
                    self.status = "Cancelling...".to_string();
                    true
                } else {
                    let _ = self.ui_tx.send(UiMessage::Quit).await;
                    false
                }
            }
            Action::Escape => {
                if self.session.is_streaming() {
                    let _ = self.ui_tx.send(UiMessage::Abort).await;
                    self.status = "Cancelling...".to_string();
                }
                true
            }
            Action::Reset => {
                let _ = self.ui_tx.send(UiMessage::Clear).await;
                true
            }
            Action::ToggleDocs => {
                let len = self.session.documents().lock().len();
                self.doc_panel.clamp(len);
                self.doc_panel.toggle();
                true
            }
            Action::Up => {
                self.follow = false;
                self.scroll = self.scroll.saturating_sub(1);
                true
            }
            Action::Down => {
                self.scroll = self.scroll.saturating_add(1);
                true
            }
            Action::PageUp => {
                self.follow = false;
                self.scroll = self.scroll.saturating_sub(10);
                true
            }
            Action::PageDown => {
                self.scroll = self.scroll.saturating_add(10);
                true
            }
            _ => {
                self.input.handle_action(&action, width);
                true
            }
        }
    }

    /// Key handling while the knowledge base panel is open
    async fn handle_panel_action(&mut self, action: Action) -> bool {
        let documents = self.session.documents();
        let len = documents.lock().len();

        match action {
            Action::Up => self.doc_panel.up(len),
            Action::Down => self.doc_panel.down(len),
            Action::Char(' ') | Action::Submit => {
                let mut store = documents.lock();
                if let Some(doc) = store.documents().get(self.doc_panel.selected) {
                    let id = doc.id.clone();
                    store.toggle_active(&id);
                }
            }
            Action::Char('d') | Action::Delete => {
                let mut store = documents.lock();
                if let Some(doc) = store.documents().get(self.doc_panel.selected) {
                    let id = doc.id.clone();
                    store.remove(&id);
                }
                let len = store.len();
                drop(store);
                self.doc_panel.clamp(len);
            }
            Action::Escape | Action::ToggleDocs => self.doc_panel.hide(),
            Action::Quit => {
                let _ = self.ui_tx.send(UiMessage::Quit).await;
                return false;
            }
            _ => {}
        }
        true
    }

    /// Render the UI
    pub fn render(&mut self, frame: &mut Frame) {
        let size = frame.area();

        // Layout: messages (flex), status bar (1), input (3)
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(1),
                Constraint::Length(1),
                Constraint::Length(3),
            ])
            .split(size);

        self.render_messages(frame, chunks[0]);
        self.render_status(frame, chunks[1]);
        self.input
            .render(chunks[2], frame.buffer_mut(), &self.theme);

        if self.doc_panel.visible {
            let documents = self.session.documents();
            let store = documents.lock();
            DocumentPanel::new(&store, &self.doc_panel, &self.theme)
                .render_centered(size, frame.buffer_mut());
        }

        if let Some(notice) = self.notice.clone() {
            self.render_notice(frame, size, &notice);
        }
    }

    fn render_messages(&mut self, frame: &mut Frame, area: Rect) {
        let title = format!(" rill │ {} ", self.server_url);
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(self.theme.border_style())
            .title(title);

        let inner = block.inner(area);
        frame.render_widget(block, area);

        if inner.height == 0 || inner.width == 0 {
            return;
        }

        // Lock order matches the turn driver: conversation, then documents
        let conversation = self.session.conversation();
        let documents = self.session.documents();
        let conversation = conversation.lock();
        let store = documents.lock();
        let messages = conversation.messages();

        let content_height =
            conversation_height(messages, &store, &self.theme, inner.width as usize);
        let max_scroll = content_height.saturating_sub(inner.height as usize);

        if self.follow {
            self.scroll = max_scroll;
        } else {
            self.scroll = self.scroll.min(max_scroll);
            if self.scroll == max_scroll {
                self.follow = true;
            }
        }

        let list = MessageList::new(messages, &store, &self.theme).scroll(self.scroll);
        frame.render_widget(list, inner);

        if content_height > inner.height as usize {
            let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
                .begin_symbol(Some("↑"))
                .end_symbol(Some("↓"))
                .track_symbol(Some("│"))
                .thumb_symbol("█");

            let mut scrollbar_state = ScrollbarState::new(content_height)
                .position(self.scroll)
                .viewport_content_length(inner.height as usize);

            frame.render_stateful_widget(scrollbar, inner, &mut scrollbar_state);
        }
    }

    fn render_status(&self, frame: &mut Frame, area: Rect) {
        if self.session.is_streaming() {
            let spinner =
                Spinner::new(&self.status, &self.theme).with_start_time(self.spinner_start);
            frame.render_widget(spinner, area);
            return;
        }

        let (doc_count, active_count) = {
            let documents = self.session.documents();
            let store = documents.lock();
            (store.len(), store.active_count())
        };
        let left_content = format!("{} docs ({} active) │ {}", doc_count, active_count, self.status);
        let right_content = "Ctrl+K: docs │ Ctrl+L: reset │ Ctrl+C: quit";

        let left_width = left_content.chars().count();
        let right_width = right_content.chars().count();
        let available = area.width as usize;

        let line = if left_width + right_width + 2 <= available {
            let spacing = available - left_width - right_width;
            Line::from(vec![
                Span::styled(left_content, self.theme.dim_style()),
                Span::raw(" ".repeat(spacing)),
                Span::styled(right_content, self.theme.dim_style()),
            ])
        } else {
            Line::from(Span::styled(left_content, self.theme.dim_style()))
        };

        frame.render_widget(Paragraph::new(line), area);
    }

    /// Centered popup for multi-line command output (help, /doc list)
    fn render_notice(&self, frame: &mut Frame, area: Rect, notice: &str) {
        let lines: Vec<&str> = notice.lines().collect();
        let width = lines
            .iter()
            .map(|l| l.chars().count())
            .max()
            .unwrap_or(0)
            .min(area.width.saturating_sub(4) as usize) as u16
            + 4;
        let height = (lines.len() as u16 + 2).min(area.height);

        let x = area.x + (area.width.saturating_sub(width)) / 2;
        let y = area.y + (area.height.saturating_sub(height)) / 2;
        let popup = Rect::new(x, y, width.min(area.width), height);

        Clear.render(popup, frame.buffer_mut());
        let block = Block::default()
            .title(" rill ")
            .title_style(self.theme.accent_bold())
            .borders(Borders::ALL)
            .border_style(self.theme.accent_style());
        let text: Vec<Line> = lines
            .into_iter()
            .map(|l| Line::from(Span::styled(l.to_string(), self.theme.base_style())))
            .collect();
        frame.render_widget(Paragraph::new(text).block(block), popup);
    }
}

/// Run the TUI application
pub async fn run_tui(session: ChatSession, server_url: &str) -> anyhow::Result<()> {
    use crate::commands::{CommandResult, execute_command};
    use crossterm::{
        execute,
        terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
    };
    use ratatui::{Terminal, backend::CrosstermBackend};
    use std::io;

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let (ui_tx, mut ui_rx) = mpsc::channel::<UiMessage>(32);
    let mut state = TuiState::new(session.clone(), server_url.to_string(), ui_tx);

    let mut event_stream = EventStream::new();

    // Tick interval for spinner animation
    let mut tick_interval = tokio::time::interval(std::time::Duration::from_millis(80));

    // Prompt queued for the next loop iteration; kept as a String so the
    // turn future borrowing it lives long enough
    let mut pending_prompt: Option<String> = None;

    let result = loop {
        if let Some(content) = pending_prompt.take() {
            state.restart_spinner();
            state.set_status("Streaming...");
            state.scroll_to_bottom();

            let runner = session.clone();
            let mut turn_future = std::pin::pin!(runner.run_turn(&content));

            // Submitting mid-stream aborts this turn and queues the new one
            let mut queued: Option<String> = None;

            loop {
                terminal.draw(|frame| state.render(frame))?;
                let area_width = terminal.size()?.width;

                tokio::select! {
                    biased;

                    outcome = &mut turn_future => {
                        state.set_status(match outcome {
                            TurnOutcome::Completed => "Ready",
                            TurnOutcome::Failed => "Request failed",
                            TurnOutcome::Aborted => "Cancelled",
                        });
                        break;
                    }

                    event = event_stream.next() => {
                        match event {
                            Some(Ok(Event::Key(key))) => {
                                let action = rill_tui::input::key_to_action(key);
                                match action {
                                    Action::Interrupt | Action::Escape => {
                                        session.abort();
                                        state.set_status("Cancelling...");
                                    }
                                    Action::Quit => {
                                        disable_raw_mode()?;
                                        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
                                        terminal.show_cursor()?;
                                        return Ok(());
                                    }
                                    Action::Submit => {
                                        let next = state.input.content().trim().to_string();
                                        if !next.is_empty() && !next.starts_with('/') {
                                            state.input.clear();
                                            session.abort();
                                            queued = Some(next);
                                        }
                                    }
                                    _ => {
                                        // Typing stays responsive during a stream
                                        state.input.handle_action(&action, area_width);
                                    }
                                }
                            }
                            Some(Ok(Event::Paste(text))) => {
                                state.input.handle_action(&Action::Paste(text), area_width);
                            }
                            Some(Ok(Event::Mouse(mouse))) => match mouse.kind {
                                MouseEventKind::ScrollUp => {
                                    state.follow = false;
                                    state.scroll = state.scroll.saturating_sub(3);
                                }
                                MouseEventKind::ScrollDown => {
                                    state.scroll = state.scroll.saturating_add(3);
                                }
                                _ => {}
                            },
                            Some(Ok(Event::Resize(_, _))) => {}
                            Some(Err(_)) | None => {
                                disable_raw_mode()?;
                                execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
                                terminal.show_cursor()?;
                                return Ok(());
                            }
                            _ => {}
                        }
                    }

                    _ = tick_interval.tick() => {}
                }
            }

            pending_prompt = queued;
            terminal.draw(|frame| state.render(frame))?;
            continue;
        }

        terminal.draw(|frame| state.render(frame))?;
        let area_width = terminal.size()?.width;

        tokio::select! {
            biased;

            event = event_stream.next() => {
                match event {
                    Some(Ok(Event::Key(key))) => {
                        let action = rill_tui::input::key_to_action(key);
                        if !state.handle_action(action, area_width).await {
                            break Ok(());
                        }
                    }
                    Some(Ok(Event::Paste(text))) => {
                        state.handle_action(Action::Paste(text), area_width).await;
                    }
                    Some(Ok(Event::Mouse(mouse))) => match mouse.kind {
                        MouseEventKind::ScrollUp => {
                            state.follow = false;
                            state.scroll = state.scroll.saturating_sub(3);
                        }
                        MouseEventKind::ScrollDown => {
                            state.scroll = state.scroll.saturating_add(3);
                        }
                        _ => {}
                    },
                    Some(Ok(Event::Resize(_, _))) => {}
                    Some(Err(e)) => {
                        break Err(anyhow::anyhow!("Event error: {}", e));
                    }
                    None => {
                        break Ok(());
                    }
                    _ => {}
                }
            }

            _ = tick_interval.tick() => {}

            msg = ui_rx.recv() => {
                match msg {
                    Some(UiMessage::Submit(content)) => {
                        pending_prompt = Some(content);
                    }
                    Some(UiMessage::Command(cmd)) => {
                        if let Some(result) = execute_command(&cmd, &session.documents()) {
                            match result {
                                CommandResult::Message(msg) => {
                                    state.show_notice(msg);
                                }
                                CommandResult::Clear => {
                                    session.reset();
                                    state.scroll_to_bottom();
                                    state.set_status("Cleared");
                                }
                                CommandResult::OpenDocumentPanel => {
                                    let len = session.documents().lock().len();
                                    state.doc_panel.clamp(len);
                                    state.doc_panel.visible = true;
                                }
                                CommandResult::Exit => {
                                    break Ok(());
                                }
                                CommandResult::Unknown(cmd) => {
                                    state.show_notice(format!(
                                        "Unknown command: /{}\nType /help for available commands.",
                                        cmd
                                    ));
                                }
                            }
                        }
                    }
                    Some(UiMessage::Clear) => {
                        session.reset();
                        state.scroll_to_bottom();
                        state.set_status("Cleared");
                    }
                    Some(UiMessage::Abort) => {
                        session.abort();
                    }
                    Some(UiMessage::Quit) | None => {
                        break Ok(());
                    }
                }
            }
        }
    };

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}
