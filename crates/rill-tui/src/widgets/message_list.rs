//! Conversation view widget
//!
//! Renders the message list with author headers, streamed text, the search
//! stage trail, source URLs, and referenced document titles.

use crate::theme::Theme;
use crate::widgets::spinner::clock_frame;
use rill_chat::{DocumentStore, Message, SearchProgress, SearchStage};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    text::{Line, Span},
    widgets::{Paragraph, Widget, Wrap},
};

/// Widget for displaying the conversation
pub struct MessageList<'a> {
    messages: &'a [Message],
    documents: &'a DocumentStore,
    theme: &'a Theme,
    scroll: usize,
}

impl<'a> MessageList<'a> {
    pub fn new(messages: &'a [Message], documents: &'a DocumentStore, theme: &'a Theme) -> Self {
        Self {
            messages,
            documents,
            theme,
            scroll: 0,
        }
    }

    /// Set scroll offset in lines
    pub fn scroll(mut self, scroll: usize) -> Self {
        self.scroll = scroll;
        self
    }
}

impl Widget for MessageList<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width == 0 || area.height == 0 {
            return;
        }

        let width = area.width as usize;
        let mut all_lines: Vec<Line> = Vec::new();
        for msg in self.messages {
            all_lines.extend(message_lines(msg, self.documents, self.theme, width));
        }

        let visible: Vec<Line> = all_lines
            .into_iter()
            .skip(self.scroll)
            .take(area.height as usize)
            .collect();

        Paragraph::new(visible)
            .wrap(Wrap { trim: false })
            .render(area, buf);
    }
}

/// Total rendered height of the conversation at the given width
pub fn conversation_height(
    messages: &[Message],
    documents: &DocumentStore,
    theme: &Theme,
    width: usize,
) -> usize {
    messages
        .iter()
        .map(|msg| message_lines(msg, documents, theme, width).len())
        .sum()
}

/// Render one message into display lines
fn message_lines(
    msg: &Message,
    documents: &DocumentStore,
    theme: &Theme,
    width: usize,
) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    let content_width = width.saturating_sub(2).max(1);

    let (header, header_style) = if msg.is_user() {
        ("▶ You".to_string(), theme.accent_bold())
    } else if msg.loading {
        ("◀ Assistant ▌".to_string(), theme.success_style())
    } else {
        ("◀ Assistant".to_string(), theme.success_style())
    };
    lines.push(Line::from(Span::styled(header, header_style)));

    if let Some(search) = &msg.search {
        lines.extend(search_lines(search, theme));
    }

    if msg.text.is_empty() && msg.loading {
        lines.push(Line::from(Span::styled(
            format!("  {} thinking...", clock_frame()),
            theme.progress_style(),
        )));
    } else {
        for wrapped in textwrap::wrap(&msg.text, content_width) {
            lines.push(Line::from(Span::styled(
                format!("  {wrapped}"),
                theme.base_style(),
            )));
        }
    }

    if let Some(refs) = &msg.document_refs {
        if !refs.is_empty() {
            let titles: Vec<String> = refs
                .iter()
                .map(|id| {
                    documents
                        .title_of(id)
                        .map(str::to_string)
                        .unwrap_or_else(|| id.clone())
                })
                .collect();
            lines.push(Line::from(Span::styled(
                format!("  ⛁ Sources: {}", titles.join(", ")),
                theme.dim_style(),
            )));
        }
    }

    lines.push(Line::from(""));
    lines
}

/// The search stage trail plus URLs and any search error
fn search_lines(search: &SearchProgress, theme: &Theme) -> Vec<Line<'static>> {
    let mut lines = Vec::new();

    if !search.stages.is_empty() {
        let mut spans = vec![Span::styled("  ⌕ ".to_string(), theme.dim_style())];
        let last = search.stages.len() - 1;
        for (i, stage) in search.stages.iter().enumerate() {
            let style = match stage {
                SearchStage::Error => theme.error_style(),
                _ if i == last => theme.progress_style(),
                _ => theme.dim_style(),
            };
            spans.push(Span::styled(stage.label().to_string(), style));
            if i != last {
                spans.push(Span::styled(" → ".to_string(), theme.dim_style()));
            }
        }
        if !search.query.is_empty() {
            spans.push(Span::styled(
                format!("  \"{}\"", search.query),
                theme.dim_style(),
            ));
        }
        lines.push(Line::from(spans));
    }

    for url in &search.urls {
        lines.push(Line::from(Span::styled(
            format!("    • {url}"),
            theme.link_style(),
        )));
    }

    if let Some(error) = &search.error {
        lines.push(Line::from(Span::styled(
            format!("    ✗ {error}"),
            theme.error_style(),
        )));
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use rill_chat::Conversation;

    fn line_text(line: &Line<'_>) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    fn lines_text(lines: &[Line<'_>]) -> Vec<String> {
        lines.iter().map(line_text).collect()
    }

    #[test]
    fn test_user_message_renders_header_and_text() {
        let theme = Theme::dark();
        let store = DocumentStore::new();
        let msg = Message::user(1, "hello there");

        let text = lines_text(&message_lines(&msg, &store, &theme, 80));
        assert_eq!(text[0], "▶ You");
        assert_eq!(text[1], "  hello there");
    }

    #[test]
    fn test_search_trail_renders_stage_labels() {
        let theme = Theme::dark();
        let store = DocumentStore::new();
        let mut msg = Message::assistant(2, "answer");
        let mut search = SearchProgress::started("RAG");
        search.push_stage(SearchStage::Reading);
        search.urls = vec!["http://a".to_string()];
        msg.search = Some(search);

        let text = lines_text(&message_lines(&msg, &store, &theme, 80));
        assert_eq!(text[1], "  ⌕ searching → reading  \"RAG\"");
        assert_eq!(text[2], "    • http://a");
    }

    #[test]
    fn test_document_refs_fall_back_to_id() {
        let theme = Theme::dark();
        let mut store = DocumentStore::new();
        let id = store.add("My Notes", "body");

        let mut msg = Message::assistant(2, "answer");
        msg.document_refs = Some(vec![id.clone(), "doc_missing".to_string()]);

        let text = lines_text(&message_lines(&msg, &store, &theme, 80));
        assert!(text.contains(&"  ⛁ Sources: My Notes, doc_missing".to_string()));
    }

    #[test]
    fn test_height_matches_rendered_lines() {
        let theme = Theme::dark();
        let store = DocumentStore::new();
        let mut conv = Conversation::new();
        conv.begin_turn("a question that should wrap across a couple of lines at narrow widths");

        let width = 24;
        let expected: usize = conv
            .messages()
            .iter()
            .map(|m| message_lines(m, &store, &theme, width).len())
            .sum();
        assert_eq!(
            conversation_height(conv.messages(), &store, &theme, width),
            expected
        );
    }
}
