//! Knowledge base popup
//!
//! Centered overlay listing the session's documents with their active
//! markers. Space toggles, `d` deletes; the key handling lives in the caller,
//! this widget only renders and tracks the selection.

use crate::theme::Theme;
use rill_chat::DocumentStore;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::Modifier,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, StatefulWidget, Widget},
};

const MAX_PANEL_WIDTH: u16 = 70;
const MIN_PANEL_WIDTH: u16 = 30;

/// Visibility and selection state for the panel
#[derive(Debug, Default)]
pub struct DocumentPanelState {
    pub visible: bool,
    pub selected: usize,
}

impl DocumentPanelState {
    pub fn toggle(&mut self) {
        self.visible = !self.visible;
    }

    pub fn hide(&mut self) {
        self.visible = false;
    }

    pub fn up(&mut self, len: usize) {
        if len > 0 {
            self.selected = self.selected.checked_sub(1).unwrap_or(len - 1);
        }
    }

    pub fn down(&mut self, len: usize) {
        if len > 0 {
            self.selected = (self.selected + 1) % len;
        }
    }

    /// Keep the selection in range after a removal
    pub fn clamp(&mut self, len: usize) {
        if len == 0 {
            self.selected = 0;
        } else if self.selected >= len {
            self.selected = len - 1;
        }
    }
}

/// The knowledge base overlay widget
pub struct DocumentPanel<'a> {
    store: &'a DocumentStore,
    state: &'a DocumentPanelState,
    theme: &'a Theme,
}

impl<'a> DocumentPanel<'a> {
    pub fn new(store: &'a DocumentStore, state: &'a DocumentPanelState, theme: &'a Theme) -> Self {
        Self {
            store,
            state,
            theme,
        }
    }

    fn entry_label(title: &str, content: &str, active: bool) -> String {
        let words = content.split_whitespace().count();
        let marker = if active { "●" } else { "○" };
        format!("{marker} {title} ({words} words)")
    }

    /// Render the panel centered in `area`
    pub fn render_centered(self, area: Rect, buf: &mut Buffer) {
        let docs = self.store.documents();

        let labels: Vec<(String, bool)> = docs
            .iter()
            .map(|d| {
                let active = self.store.is_active(&d.id);
                (Self::entry_label(&d.title, &d.content, active), active)
            })
            .collect();

        let content_width = labels
            .iter()
            .map(|(label, _)| label.chars().count())
            .max()
            .unwrap_or(0) as u16
            + 6;
        let width = content_width
            .clamp(MIN_PANEL_WIDTH, MAX_PANEL_WIDTH)
            .min(area.width);
        let height = (labels.len().max(1) as u16 + 3).min(area.height);

        let x = area.x + (area.width.saturating_sub(width)) / 2;
        let y = area.y + (area.height.saturating_sub(height)) / 2;
        let panel_area = Rect::new(x, y, width, height);

        Clear.render(panel_area, buf);

        let title = format!(
            " Knowledge Base ({}/{} active) ",
            self.store.active_count(),
            self.store.len()
        );
        let block = Block::default()
            .title(title)
            .title_style(self.theme.accent_bold())
            .borders(Borders::ALL)
            .border_style(self.theme.accent_style());
        let inner = block.inner(panel_area);
        block.render(panel_area, buf);

        if labels.is_empty() {
            let empty = Span::styled(
                "No documents yet. Use /doc add <title> :: <content>",
                self.theme.dim_style(),
            );
            buf.set_span(inner.x, inner.y, &empty, inner.width);
            return;
        }

        let items: Vec<ListItem> = labels
            .iter()
            .enumerate()
            .map(|(i, (label, active))| {
                let style = if i == self.state.selected {
                    self.theme
                        .accent_style()
                        .add_modifier(Modifier::REVERSED)
                } else if *active {
                    self.theme.accent_style()
                } else {
                    self.theme.dim_style()
                };
                ListItem::new(Line::from(Span::styled(label.clone(), style)))
            })
            .collect();

        let list_area = Rect {
            height: inner.height.saturating_sub(1),
            ..inner
        };
        let mut list_state = ListState::default();
        list_state.select(Some(self.state.selected));
        StatefulWidget::render(List::new(items), list_area, buf, &mut list_state);

        // Footer hint
        if inner.height > 1 {
            let hint = Span::styled("space: toggle │ d: delete │ esc: close", self.theme.dim_style());
            buf.set_span(inner.x, inner.y + inner.height - 1, &hint, inner.width);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_wraps() {
        let mut state = DocumentPanelState::default();
        state.down(3);
        state.down(3);
        state.down(3);
        assert_eq!(state.selected, 0);
        state.up(3);
        assert_eq!(state.selected, 2);
    }

    #[test]
    fn test_clamp_after_removal() {
        let mut state = DocumentPanelState {
            visible: true,
            selected: 2,
        };
        state.clamp(2);
        assert_eq!(state.selected, 1);
        state.clamp(0);
        assert_eq!(state.selected, 0);
    }

    #[test]
    fn test_entry_label() {
        assert_eq!(
            DocumentPanel::entry_label("Notes", "one two three", true),
            "● Notes (3 words)"
        );
        assert_eq!(
            DocumentPanel::entry_label("Notes", "", false),
            "○ Notes (0 words)"
        );
    }
}
