//! Single-line text input widget

use crate::input::Action;
use crate::theme::Theme;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::Style,
    widgets::{Block, Borders, Paragraph, Widget},
};
use unicode_width::UnicodeWidthChar;

/// Single-line text input with a character-indexed cursor and horizontal
/// scrolling for content wider than the box.
#[derive(Debug, Default)]
pub struct InputBox {
    /// Current input text
    content: String,
    /// Cursor position as a character index
    cursor: usize,
    /// Horizontal scroll offset in display columns
    scroll: usize,
    /// Placeholder shown while empty
    placeholder: String,
}

impl InputBox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = placeholder.into();
        self
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn clear(&mut self) {
        self.content.clear();
        self.cursor = 0;
        self.scroll = 0;
    }

    /// Handle an input action. Returns whether the action was consumed.
    pub fn handle_action(&mut self, action: &Action, width: u16) -> bool {
        let consumed = match action {
            Action::Char(c) => {
                self.insert_char(*c);
                true
            }
            Action::Backspace => {
                if self.cursor > 0 {
                    self.cursor -= 1;
                    self.remove_char_at_cursor();
                    true
                } else {
                    false
                }
            }
            Action::Delete => {
                if self.cursor < self.char_count() {
                    self.remove_char_at_cursor();
                    true
                } else {
                    false
                }
            }
            Action::Left => {
                if self.cursor > 0 {
                    self.cursor -= 1;
                    true
                } else {
                    false
                }
            }
            Action::Right => {
                if self.cursor < self.char_count() {
                    self.cursor += 1;
                    true
                } else {
                    false
                }
            }
            Action::Home => {
                self.cursor = 0;
                true
            }
            Action::End => {
                self.cursor = self.char_count();
                true
            }
            Action::ClearLine => {
                self.clear();
                true
            }
            Action::DeleteWord => {
                self.delete_word_before_cursor();
                true
            }
            Action::Paste(text) => {
                for c in text.chars() {
                    // Single-line input: newlines become spaces
                    self.insert_char(if c == '\n' || c == '\r' { ' ' } else { c });
                }
                true
            }
            _ => false,
        };

        if consumed {
            self.update_scroll(width as usize);
        }
        consumed
    }

    fn char_count(&self) -> usize {
        self.content.chars().count()
    }

    fn byte_offset(&self, char_index: usize) -> usize {
        self.content
            .char_indices()
            .nth(char_index)
            .map(|(i, _)| i)
            .unwrap_or(self.content.len())
    }

    fn insert_char(&mut self, c: char) {
        let at = self.byte_offset(self.cursor);
        self.content.insert(at, c);
        self.cursor += 1;
    }

    /// Remove the character at the cursor's character index
    fn remove_char_at_cursor(&mut self) {
        let start = self.byte_offset(self.cursor);
        let end = self.byte_offset(self.cursor + 1);
        self.content.drain(start..end);
    }

    fn delete_word_before_cursor(&mut self) {
        let chars: Vec<char> = self.content.chars().collect();
        let mut target = self.cursor;
        while target > 0 && chars[target - 1] == ' ' {
            target -= 1;
        }
        while target > 0 && chars[target - 1] != ' ' {
            target -= 1;
        }
        let start = self.byte_offset(target);
        let end = self.byte_offset(self.cursor);
        self.content.drain(start..end);
        self.cursor = target;
    }

    fn display_width_before_cursor(&self) -> usize {
        self.content
            .chars()
            .take(self.cursor)
            .map(|c| c.width().unwrap_or(0))
            .sum()
    }

    fn update_scroll(&mut self, width: usize) {
        let visible = width.saturating_sub(4);
        let cursor_col = self.display_width_before_cursor();
        if cursor_col < self.scroll {
            self.scroll = cursor_col;
        } else if visible > 0 && cursor_col >= self.scroll + visible {
            self.scroll = cursor_col - visible + 1;
        }
    }

    /// Render the input box with its border and cursor
    pub fn render(&self, area: Rect, buf: &mut Buffer, theme: &Theme) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(theme.accent_style());
        let inner = block.inner(area);
        block.render(area, buf);

        let (display, style) = if self.content.is_empty() {
            (self.placeholder.clone(), theme.dim_style())
        } else {
            (self.visible_slice(inner.width as usize), theme.base_style())
        };
        Paragraph::new(display).style(style).render(inner, buf);

        if inner.width > 0 {
            let cursor_col = self.display_width_before_cursor().saturating_sub(self.scroll);
            if cursor_col < inner.width as usize {
                let pos = (inner.x + cursor_col as u16, inner.y);
                if let Some(cell) = buf.cell_mut(pos) {
                    cell.set_style(Style::default().bg(theme.accent));
                }
            }
        }
    }

    /// The horizontally scrolled window of the content that fits the box
    fn visible_slice(&self, width: usize) -> String {
        let mut out = String::new();
        let mut col = 0usize;
        for c in self.content.chars() {
            let w = c.width().unwrap_or(0);
            if col + w <= self.scroll {
                col += w;
                continue;
            }
            if out.chars().map(|c| c.width().unwrap_or(0)).sum::<usize>() + w > width {
                break;
            }
            out.push(c);
            col += w;
        }
        out
    }
}
