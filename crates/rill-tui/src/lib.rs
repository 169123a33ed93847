//! rill-tui: terminal UI components for the rill chat client

pub mod input;
pub mod theme;
pub mod widgets;

pub use theme::Theme;
