//! Custom widgets for the TUI

pub mod document_panel;
pub mod input_box;
pub mod message_list;
pub mod spinner;

pub use document_panel::{DocumentPanel, DocumentPanelState};
pub use input_box::InputBox;
pub use message_list::MessageList;
pub use spinner::Spinner;
