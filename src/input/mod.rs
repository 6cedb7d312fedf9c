//! Input handling module
//!
//! Routes terminal events to handlers based on open popups and the current
//! input mode.

pub mod dialogs;
pub mod dispatcher;
pub mod normal;
pub mod text_input;

pub use dispatcher::{handle_event, handle_key_event};
