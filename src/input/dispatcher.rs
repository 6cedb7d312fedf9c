//! Main input dispatch logic
//!
//! Routes keyboard events to appropriate handlers based on current mode.

use anyhow::Result;
use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::app::{Coordinator, InputMode};

/// Handle a terminal event delivered through the inbox
pub fn handle_event(coordinator: &mut Coordinator, event: Event) -> Result<()> {
    match event {
        Event::Key(key) => handle_key_event(coordinator, key),
        Event::Paste(text) => {
            if coordinator.state.input_mode.is_text_input() {
                // Only the first line; the input line is single-line
                let line = text.lines().next().unwrap_or("").trim();
                coordinator.state.input_buffer.push_str(line);
            }
            Ok(())
        }
        // Redrawn by the caller
        Event::Resize(_, _) | Event::FocusGained | Event::FocusLost | Event::Mouse(_) => Ok(()),
    }
}

/// Handle a key event by routing to the appropriate mode handler
pub fn handle_key_event(coordinator: &mut Coordinator, key: KeyEvent) -> Result<()> {
    // Only process key press events (not release/repeat)
    if key.kind != KeyEventKind::Press {
        return Ok(());
    }

    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        coordinator.request_quit();
        return Ok(());
    }

    // Open popups take every key
    if !coordinator.state.notifications.is_empty() {
        super::dialogs::handle_popup_key(coordinator, key);
        return Ok(());
    }

    match coordinator.state.input_mode {
        InputMode::Normal => super::normal::handle_packet_list_key(coordinator, key),
        InputMode::DetailsFocus => super::normal::handle_details_key(coordinator, key),
        InputMode::Filter | InputMode::Craft => {
            super::text_input::handle_input_line_key(coordinator, key)
        }
    }
}
