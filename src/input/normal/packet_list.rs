//! Packet list input handler

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};

use crate::app::{Coordinator, InputMode};

/// Handle key while the packet list has focus
pub fn handle_packet_list_key(coordinator: &mut Coordinator, key: KeyEvent) -> Result<()> {
    if coordinator.execute_action(key.code) {
        return Ok(());
    }

    let page = coordinator.state.page_rows.max(1);
    match key.code {
        KeyCode::Up | KeyCode::Char('k') => coordinator.move_selection(|l| l.select_prev())?,
        KeyCode::Down | KeyCode::Char('j') => coordinator.move_selection(|l| l.select_next())?,
        KeyCode::PageUp => coordinator.move_selection(|l| l.page_up(page))?,
        KeyCode::PageDown => coordinator.move_selection(|l| l.page_down(page))?,
        KeyCode::Home | KeyCode::Char('g') => coordinator.move_selection(|l| l.select_first())?,
        KeyCode::End | KeyCode::Char('G') => coordinator.move_selection(|l| l.select_last())?,
        KeyCode::Char(' ') => {
            if let Some(marked) = coordinator.toggle_mark() {
                tracing::debug!("Mark toggled: {}", marked);
            }
        }
        KeyCode::Tab => {
            if coordinator.state.details.visible().is_some() {
                coordinator.state.input_mode = InputMode::DetailsFocus;
            }
        }
        KeyCode::Char('q') => coordinator.request_quit(),
        _ => {}
    }
    Ok(())
}
