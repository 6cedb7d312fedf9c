//! Details view input handler

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};

use crate::app::{Coordinator, InputMode};

/// Handle key while the visible details view has focus
///
/// Function keys stay bound to the buttons; everything else goes to the view
/// first, and Esc or Tab return focus to the list when the view ignores them.
pub fn handle_details_key(coordinator: &mut Coordinator, key: KeyEvent) -> Result<()> {
    if coordinator.execute_action(key.code) {
        return Ok(());
    }
    if coordinator.state.details.visible().is_none() {
        coordinator.state.input_mode = InputMode::Normal;
        return Ok(());
    }
    if coordinator.view_key(key) {
        return Ok(());
    }
    if matches!(key.code, KeyCode::Esc | KeyCode::Tab) {
        coordinator.state.input_mode = InputMode::Normal;
    }
    Ok(())
}
