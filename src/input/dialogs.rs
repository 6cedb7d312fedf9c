//! Popup handlers
//!
//! Info popups are acknowledged with Enter, Esc or Space. Questions take
//! y/n directly, or Left/Right/Tab to move between Yes and No and Enter to
//! confirm.

use crossterm::event::{KeyCode, KeyEvent};

use crate::app::Coordinator;

/// Handle key while a popup is open
pub fn handle_popup_key(coordinator: &mut Coordinator, key: KeyEvent) {
    let Some(current) = coordinator.state.notifications.current() else {
        return;
    };

    if !current.is_question() {
        if matches!(key.code, KeyCode::Enter | KeyCode::Esc | KeyCode::Char(' ')) {
            coordinator.answer_popup(true);
        }
        return;
    }

    match key.code {
        KeyCode::Char('y') | KeyCode::Char('Y') => coordinator.answer_popup(true),
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => coordinator.answer_popup(false),
        KeyCode::Left | KeyCode::Right | KeyCode::Tab => {
            coordinator.state.notifications.toggle_selection();
        }
        KeyCode::Enter => {
            let accepted = coordinator.state.notifications.selected_yes();
            coordinator.answer_popup(accepted);
        }
        _ => {}
    }
}
