//! Input line handler
//!
//! The bottom input line is shared by the filter and the craft prompt.

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::{Coordinator, InputMode};

/// Handle key while typing into the input line
pub fn handle_input_line_key(coordinator: &mut Coordinator, key: KeyEvent) -> Result<()> {
    match key.code {
        KeyCode::Esc => {
            coordinator.state.take_input();
        }
        KeyCode::Enter => {
            let mode = coordinator.state.input_mode;
            let text = coordinator.state.take_input();
            match mode {
                InputMode::Filter => coordinator.commit_filter(&text)?,
                InputMode::Craft => coordinator.commit_craft(&text),
                InputMode::Normal | InputMode::DetailsFocus => {}
            }
        }
        KeyCode::Backspace => {
            coordinator.state.input_buffer.pop();
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            coordinator.state.input_buffer.clear();
        }
        KeyCode::Char(c) => {
            coordinator.state.input_buffer.push(c);
        }
        _ => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::ViewerOptions;
    use crate::capture::PacketSource;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_escape_discards_input() {
        let mut coordinator =
            Coordinator::new(PacketSource::List(Vec::new()), Vec::new(), ViewerOptions::default());
        coordinator.state.start_input(InputMode::Filter, "");
        handle_input_line_key(&mut coordinator, press(KeyCode::Char('x'))).unwrap();
        handle_input_line_key(&mut coordinator, press(KeyCode::Char('y'))).unwrap();
        handle_input_line_key(&mut coordinator, press(KeyCode::Backspace)).unwrap();
        assert_eq!(coordinator.state().input_buffer, "x");

        handle_input_line_key(&mut coordinator, press(KeyCode::Esc)).unwrap();
        assert_eq!(coordinator.state().input_mode, InputMode::Normal);
        assert!(coordinator.state().last_filter.is_empty());
    }

    #[test]
    fn test_empty_filter_clears() {
        let mut coordinator =
            Coordinator::new(PacketSource::List(Vec::new()), Vec::new(), ViewerOptions::default());
        coordinator.state.start_input(InputMode::Filter, "");
        handle_input_line_key(&mut coordinator, press(KeyCode::Enter)).unwrap();
        assert!(coordinator.list().filter().is_none());
        assert!(coordinator.notifications().is_empty());
    }
}
