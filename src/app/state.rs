//! UI state
//!
//! Everything the screen shows besides packets and views: input mode, the
//! bottom input line, the details panel and the popup queue.

use crate::tui::NotificationManager;

use super::input_mode::InputMode;
use super::view::DetailsPanel;

/// Rows moved by PgUp/PgDn until the first render measured the list
const DEFAULT_PAGE_ROWS: usize = 20;

#[derive(Debug)]
pub struct UiState {
    pub input_mode: InputMode,
    /// Text typed into the filter or craft line
    pub input_buffer: String,
    /// Last filter text, offered again when the filter line reopens
    pub last_filter: String,
    pub details: DetailsPanel,
    /// Height of the details panel when shown (percent)
    pub details_height_percent: u16,
    pub notifications: NotificationManager,
    /// Rows visible in the packet list, set while rendering
    pub page_rows: usize,
    /// Whether the capture is paused
    pub paused: bool,
    /// Whether the live capture reached its end
    pub capture_finished: bool,
    /// Something changed since the last frame
    pub needs_render: bool,
}

impl UiState {
    pub fn new(details_height_percent: u16) -> Self {
        Self {
            input_mode: InputMode::Normal,
            input_buffer: String::new(),
            last_filter: String::new(),
            details: DetailsPanel::default(),
            details_height_percent,
            notifications: NotificationManager::new(),
            page_rows: DEFAULT_PAGE_ROWS,
            paused: false,
            capture_finished: false,
            needs_render: true,
        }
    }

    /// Open the input line in `mode`, pre-filled with `text`
    pub fn start_input(&mut self, mode: InputMode, text: &str) {
        self.input_mode = mode;
        self.input_buffer = text.to_string();
    }

    /// Close the input line, returning what was typed
    pub fn take_input(&mut self) -> String {
        self.input_mode = InputMode::Normal;
        std::mem::take(&mut self.input_buffer)
    }
}

impl Default for UiState {
    fn default() -> Self {
        Self::new(30)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_line_round_trip() {
        let mut state = UiState::default();
        state.start_input(InputMode::Filter, "sport == 1");
        assert!(state.input_mode.is_text_input());
        state.input_buffer.push('2');

        assert_eq!(state.take_input(), "sport == 12");
        assert_eq!(state.input_mode, InputMode::Normal);
        assert!(state.input_buffer.is_empty());
    }
}
