//! Input mode enum
//!
//! Defines how keyboard input is handled based on the current mode. Open
//! popups take precedence over every mode.

/// Input mode determines how keyboard input is handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    /// Keys drive the packet list
    #[default]
    Normal,
    /// Keys go to the visible details view
    DetailsFocus,
    /// Typing a filter expression
    Filter,
    /// Typing a packet to craft and send
    Craft,
}

impl InputMode {
    /// Whether the bottom input line is active
    pub fn is_text_input(&self) -> bool {
        matches!(self, InputMode::Filter | InputMode::Craft)
    }

    /// Prompt shown before the input line
    pub fn prompt(&self) -> &'static str {
        match self {
            InputMode::Filter => "Filter: ",
            InputMode::Craft => "Craft: ",
            InputMode::Normal | InputMode::DetailsFocus => "",
        }
    }
}
