//! Theme module for centralized color and style definitions
//!
//! Semantic colors used by the packet list, details views, popups and the
//! button bar. The preset is picked once at startup from the config file.

use ratatui::style::{Color, Modifier, Style};

/// Application theme with all color definitions
#[derive(Debug, Clone)]
pub struct Theme {
    // === UI Elements ===
    /// Primary accent color (headers, titles)
    pub accent: Color,
    /// Text color for normal content
    pub text: Color,
    /// Text color for muted/secondary content
    pub text_muted: Color,
    /// Background of the selected packet row
    pub selected_bg: Color,
    /// Foreground of the selected packet row
    pub selected_fg: Color,
    /// Marked packet rows
    pub marked: Color,

    // === Input Line ===
    /// Color for the filter/craft prompt
    pub input_prompt: Color,

    // === Capture Status ===
    pub status_live: Color,
    pub status_paused: Color,
    pub status_finished: Color,

    // === Button Bar ===
    /// Function key label background
    pub button_key_bg: Color,
    /// Button label background
    pub button_bg: Color,
    pub button_fg: Color,

    // === Popups ===
    pub popup_info: Color,
    pub popup_question: Color,

    // === Borders ===
    /// Normal border color
    pub border: Color,
    /// Focused border color
    pub border_focused: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self::dark()
    }
}

impl Theme {
    /// Dark theme (default)
    pub fn dark() -> Self {
        Self {
            accent: Color::Cyan,
            text: Color::White,
            text_muted: Color::DarkGray,
            selected_bg: Color::Cyan,
            selected_fg: Color::Black,
            marked: Color::Yellow,

            input_prompt: Color::Magenta,

            status_live: Color::Green,
            status_paused: Color::Yellow,
            status_finished: Color::DarkGray,

            button_key_bg: Color::Black,
            button_bg: Color::Cyan,
            button_fg: Color::Black,

            popup_info: Color::Cyan,
            popup_question: Color::Yellow,

            border: Color::White,
            border_focused: Color::Cyan,
        }
    }

    /// Light theme for bright terminal backgrounds
    pub fn light() -> Self {
        Self {
            accent: Color::Blue,
            text: Color::Black,
            text_muted: Color::Gray,
            selected_bg: Color::Blue,
            selected_fg: Color::White,
            marked: Color::Magenta,

            input_prompt: Color::Magenta,

            status_live: Color::Green,
            status_paused: Color::Red,
            status_finished: Color::Gray,

            button_key_bg: Color::White,
            button_bg: Color::Blue,
            button_fg: Color::White,

            popup_info: Color::Blue,
            popup_question: Color::Magenta,

            border: Color::Black,
            border_focused: Color::Blue,
        }
    }

    /// Theme by preset name; unknown names fall back to dark
    pub fn from_preset(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "light" => Self::light(),
            "dark" => Self::dark(),
            other => {
                tracing::warn!("Unknown theme preset '{}', using dark", other);
                Self::dark()
            }
        }
    }

    // === Style Builders ===

    /// Style for headers/titles
    pub fn header_style(&self) -> Style {
        Style::default().fg(self.accent).add_modifier(Modifier::BOLD)
    }

    /// Style for muted text
    pub fn muted_style(&self) -> Style {
        Style::default().fg(self.text_muted)
    }

    /// Style for the selected packet row
    pub fn selected_style(&self) -> Style {
        Style::default()
            .fg(self.selected_fg)
            .bg(self.selected_bg)
            .add_modifier(Modifier::BOLD)
    }

    /// Style for marked packet rows
    pub fn marked_style(&self) -> Style {
        Style::default().fg(self.marked).add_modifier(Modifier::BOLD)
    }

    /// Style for input prompts
    pub fn input_style(&self) -> Style {
        Style::default().fg(self.input_prompt)
    }

    /// Border style of a pane
    pub fn border_style(&self, focused: bool) -> Style {
        if focused {
            Style::default().fg(self.border_focused)
        } else {
            Style::default().fg(self.border)
        }
    }

    pub fn button_key_style(&self) -> Style {
        Style::default().fg(self.text).bg(self.button_key_bg)
    }

    pub fn button_style(&self) -> Style {
        Style::default().fg(self.button_fg).bg(self.button_bg)
    }
}

/// Global theme instance
static THEME: std::sync::OnceLock<Theme> = std::sync::OnceLock::new();

/// Pick the theme preset; only the first call has an effect
pub fn init_theme(preset: &str) {
    if THEME.set(Theme::from_preset(preset)).is_err() {
        tracing::debug!("Theme already initialized, ignoring preset '{}'", preset);
    }
}

/// Get the current theme
pub fn theme() -> &'static Theme {
    THEME.get_or_init(Theme::default)
}
