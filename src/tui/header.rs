//! Header component
//!
//! One line with the breadcrumb and packet counts on the left and the
//! capture status right-aligned.

use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};

use crate::tui::theme::theme;
use crate::tui::views::Breadcrumb;

/// State of the packet source shown in the header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureStatus {
    /// A fixed packet list
    Offline,
    Live,
    Paused,
    /// The live source reached its end
    Finished,
}

impl CaptureStatus {
    pub fn label(&self) -> &'static str {
        match self {
            CaptureStatus::Offline => "offline",
            CaptureStatus::Live => "\u{25CF} live",
            CaptureStatus::Paused => "paused",
            CaptureStatus::Finished => "finished",
        }
    }

    fn color(&self) -> Color {
        let t = theme();
        match self {
            CaptureStatus::Offline | CaptureStatus::Finished => t.status_finished,
            CaptureStatus::Live => t.status_live,
            CaptureStatus::Paused => t.status_paused,
        }
    }
}

pub struct Header {
    breadcrumb: Breadcrumb,
    /// Optional suffix text (e.g., "(12 packets, 2 marked)")
    suffix: Option<String>,
    status: Option<CaptureStatus>,
}

impl Header {
    pub fn new(breadcrumb: Breadcrumb) -> Self {
        Self {
            breadcrumb,
            suffix: None,
            status: None,
        }
    }

    /// Add a suffix to the header (e.g., packet counts)
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        let s = suffix.into();
        if !s.is_empty() {
            self.suffix = Some(s);
        }
        self
    }

    pub fn with_status(mut self, status: CaptureStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Render the header to the given area
    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let t = theme();

        let left_text = match &self.suffix {
            Some(suffix) => self.breadcrumb.display_with_suffix(suffix),
            None => self.breadcrumb.display(),
        };
        let right_text = self.status.map(|s| s.label()).unwrap_or_default();

        let width = area.width as usize;
        let padding = width.saturating_sub(left_text.chars().count() + right_text.chars().count());

        let mut spans = vec![Span::raw(left_text)];
        if padding > 0 {
            spans.push(Span::raw(" ".repeat(padding)));
        }
        if let Some(status) = self.status {
            spans.push(Span::styled(right_text, Style::default().fg(status.color()).bold()));
        }

        let paragraph = Paragraph::new(Line::from(spans))
            .style(t.header_style())
            .block(Block::default().borders(Borders::BOTTOM));
        frame.render_widget(paragraph, area);
    }
}

/// Height constant for the header (including bottom border)
pub const HEADER_HEIGHT: u16 = 2;
