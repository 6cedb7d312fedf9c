//! View rendering modules
//!
//! Each part of the screen has its own module for rendering logic.

use ratatui::prelude::*;

mod footer;
mod input_line;
mod packet_list;
mod popup;

pub use footer::render_footer;
pub use input_line::render_input_line;
pub use packet_list::render_packet_list;
pub use popup::render_popup;

/// Breadcrumb navigation path segments
pub struct Breadcrumb {
    segments: Vec<String>,
}

impl Breadcrumb {
    /// Create a new breadcrumb with the root "packetview" segment
    pub fn new() -> Self {
        Self {
            segments: vec!["packetview".to_string()],
        }
    }

    /// Add a segment to the breadcrumb path
    pub fn push(mut self, segment: impl Into<String>) -> Self {
        self.segments.push(segment.into());
        self
    }

    /// Format the breadcrumb as a display string with " > " separators
    pub fn display(&self) -> String {
        self.segments.join(" > ")
    }

    /// Format the breadcrumb with an optional suffix (e.g., packet counts)
    pub fn display_with_suffix(&self, suffix: &str) -> String {
        if suffix.is_empty() {
            self.display()
        } else {
            format!("{} {}", self.display(), suffix)
        }
    }
}

impl Default for Breadcrumb {
    fn default() -> Self {
        Self::new()
    }
}

/// Centered rectangle of at most `width` x `height` inside `area`
pub fn centered_rect(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_breadcrumb() {
        let breadcrumb = Breadcrumb::new().push("capture.json");
        assert_eq!(breadcrumb.display(), "packetview > capture.json");
        assert_eq!(
            breadcrumb.display_with_suffix("(3 packets)"),
            "packetview > capture.json (3 packets)"
        );
        assert_eq!(breadcrumb.display_with_suffix(""), breadcrumb.display());
    }

    #[test]
    fn test_centered_rect() {
        let rect = centered_rect(Rect::new(0, 0, 100, 40), 50, 10);
        assert_eq!(rect, Rect::new(25, 15, 50, 10));

        // Clamped to the area
        let rect = centered_rect(Rect::new(10, 5, 20, 6), 50, 10);
        assert_eq!(rect, Rect::new(10, 5, 20, 6));
    }
}
