//! Screen layout helper
//!
//! Splits the screen into header, packet list, details panel, input line and
//! button bar.

use ratatui::prelude::*;

use crate::tui::header::HEADER_HEIGHT;

/// Height of the button bar plus the key hint line
pub const FOOTER_HEIGHT: u16 = 2;

/// Height of the filter/craft input line
pub const INPUT_LINE_HEIGHT: u16 = 1;

/// Minimum rows the packet list keeps next to a shown details panel
const MIN_LIST_HEIGHT: u16 = 3;

/// Screen layout builder
pub struct ScreenLayout {
    area: Rect,
    /// Height of the details panel in percent of the body (0 when hidden)
    details_percent: u16,
    /// Whether the input line is open
    input_line: bool,
}

impl ScreenLayout {
    pub fn new(area: Rect) -> Self {
        Self {
            area,
            details_percent: 0,
            input_line: false,
        }
    }

    /// Reserve `percent` of the body for the details panel
    pub fn with_details(mut self, percent: u16) -> Self {
        self.details_percent = percent.min(100);
        self
    }

    pub fn with_input_line(mut self, open: bool) -> Self {
        self.input_line = open;
        self
    }

    /// Calculate the areas
    pub fn split(self) -> LayoutAreas {
        let input_height = if self.input_line { INPUT_LINE_HEIGHT } else { 0 };
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(HEADER_HEIGHT),
                Constraint::Min(0),
                Constraint::Length(input_height),
                Constraint::Length(FOOTER_HEIGHT),
            ])
            .split(self.area);
        let (header, body, input, footer) = (chunks[0], chunks[1], chunks[2], chunks[3]);

        let (list, details) = if self.details_percent == 0 {
            (body, None)
        } else {
            let wanted = (u32::from(body.height) * u32::from(self.details_percent) / 100) as u16;
            let details_height = wanted.min(body.height.saturating_sub(MIN_LIST_HEIGHT));
            let parts = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Min(0), Constraint::Length(details_height)])
                .split(body);
            (parts[0], Some(parts[1]))
        };

        LayoutAreas {
            header,
            list,
            details,
            input: self.input_line.then_some(input),
            footer,
        }
    }
}

/// Areas calculated by ScreenLayout
#[derive(Debug, Clone, Copy)]
pub struct LayoutAreas {
    pub header: Rect,
    pub list: Rect,
    /// Details panel (if shown)
    pub details: Option<Rect>,
    /// Input line (if open)
    pub input: Option<Rect>,
    pub footer: Rect,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_without_details() {
        let areas = ScreenLayout::new(Rect::new(0, 0, 100, 30)).split();
        assert_eq!(areas.header.height, HEADER_HEIGHT);
        assert_eq!(areas.footer.height, FOOTER_HEIGHT);
        assert_eq!(areas.list.height, 30 - HEADER_HEIGHT - FOOTER_HEIGHT);
        assert!(areas.details.is_none());
        assert!(areas.input.is_none());
    }

    #[test]
    fn test_layout_with_details_and_input() {
        let areas = ScreenLayout::new(Rect::new(0, 0, 100, 30))
            .with_details(50)
            .with_input_line(true)
            .split();
        let details = areas.details.unwrap();
        assert_eq!(areas.list.height + details.height, 30 - HEADER_HEIGHT - FOOTER_HEIGHT - 1);
        assert_eq!(details.height, 12);
        assert_eq!(areas.input.unwrap().height, INPUT_LINE_HEIGHT);
    }

    #[test]
    fn test_list_keeps_minimum_rows() {
        let areas = ScreenLayout::new(Rect::new(0, 0, 100, 10)).with_details(100).split();
        assert_eq!(areas.list.height, MIN_LIST_HEIGHT);
    }
}
