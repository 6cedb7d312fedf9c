//! Helper functions for consistent row rendering in the packet list.
//!
//! The selected row gets an arrow prefix and the selection colors, marked
//! rows get a marker and the mark color. A row can be both.

use ratatui::style::{Style, Stylize};

use crate::tui::theme::Theme;

/// Returns the selection prefix for a row.
///
/// Selected rows get an arrow (`▶ `), unselected rows get two spaces for alignment.
///
/// # Example
/// ```no_run
/// # use packetview::tui::widgets::selection::selection_prefix;
/// let prefix = selection_prefix(true);
/// assert_eq!(prefix, "▶ ");
/// ```
pub fn selection_prefix(is_selected: bool) -> &'static str {
    if is_selected {
        "▶ "
    } else {
        "  "
    }
}

/// Returns a style for a selected/unselected menu item using theme colors.
///
/// Selected items are bold with the accent color. Unselected items use the default text color.
///
/// # Example
/// ```no_run
/// # use packetview::tui::widgets::selection::selection_style_with_accent;
/// # use packetview::tui::theme::theme;
/// let style = selection_style_with_accent(true, theme());
/// ```
pub fn selection_style_with_accent(is_selected: bool, theme: &Theme) -> Style {
    if is_selected {
        Style::default().fg(theme.accent).bold()
    } else {
        Style::default().fg(theme.text)
    }
}

/// Returns the mark column for a row (`*` when marked).
pub fn mark_prefix(is_marked: bool) -> &'static str {
    if is_marked {
        "*"
    } else {
        " "
    }
}

/// Returns the style of a packet row.
///
/// Selection wins over marking for the colors; a marked row keeps its
/// marker when selected.
pub fn row_style(is_selected: bool, is_marked: bool, theme: &Theme) -> Style {
    if is_selected {
        theme.selected_style()
    } else if is_marked {
        theme.marked_style()
    } else {
        Style::default().fg(theme.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::style::{Color, Modifier};

    #[test]
    fn test_selection_prefix() {
        assert_eq!(selection_prefix(true), "▶ ");
        assert_eq!(selection_prefix(false), "  ");
        assert_eq!(mark_prefix(true), "*");
    }

    #[test]
    fn test_row_style() {
        let theme = Theme::dark();
        let selected = row_style(true, true, &theme);
        assert_eq!(selected.bg, Some(theme.selected_bg));

        let marked = row_style(false, true, &theme);
        assert!(matches!(marked.fg, Some(Color::Yellow)));
        assert!(marked.add_modifier.contains(Modifier::BOLD));

        let plain = row_style(false, false, &theme);
        assert!(plain.bg.is_none());

        let field = selection_style_with_accent(true, &theme);
        assert_eq!(field.fg, Some(theme.accent));
        assert!(field.add_modifier.contains(Modifier::BOLD));
    }
}
