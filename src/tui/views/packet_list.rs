//! Packet list rendering
//!
//! A bordered pane with the column header on top and one line per visible
//! packet. The window scrolls so the selected row stays on screen.

use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};

use crate::app::PacketListView;
use crate::tui::theme::theme;
use crate::tui::widgets::selection::{mark_prefix, row_style, selection_prefix};

/// Render the packet list; returns the number of packet rows that fit
pub fn render_packet_list(frame: &mut Frame, area: Rect, list: &PacketListView, focused: bool) -> usize {
    let t = theme();

    let mut title = format!(" Packets ({}/{}) ", list.visible_len(), list.packets().len());
    if let Some(filter) = list.filter() {
        title.push_str(&format!("[{}] ", filter.source()));
    }
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(t.border_style(focused))
        .title(Span::styled(title, t.header_style()));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let rows = usize::from(inner.height.saturating_sub(1));
    let offset = scroll_offset(list.selected_position(), rows);

    let mut lines = Vec::with_capacity(rows + 1);
    lines.push(Line::from(Span::styled(
        format!("   {}", list.header()),
        t.muted_style().add_modifier(Modifier::BOLD),
    )));

    let selected = list.selected();
    for (index, row) in list.visible_rows().skip(offset).take(rows) {
        let is_selected = selected == Some(index);
        let is_marked = list.is_marked(index);
        lines.push(Line::from(Span::styled(
            format!(
                "{}{}{}",
                selection_prefix(is_selected),
                mark_prefix(is_marked),
                row
            ),
            row_style(is_selected, is_marked, t),
        )));
    }

    if list.visible_len() == 0 {
        let hint = if list.packets().is_empty() {
            "Waiting for packets..."
        } else {
            "No packet matches the filter"
        };
        lines.push(Line::from(Span::styled(format!("   {}", hint), t.muted_style())));
    }

    frame.render_widget(Paragraph::new(lines), inner);
    rows
}

/// First visible row so that `position` is inside a window of `rows`
fn scroll_offset(position: Option<usize>, rows: usize) -> usize {
    match position {
        Some(pos) if rows > 0 && pos >= rows => pos + 1 - rows,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scroll_offset() {
        assert_eq!(scroll_offset(None, 10), 0);
        assert_eq!(scroll_offset(Some(3), 10), 0);
        assert_eq!(scroll_offset(Some(9), 10), 0);
        assert_eq!(scroll_offset(Some(10), 10), 1);
        assert_eq!(scroll_offset(Some(25), 10), 16);
        assert_eq!(scroll_offset(Some(5), 0), 0);
    }
}
