//! Footer rendering
//!
//! Key hints for the focused pane on the first line, the function key
//! button bar on the second.

use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

use crate::app::Action;
use crate::tui::theme::theme;

pub fn render_footer(frame: &mut Frame, area: Rect, actions: &[Action], hints: &[(&str, &str)]) {
    let t = theme();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(1)])
        .split(area);

    let hint_text = hints
        .iter()
        .map(|(key, desc)| format!("{}: {}", key, desc))
        .collect::<Vec<_>>()
        .join(" | ");
    frame.render_widget(Paragraph::new(hint_text).style(t.muted_style()), chunks[0]);

    let mut spans = Vec::with_capacity(actions.len() * 3);
    for action in actions {
        spans.push(Span::styled(format!("F{}", action.key()), t.button_key_style()));
        spans.push(Span::styled(action.padded_label(), t.button_style()));
        spans.push(Span::raw(" "));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), chunks[1]);
}
