//! Input line rendering

use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

use crate::app::InputMode;
use crate::tui::theme::theme;

/// Render the prompt and typed text, placing the cursor after it
pub fn render_input_line(frame: &mut Frame, area: Rect, mode: InputMode, buffer: &str) {
    let t = theme();
    let prompt = mode.prompt();
    let line = Line::from(vec![
        Span::styled(prompt, t.input_style().bold()),
        Span::styled(buffer, Style::default().fg(t.text)),
    ]);
    frame.render_widget(Paragraph::new(line), area);

    let typed = prompt.chars().count() + buffer.chars().count();
    let x = area
        .x
        .saturating_add(u16::try_from(typed).unwrap_or(u16::MAX))
        .min(area.right().saturating_sub(1));
    frame.set_cursor(x, area.y);
}
