//! Popup rendering
//!
//! The oldest queued popup is drawn centered over everything else. Questions
//! show Yes/No buttons with the current choice highlighted.

use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

use super::centered_rect;
use crate::tui::notifications::Notification;
use crate::tui::theme::theme;

/// Maximum popup width
const POPUP_WIDTH: u16 = 60;

/// Render a popup; `queued` counts every pending popup including this one
pub fn render_popup(
    frame: &mut Frame,
    area: Rect,
    notification: &Notification,
    selected_yes: bool,
    queued: usize,
) {
    let t = theme();
    let color = if notification.is_question() {
        t.popup_question
    } else {
        t.popup_info
    };

    let mut lines: Vec<Line> = vec![Line::from("")];
    lines.extend(
        notification
            .message
            .lines()
            .map(|line| Line::from(Span::styled(line.to_string(), Style::default().fg(t.text)))),
    );
    lines.push(Line::from(""));

    if notification.is_question() {
        let button = |label: &'static str, active: bool| {
            let style = if active {
                Style::default().fg(t.selected_fg).bg(color).bold()
            } else {
                Style::default().fg(t.text)
            };
            Span::styled(format!("[ {} ]", label), style)
        };
        lines.push(Line::from(vec![
            button("Yes", selected_yes),
            Span::raw("   "),
            button("No", !selected_yes),
        ]));
        lines.push(Line::from(Span::styled("y/n, Tab to switch, Enter to confirm", t.muted_style())));
    } else {
        lines.push(Line::from(Span::styled("Press Enter to continue", t.muted_style())));
    }

    let title = if queued > 1 {
        format!(" {} (1/{}) ", notification.title(), queued)
    } else {
        format!(" {} ", notification.title())
    };

    // Wrapped message lines plus borders
    let inner_width = usize::from(POPUP_WIDTH.saturating_sub(4)).max(1);
    let wrapped: usize = notification
        .message
        .lines()
        .map(|l| (l.chars().count().max(1) + inner_width - 1) / inner_width)
        .sum();
    let height = u16::try_from(wrapped + 6).unwrap_or(u16::MAX);
    let popup_area = centered_rect(area, POPUP_WIDTH, height);

    frame.render_widget(Clear, popup_area);
    let paragraph = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(color))
                .title(Span::styled(title, Style::default().fg(color).bold())),
        );
    frame.render_widget(paragraph, popup_area);
}
