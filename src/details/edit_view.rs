//! Field editor for the selected packet
//!
//! Lists the fields of the selected packet one per line next to a hexdump of
//! its wire bytes. Enter edits the field under the cursor; the edit is
//! applied to a copy first so a rejected value never reaches the registry.

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};

use super::{DetailsView, NotificationKind, PacketUpdate, UpdateReason, ViewHandle};
use crate::packet::literal::{strip_bytes_quotes, strip_quotes, unescape};
use crate::packet::{hexdump, parse_field_value, Packet, PacketError};
use crate::tui::theme::theme;
use crate::tui::widgets::selection::{selection_prefix, selection_style_with_accent};

/// Width of a hexdump line
const HEXDUMP_WIDTH: u16 = 71;

/// Name of the pseudo row that edits the bytes after the declared fields
const PAYLOAD_ROW: &str = "payload";

#[derive(Debug, Default)]
pub struct EditView {
    /// Registry index and working copy of the shown packet
    current: Option<(usize, Packet)>,
    /// Row under the cursor
    cursor: usize,
    /// Text being typed while a field is edited
    editing: Option<String>,
}

impl EditView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry index and contents of the packet being shown
    pub fn current(&self) -> Option<(usize, &Packet)> {
        self.current.as_ref().map(|(i, p)| (*i, p))
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_editing(&self) -> bool {
        self.editing.is_some()
    }

    /// Editable row names: declared fields, then the payload
    fn rows(&self) -> Vec<String> {
        let Some((_, packet)) = &self.current else {
            return Vec::new();
        };
        packet
            .fields()
            .map(|(decl, _)| decl.name.clone())
            .chain(std::iter::once(PAYLOAD_ROW.to_string()))
            .collect()
    }

    /// Current value of a row as editable text
    fn row_text(packet: &Packet, row: &str) -> String {
        match packet.field(row) {
            Ok(value) => value.repr(),
            Err(_) => format!("b\"{}\"", packet.payload_repr()),
        }
    }

    /// Apply `text` to `field` of the shown packet
    ///
    /// On success the packet is replaced and `packet_modified` is emitted; an
    /// invalid value raises an info notification and changes nothing.
    /// Returns whether the edit was applied.
    pub fn commit_field(&mut self, field: &str, text: &str, handle: &ViewHandle) -> bool {
        let Some((index, packet)) = &self.current else {
            return false;
        };

        match Self::edited_copy(packet, field, text) {
            Ok(edited) => {
                tracing::debug!(index, field, "Field edited");
                let index = *index;
                self.current = Some((index, edited.clone()));
                handle.packet_modified(index, edited);
                true
            }
            Err(e) => {
                tracing::debug!(field, "Edit rejected: {}", e);
                handle.notify(format!("Invalid value.\n{}", e), NotificationKind::Info);
                false
            }
        }
    }

    fn edited_copy(packet: &Packet, field: &str, text: &str) -> Result<Packet, PacketError> {
        let mut edited = packet.clone();
        if field.eq_ignore_ascii_case(PAYLOAD_ROW) && packet.field_decl(field).is_err() {
            let text = text.trim();
            let body = strip_bytes_quotes(text)
                .or_else(|| strip_quotes(text))
                .unwrap_or(text);
            let bytes = unescape(body).map_err(|reason| PacketError::InvalidValue {
                field: PAYLOAD_ROW.to_string(),
                reason,
            })?;
            edited.set_payload(bytes);
        } else {
            let decl = packet.field_decl(field)?;
            let value = parse_field_value(decl, text)?;
            edited.set_field(field, value)?;
        }
        Ok(edited)
    }

    fn show(&mut self, index: usize, packet: &Packet) {
        let class_changed = self
            .current
            .as_ref()
            .map_or(true, |(_, p)| p.class_name() != packet.class_name());
        if class_changed {
            self.cursor = 0;
        }
        self.editing = None;
        self.current = Some((index, packet.clone()));
    }

    fn move_cursor(&mut self, delta: isize) {
        let count = self.rows().len();
        if count == 0 {
            return;
        }
        self.cursor = (self.cursor as isize + delta).clamp(0, count as isize - 1) as usize;
    }
}

impl DetailsView for EditView {
    fn title(&self) -> &str {
        "Edit"
    }

    fn update_packets(&mut self, update: &PacketUpdate<'_>, _handle: &ViewHandle) -> Result<()> {
        let shown = self.current.as_ref().map(|(i, _)| *i);
        match update.reason {
            UpdateReason::SelectionChanged => self.show(update.index, update.packet),
            UpdateReason::NewPacket if shown.is_none() && update.is_selected() => {
                self.show(update.index, update.packet)
            }
            UpdateReason::PacketModified if shown == Some(update.index) => {
                let editing = self.editing.take();
                self.show(update.index, update.packet);
                self.editing = editing;
            }
            _ => {}
        }
        Ok(())
    }

    fn selection_cleared(&mut self, _handle: &ViewHandle) -> Result<()> {
        self.current = None;
        self.editing = None;
        self.cursor = 0;
        Ok(())
    }

    fn handle_key(&mut self, key: KeyEvent, handle: &ViewHandle) -> Result<bool> {
        if key.kind != KeyEventKind::Press || self.current.is_none() {
            return Ok(false);
        }

        if let Some(buffer) = self.editing.as_mut() {
            match key.code {
                KeyCode::Esc => self.editing = None,
                KeyCode::Enter => {
                    let text = self.editing.take().unwrap_or_default();
                    if let Some(field) = self.rows().get(self.cursor).cloned() {
                        self.commit_field(&field, &text, handle);
                    }
                }
                KeyCode::Backspace => {
                    buffer.pop();
                }
                KeyCode::Char(c) => buffer.push(c),
                _ => {}
            }
            return Ok(true);
        }

        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.move_cursor(-1),
            KeyCode::Down | KeyCode::Char('j') => self.move_cursor(1),
            KeyCode::Enter | KeyCode::Char('e') => {
                if let (Some((_, packet)), Some(row)) =
                    (&self.current, self.rows().get(self.cursor))
                {
                    self.editing = Some(Self::row_text(packet, row));
                }
            }
            KeyCode::Char('s') => {
                if let Some((_, packet)) = &self.current {
                    handle.request_send(packet.clone());
                }
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn key_hints(&self) -> Vec<(&'static str, &'static str)> {
        if self.editing.is_some() {
            vec![("Enter", "apply"), ("Esc", "cancel")]
        } else {
            vec![("↑↓", "field"), ("Enter", "edit"), ("s", "send"), ("Esc", "list")]
        }
    }

    fn render(&self, frame: &mut Frame, area: Rect, focused: bool) {
        let t = theme();
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(t.border_style(focused))
            .title(Span::styled(" Edit ", t.header_style()));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let Some((_, packet)) = &self.current else {
            frame.render_widget(
                Paragraph::new("No packet selected").style(t.muted_style()),
                inner,
            );
            return;
        };

        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Min(20),
                Constraint::Length(2),
                Constraint::Length(HEXDUMP_WIDTH),
            ])
            .split(inner);

        let rows = self.rows();
        let width = rows.iter().map(String::len).max().unwrap_or(0);
        let items: Vec<ListItem> = rows
            .iter()
            .enumerate()
            .map(|(i, row)| {
                let selected = focused && i == self.cursor;
                let value = match (&self.editing, selected) {
                    (Some(buffer), true) => format!("{}█", buffer),
                    _ => Self::row_text(packet, row),
                };
                let style = if selected && self.editing.is_some() {
                    t.input_style()
                } else {
                    selection_style_with_accent(selected, t)
                };
                ListItem::new(Line::from(vec![
                    Span::raw(selection_prefix(selected)),
                    Span::styled(format!("{:<width$} = ", row), t.muted_style()),
                    Span::styled(value, style),
                ]))
            })
            .collect();

        let mut state = ListState::default().with_selected(Some(self.cursor));
        frame.render_stateful_widget(
            List::new(items).block(
                Block::default().title(Span::styled(packet.class_name(), t.header_style())),
            ),
            chunks[0],
            &mut state,
        );

        let dump: Vec<Line> = hexdump(&packet.build()).into_iter().map(Line::from).collect();
        frame.render_widget(Paragraph::new(dump).style(Style::default().fg(t.text)), chunks[2]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::details::ViewId;
    use crate::inbox::{create_inbox, InboxReceiver, Message};
    use crate::packet::{ClassCatalog, FieldValue};
    use crossterm::event::KeyModifiers;

    fn udp() -> Packet {
        ClassCatalog::builtin()
            .get("UDP")
            .unwrap()
            .instantiate()
            .with_field("sport", FieldValue::Int(1234))
            .unwrap()
    }

    fn shown(view: &mut EditView, handle: &ViewHandle, packet: &Packet) {
        let all = vec![packet.clone()];
        view.update_packets(
            &PacketUpdate {
                reason: UpdateReason::SelectionChanged,
                index: 0,
                packet,
                selection: Some(0),
                all: &all,
            },
            handle,
        )
        .unwrap();
    }

    fn setup() -> (EditView, ViewHandle, InboxReceiver) {
        let (tx, rx) = create_inbox(100);
        let handle = ViewHandle::new(ViewId(0), tx);
        let mut view = EditView::new();
        shown(&mut view, &handle, &udp());
        (view, handle, rx)
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_commit_valid_value() {
        let (mut view, handle, mut rx) = setup();
        assert!(view.commit_field("dport", "0x35", &handle));
        assert_eq!(
            view.current().unwrap().1.field("dport").unwrap().as_int(),
            Some(53)
        );
        match rx.try_recv() {
            Some(Message::PacketModified { index, packet, .. }) => {
                assert_eq!(index, 0);
                assert_eq!(packet.field("dport").unwrap().as_int(), Some(53));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_invalid_value_notifies_and_keeps_packet() {
        let (mut view, handle, mut rx) = setup();
        assert!(!view.commit_field("sport", "\"abc\"", &handle));
        assert_eq!(view.current().unwrap().1, &udp());
        match rx.try_recv() {
            Some(Message::Notification { message, kind, .. }) => {
                assert_eq!(kind, NotificationKind::Info);
                assert!(message.starts_with("Invalid value."));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(rx.try_recv().is_none());
    }

    #[test]
    fn test_payload_row() {
        let (mut view, handle, _rx) = setup();
        assert!(view.commit_field("payload", "b\"\\x01\\x02\"", &handle));
        assert_eq!(view.current().unwrap().1.payload(), &[1, 2]);
    }

    #[test]
    fn test_edit_with_keys() {
        let (mut view, handle, mut rx) = setup();
        // Cursor on dport, open the editor with its current value
        assert!(view.handle_key(key(KeyCode::Down), &handle).unwrap());
        assert!(view.handle_key(key(KeyCode::Enter), &handle).unwrap());
        assert!(view.is_editing());
        // Replace "0" with "80"
        view.handle_key(key(KeyCode::Backspace), &handle).unwrap();
        view.handle_key(key(KeyCode::Char('8')), &handle).unwrap();
        view.handle_key(key(KeyCode::Char('0')), &handle).unwrap();
        view.handle_key(key(KeyCode::Enter), &handle).unwrap();

        assert!(!view.is_editing());
        assert_eq!(
            view.current().unwrap().1.field("dport").unwrap().as_int(),
            Some(80)
        );
        assert!(matches!(rx.try_recv(), Some(Message::PacketModified { .. })));
    }

    #[test]
    fn test_escape_cancels_then_releases_focus() {
        let (mut view, handle, mut rx) = setup();
        view.handle_key(key(KeyCode::Enter), &handle).unwrap();
        view.handle_key(key(KeyCode::Char('9')), &handle).unwrap();
        assert!(view.handle_key(key(KeyCode::Esc), &handle).unwrap());
        assert!(!view.is_editing());
        assert!(rx.try_recv().is_none());
        // Not editing: Esc is left to the coordinator
        assert!(!view.handle_key(key(KeyCode::Esc), &handle).unwrap());
    }

    #[test]
    fn test_send_key_requests_send() {
        let (mut view, handle, mut rx) = setup();
        view.handle_key(key(KeyCode::Char('s')), &handle).unwrap();
        assert!(matches!(rx.try_recv(), Some(Message::SendPacket(_))));
    }

    #[test]
    fn test_ignores_other_views_edits_of_other_packets() {
        let (mut view, handle, _rx) = setup();
        let other = udp().with_field("sport", FieldValue::Int(1)).unwrap();
        let all = vec![udp(), other.clone()];
        view.update_packets(
            &PacketUpdate {
                reason: UpdateReason::PacketModified,
                index: 1,
                packet: &other,
                selection: Some(0),
                all: &all,
            },
            &handle,
        )
        .unwrap();
        assert_eq!(view.current().unwrap().0, 0);
        assert_eq!(view.current().unwrap().1, &udp());
    }

    #[test]
    fn test_cleared_selection_empties_view() {
        let (mut view, handle, _rx) = setup();
        assert!(view.current().is_some());
        view.selection_cleared(&handle).unwrap();
        assert!(view.current().is_none());
        assert!(!view.is_editing());
        assert!(!view.handle_key(key(KeyCode::Enter), &handle).unwrap());
    }
}
