//! Packet list
//!
//! The list owns the packet registry and renders it through the session's
//! column model. It keeps one formatted row per registry index, the subset of
//! indices that pass the current filter, the selection and the marks.
//!
//! Operations report what changed as [`ListEvent`]s; the coordinator turns
//! selection moves into inbox messages.

use crate::column::{CellContext, ColumnModel};
use crate::filter::Filter;
use crate::packet::{Packet, PacketError, PacketRegistry};

/// A change the list made to itself
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListEvent {
    /// A row was appended for registry `index`
    RowInserted { index: usize },
    /// The row of registry `index` was re-formatted
    RowRefreshed { index: usize },
    /// The selection moved to registry `index`
    SelectionMoved { index: usize },
    /// No visible row is left to select
    SelectionCleared,
}

#[derive(Debug)]
pub struct PacketListView {
    registry: PacketRegistry,
    columns: ColumnModel,
    /// Formatted row per registry index
    rows: Vec<String>,
    /// Registry indices passing the filter, ascending
    visible: Vec<usize>,
    selected: Option<usize>,
    /// Marked registry indices in marking order
    marks: Vec<usize>,
    filter: Option<Filter>,
    /// Time of the first listed packet
    start_time: Option<f64>,
    /// Bumped on every row refresh
    revision: u64,
}

impl PacketListView {
    pub fn new(columns: ColumnModel) -> Self {
        Self {
            registry: PacketRegistry::new(),
            columns,
            rows: Vec::new(),
            visible: Vec::new(),
            selected: None,
            marks: Vec::new(),
            filter: None,
            start_time: None,
            revision: 0,
        }
    }

    /// Append a packet to the registry and list it
    ///
    /// Packets the column model does not support are skipped and `None` is
    /// returned. The first visible packet becomes the selection.
    pub fn add_packet(&mut self, packet: Packet) -> Option<(usize, Vec<ListEvent>)> {
        if !self.columns.supports(&packet) {
            tracing::trace!("Skipping {} packet outside the base class", packet.class_name());
            return None;
        }

        let start_time = *self.start_time.get_or_insert(packet.time());
        let matches = self.filter.as_ref().map_or(true, |f| f.matches(&packet));
        let index = self.registry.append(packet);
        let row = self.format(index, start_time);
        self.rows.push(row);

        let mut events = Vec::new();
        if matches {
            self.visible.push(index);
            events.push(ListEvent::RowInserted { index });
            if self.selected.is_none() {
                self.selected = Some(index);
                events.push(ListEvent::SelectionMoved { index });
            }
        }
        Some((index, events))
    }

    /// Select a registry index
    ///
    /// Returns `None` when the selection does not change.
    pub fn select(&mut self, index: usize) -> Result<Option<ListEvent>, PacketError> {
        self.registry.get(index)?;
        if self.selected == Some(index) {
            return Ok(None);
        }
        self.selected = Some(index);
        Ok(Some(ListEvent::SelectionMoved { index }))
    }

    pub fn select_next(&mut self) -> Option<ListEvent> {
        self.move_by(1)
    }

    pub fn select_prev(&mut self) -> Option<ListEvent> {
        self.move_by(-1)
    }

    pub fn page_down(&mut self, rows: usize) -> Option<ListEvent> {
        self.move_by(isize::try_from(rows).unwrap_or(isize::MAX))
    }

    pub fn page_up(&mut self, rows: usize) -> Option<ListEvent> {
        self.move_by(-isize::try_from(rows).unwrap_or(isize::MAX))
    }

    pub fn select_first(&mut self) -> Option<ListEvent> {
        let first = *self.visible.first()?;
        self.select_visible(first)
    }

    pub fn select_last(&mut self) -> Option<ListEvent> {
        let last = *self.visible.last()?;
        self.select_visible(last)
    }

    fn move_by(&mut self, delta: isize) -> Option<ListEvent> {
        if self.visible.is_empty() {
            return None;
        }
        let target = match self.selected_position() {
            Some(pos) => pos
                .saturating_add_signed(delta)
                .min(self.visible.len() - 1),
            None => 0,
        };
        self.select_visible(self.visible[target])
    }

    fn select_visible(&mut self, index: usize) -> Option<ListEvent> {
        if self.selected == Some(index) {
            return None;
        }
        self.selected = Some(index);
        Some(ListEvent::SelectionMoved { index })
    }

    /// Replace an edited packet, refresh its row and re-apply the filter to it
    ///
    /// A selected row that stops matching hands the selection to the row
    /// that takes its place.
    pub fn replace_packet(&mut self, index: usize, packet: Packet) -> Result<Vec<ListEvent>, PacketError> {
        let matches = self.filter.as_ref().map_or(true, |f| f.matches(&packet));
        self.registry.replace(index, packet)?;
        let mut events = vec![self.refresh_row(index)?];

        match (self.visible.binary_search(&index), matches) {
            (Err(pos), true) => {
                self.visible.insert(pos, index);
                if self.selected.is_none() {
                    events.extend(self.select_visible(index));
                }
            }
            (Ok(pos), false) => {
                self.visible.remove(pos);
                if self.selected == Some(index) {
                    let next = pos.min(self.visible.len().saturating_sub(1));
                    events.extend(self.reselect(next));
                }
            }
            _ => {}
        }
        Ok(events)
    }

    /// Select the visible row at `position`, clearing the selection when
    /// there is none
    fn reselect(&mut self, position: usize) -> Option<ListEvent> {
        match self.visible.get(position) {
            Some(&index) => self.select_visible(index),
            None => self.selected.take().map(|_| ListEvent::SelectionCleared),
        }
    }

    /// Re-format the selected row after its packet changed
    pub fn update_selected_packet(&mut self) -> Option<ListEvent> {
        let index = self.selected?;
        self.refresh_row(index).ok()
    }

    /// Re-format one row from the registry
    pub fn refresh_row(&mut self, index: usize) -> Result<ListEvent, PacketError> {
        self.registry.get(index)?;
        let start_time = self.start_time.unwrap_or_default();
        let row = self.format(index, start_time);
        self.rows[index] = row;
        self.revision += 1;
        tracing::trace!("Refreshed row {} (revision {})", index, self.revision);
        Ok(ListEvent::RowRefreshed { index })
    }

    fn format(&self, index: usize, start_time: f64) -> String {
        match self.registry.get(index) {
            Ok(packet) => self.columns.format_row(&CellContext {
                index,
                packet,
                start_time,
            }),
            Err(_) => String::new(),
        }
    }

    /// Toggle the mark on the selected packet; returns whether it is now marked
    pub fn toggle_mark(&mut self) -> Option<bool> {
        let index = self.selected?;
        if let Some(pos) = self.marks.iter().position(|&m| m == index) {
            self.marks.remove(pos);
            Some(false)
        } else {
            self.marks.push(index);
            Some(true)
        }
    }

    pub fn is_marked(&self, index: usize) -> bool {
        self.marks.contains(&index)
    }

    /// Marked registry indices in marking order
    pub fn marks(&self) -> &[usize] {
        &self.marks
    }

    /// Marked packets in marking order
    pub fn marked_packets(&self) -> Vec<Packet> {
        self.marks
            .iter()
            .filter_map(|&i| self.registry.get(i).ok())
            .cloned()
            .collect()
    }

    /// Apply (or clear) the filter and recompute the visible rows
    ///
    /// When the selection is filtered out it moves to the first visible row,
    /// or is cleared when no row is left.
    pub fn set_filter(&mut self, filter: Option<Filter>) -> Option<ListEvent> {
        self.visible = self
            .registry
            .iter()
            .enumerate()
            .filter(|(_, p)| filter.as_ref().map_or(true, |f| f.matches(p)))
            .map(|(i, _)| i)
            .collect();
        tracing::debug!(
            "Filter {:?}: {} of {} rows visible",
            filter.as_ref().map(Filter::source),
            self.visible.len(),
            self.registry.len()
        );
        self.filter = filter;

        match self.selected {
            Some(index) if self.visible.binary_search(&index).is_ok() => None,
            _ => self.reselect(0),
        }
    }

    pub fn filter(&self) -> Option<&Filter> {
        self.filter.as_ref()
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn selected_packet(&self) -> Option<&Packet> {
        self.selected.and_then(|i| self.registry.get(i).ok())
    }

    /// Position of the selection among the visible rows
    pub fn selected_position(&self) -> Option<usize> {
        let index = self.selected?;
        self.visible.binary_search(&index).ok()
    }

    /// Visible rows as `(registry index, row text)`
    pub fn visible_rows(&self) -> impl Iterator<Item = (usize, &str)> {
        self.visible.iter().map(|&i| (i, self.rows[i].as_str()))
    }

    pub fn visible_len(&self) -> usize {
        self.visible.len()
    }

    pub fn row(&self, index: usize) -> Option<&str> {
        self.rows.get(index).map(String::as_str)
    }

    pub fn header(&self) -> String {
        self.columns.header()
    }

    pub fn columns(&self) -> &ColumnModel {
        &self.columns
    }

    pub fn registry(&self) -> &PacketRegistry {
        &self.registry
    }

    pub fn packets(&self) -> &[Packet] {
        self.registry.as_slice()
    }

    /// Number of row refreshes so far
    pub fn revision(&self) -> u64 {
        self.revision
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::ColumnConfig;
    use crate::packet::{ClassCatalog, FieldValue};

    fn udp(sport: u64) -> Packet {
        ClassCatalog::builtin()
            .get("UDP")
            .unwrap()
            .instantiate()
            .with_field("sport", FieldValue::Int(sport))
            .unwrap()
    }

    fn udp_list() -> PacketListView {
        let basecls = ClassCatalog::builtin().get("UDP");
        PacketListView::new(ColumnModel::resolve(basecls, None, &ColumnConfig::empty()))
    }

    #[test]
    fn test_add_packet_selects_first() {
        let mut list = udp_list();
        let (index, events) = list.add_packet(udp(1)).unwrap();
        assert_eq!(index, 0);
        assert_eq!(
            events,
            vec![
                ListEvent::RowInserted { index: 0 },
                ListEvent::SelectionMoved { index: 0 }
            ]
        );

        let (index, events) = list.add_packet(udp(2)).unwrap();
        assert_eq!(index, 1);
        assert_eq!(events, vec![ListEvent::RowInserted { index: 1 }]);
        assert_eq!(list.selected(), Some(0));
        assert_eq!(list.packets().len(), 2);
    }

    #[test]
    fn test_add_packet_skips_other_classes() {
        let mut list = udp_list();
        let raw = ClassCatalog::builtin().get("Raw").unwrap().instantiate();
        assert!(list.add_packet(raw).is_none());
        assert!(list.registry().is_empty());
    }

    #[test]
    fn test_navigation() {
        let mut list = udp_list();
        for i in 0..5 {
            list.add_packet(udp(i));
        }
        assert_eq!(list.select_prev(), None);
        assert_eq!(list.select_next(), Some(ListEvent::SelectionMoved { index: 1 }));
        assert_eq!(list.page_down(10), Some(ListEvent::SelectionMoved { index: 4 }));
        assert_eq!(list.select_next(), None);
        assert_eq!(list.page_up(2), Some(ListEvent::SelectionMoved { index: 2 }));
        assert_eq!(list.select_first(), Some(ListEvent::SelectionMoved { index: 0 }));
        assert_eq!(list.select_last(), Some(ListEvent::SelectionMoved { index: 4 }));
    }

    #[test]
    fn test_select_out_of_range() {
        let mut list = udp_list();
        list.add_packet(udp(1));
        assert!(matches!(
            list.select(3),
            Err(PacketError::IndexOutOfRange { .. })
        ));
        assert_eq!(list.select(0).unwrap(), None);
        assert_eq!(list.selected(), Some(0));
    }

    #[test]
    fn test_replace_refreshes_row_once() {
        let mut list = udp_list();
        list.add_packet(udp(1));
        let before = list.row(0).unwrap().to_string();

        let events = list.replace_packet(0, udp(4242)).unwrap();
        assert_eq!(events, vec![ListEvent::RowRefreshed { index: 0 }]);
        assert_eq!(list.revision(), 1);
        assert_ne!(list.row(0).unwrap(), before);
        assert!(list.row(0).unwrap().contains("4242"));
        assert!(list.replace_packet(9, udp(1)).is_err());
        assert_eq!(list.revision(), 1);
    }

    #[test]
    fn test_marks_keep_marking_order() {
        let mut list = udp_list();
        for i in 0..3 {
            list.add_packet(udp(i));
        }
        list.select(2).unwrap();
        assert_eq!(list.toggle_mark(), Some(true));
        list.select(0).unwrap();
        assert_eq!(list.toggle_mark(), Some(true));
        list.select(1).unwrap();
        list.toggle_mark();
        assert_eq!(list.toggle_mark(), Some(false));

        assert_eq!(list.marks(), &[2, 0]);
        let marked = list.marked_packets();
        assert_eq!(marked[0].field("sport").unwrap().as_int(), Some(2));
        assert_eq!(marked[1].field("sport").unwrap().as_int(), Some(0));
    }

    #[test]
    fn test_filter_hides_rows_without_touching_registry() {
        let mut list = udp_list();
        for i in 0..4 {
            list.add_packet(udp(i));
        }
        list.select(1).unwrap();

        let event = list.set_filter(Some(Filter::parse("sport >= 2").unwrap()));
        assert_eq!(event, Some(ListEvent::SelectionMoved { index: 2 }));
        assert_eq!(list.visible_len(), 2);
        assert_eq!(list.packets().len(), 4);

        // New packets are filtered as they arrive
        let (_, events) = list.add_packet(udp(0)).unwrap();
        assert!(events.is_empty());
        assert_eq!(list.visible_len(), 2);

        list.set_filter(None);
        assert_eq!(list.visible_len(), 5);
        assert_eq!(list.selected(), Some(2));
    }

    #[test]
    fn test_failing_filter_excludes_packet() {
        let mut list = udp_list();
        list.add_packet(udp(1));
        assert_eq!(
            list.set_filter(Some(Filter::parse("nosuchfield == 1").unwrap())),
            Some(ListEvent::SelectionCleared)
        );
        assert_eq!(list.visible_len(), 0);
        assert_eq!(list.selected(), None);
        assert_eq!(list.select_next(), None);
    }

    #[test]
    fn test_relative_time_column() {
        let mut list = udp_list();
        list.add_packet(udp(1).with_time(100.0));
        list.add_packet(udp(2).with_time(101.5));
        assert!(list.row(1).unwrap().contains("1.500000"));
    }

    #[test]
    fn test_edit_reapplies_filter() {
        let mut list = udp_list();
        for i in 0..4 {
            list.add_packet(udp(i));
        }
        list.set_filter(Some(Filter::parse("sport < 10").unwrap()));
        list.select(1).unwrap();

        // The selected row leaves the match set; its successor takes over
        let events = list.replace_packet(1, udp(50)).unwrap();
        assert_eq!(
            events,
            vec![
                ListEvent::RowRefreshed { index: 1 },
                ListEvent::SelectionMoved { index: 2 }
            ]
        );
        let visible: Vec<usize> = list.visible_rows().map(|(i, _)| i).collect();
        assert_eq!(visible, vec![0, 2, 3]);

        // And comes back in registry order once it matches again
        let events = list.replace_packet(1, udp(5)).unwrap();
        assert_eq!(events, vec![ListEvent::RowRefreshed { index: 1 }]);
        let visible: Vec<usize> = list.visible_rows().map(|(i, _)| i).collect();
        assert_eq!(visible, vec![0, 1, 2, 3]);
        assert_eq!(list.selected(), Some(2));
    }

    #[test]
    fn test_edit_of_last_match_clears_selection() {
        let mut list = udp_list();
        list.add_packet(udp(1));
        list.add_packet(udp(20));
        list.set_filter(Some(Filter::parse("sport < 10").unwrap()));
        assert_eq!(list.selected(), Some(0));

        let events = list.replace_packet(0, udp(30)).unwrap();
        assert_eq!(events.last(), Some(&ListEvent::SelectionCleared));
        assert_eq!(list.visible_len(), 0);
        assert_eq!(list.selected(), None);

        // The first row to match again is selected
        let events = list.replace_packet(1, udp(2)).unwrap();
        assert_eq!(events.last(), Some(&ListEvent::SelectionMoved { index: 1 }));
    }
}
