//! Per-byte statistics over similar packets
//!
//! For the selected packet, every packet of the same class and wire length is
//! compared byte by byte. The statistics are kept in a running
//! [`Accumulator`]: a new similar packet is folded in as it arrives. Only a
//! change of the compared set (another class or length selected, an edit)
//! rebuilds it, on a worker thread; the result comes back through the
//! coordinator inbox and results of an outdated rebuild are dropped.

use std::any::Any;

use anyhow::{anyhow, Context, Result};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Row, Table};

use super::{DetailsView, PacketUpdate, UpdateReason, ViewHandle};
use crate::packet::Packet;
use crate::tui::theme::theme;

/// Statistics of one byte position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ByteStats {
    pub position: usize,
    /// Value in the selected packet
    pub current: u8,
    pub min: u8,
    pub max: u8,
    /// Number of different values seen
    pub distinct: usize,
    /// How often the value differs from the previous packet's
    pub changes: usize,
}

/// What the view shows for the selected packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatisticsReport {
    pub class: String,
    pub length: usize,
    /// Number of packets compared
    pub samples: usize,
    pub bytes: Vec<ByteStats>,
}

/// Running state of one byte position
#[derive(Debug, Clone)]
struct PositionState {
    min: u8,
    max: u8,
    /// Bit set of the values seen
    seen: [u64; 4],
    distinct: usize,
    changes: usize,
    last: Option<u8>,
}

impl PositionState {
    fn new() -> Self {
        Self {
            min: u8::MAX,
            max: u8::MIN,
            seen: [0; 4],
            distinct: 0,
            changes: 0,
            last: None,
        }
    }

    fn push(&mut self, value: u8) {
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        let (word, bit) = (usize::from(value / 64), value % 64);
        if self.seen[word] & (1 << bit) == 0 {
            self.seen[word] |= 1 << bit;
            self.distinct += 1;
        }
        if self.last.is_some_and(|last| last != value) {
            self.changes += 1;
        }
        self.last = Some(value);
    }
}

/// Per-byte statistics over packets pushed in registry order
#[derive(Debug, Clone)]
pub struct Accumulator {
    positions: Vec<PositionState>,
    samples: usize,
}

impl Accumulator {
    pub fn new(length: usize) -> Self {
        Self {
            positions: vec![PositionState::new(); length],
            samples: 0,
        }
    }

    /// Fold in one more packet; bytes past the accumulator length are ignored
    pub fn push(&mut self, bytes: &[u8]) {
        for (state, &value) in self.positions.iter_mut().zip(bytes) {
            state.push(value);
        }
        self.samples += 1;
    }

    pub fn samples(&self) -> usize {
        self.samples
    }

    /// Statistics as seen from `focused`
    pub fn stats(&self, focused: &[u8]) -> Vec<ByteStats> {
        focused
            .iter()
            .zip(&self.positions)
            .enumerate()
            .map(|(position, (&current, state))| ByteStats {
                position,
                current,
                min: state.min.min(current),
                max: state.max.max(current),
                distinct: state.distinct,
                changes: state.changes,
            })
            .collect()
    }
}

/// Per-byte statistics of `samples` (in registry order) against `focused`
pub fn byte_statistics(focused: &[u8], samples: &[Vec<u8>]) -> Vec<ByteStats> {
    let mut accumulator = Accumulator::new(focused.len());
    for sample in samples {
        accumulator.push(sample);
    }
    accumulator.stats(focused)
}

/// Packets compared against each other
#[derive(Debug, Clone, PartialEq, Eq)]
struct SimilarKey {
    class: String,
    length: usize,
}

impl SimilarKey {
    fn of(packet: &Packet) -> Self {
        Self {
            class: packet.class_name().to_string(),
            length: packet.wire_len(),
        }
    }

    fn matches(&self, packet: &Packet) -> bool {
        packet.class_name() == self.class && packet.wire_len() == self.length
    }
}

/// Worker result sent back through the inbox
struct Rebuilt {
    generation: u64,
    /// Registry indices folded into `accumulator`, ascending
    members: Vec<usize>,
    accumulator: Accumulator,
}

#[derive(Debug, Default)]
pub struct StatisticsView {
    /// Bumped for every rebuild and every cleared selection
    generation: u64,
    key: Option<SimilarKey>,
    /// Built bytes of the selected packet
    current: Vec<u8>,
    accumulator: Option<Accumulator>,
    /// Registry indices in `accumulator`, ascending
    members: Vec<usize>,
    /// Similar packets that arrived while a rebuild was running
    backlog: Vec<(usize, Vec<u8>)>,
    report: Option<StatisticsReport>,
    pending: bool,
}

impl StatisticsView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&self) -> Option<&StatisticsReport> {
        self.report.as_ref()
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Recompute the shown report from the accumulator
    fn refresh_report(&mut self) {
        self.report = match (&self.key, &self.accumulator) {
            (Some(key), Some(accumulator)) => Some(StatisticsReport {
                class: key.class.clone(),
                length: key.length,
                samples: accumulator.samples(),
                bytes: accumulator.stats(&self.current),
            }),
            _ => None,
        };
    }

    /// Follow a newly selected (or edited selected) packet
    fn focus(&mut self, packet: &Packet, all: &[Packet], handle: &ViewHandle) -> Result<()> {
        let key = SimilarKey::of(packet);
        self.current = packet.build();
        if self.key.as_ref() == Some(&key) {
            // Same compared set: only the reference bytes move
            if !self.pending {
                self.refresh_report();
            }
            return Ok(());
        }
        self.key = Some(key);
        self.rebuild(all, handle)
    }

    /// Rebuild the accumulator for the current key on a worker
    ///
    /// Only packets of the right class are copied here; building and
    /// comparing them happens on the worker.
    fn rebuild(&mut self, all: &[Packet], handle: &ViewHandle) -> Result<()> {
        let Some(key) = self.key.clone() else {
            return Ok(());
        };
        let candidates: Vec<(usize, Packet)> = all
            .iter()
            .enumerate()
            .filter(|(_, p)| p.class_name() == key.class)
            .map(|(i, p)| (i, p.clone()))
            .collect();

        self.generation += 1;
        self.pending = true;
        self.backlog.clear();

        let generation = self.generation;
        let handle = handle.clone();
        std::thread::Builder::new()
            .name("statistics".to_string())
            .spawn(move || {
                let mut accumulator = Accumulator::new(key.length);
                let mut members = Vec::new();
                for (index, packet) in candidates {
                    let bytes = packet.build();
                    if bytes.len() == key.length {
                        accumulator.push(&bytes);
                        members.push(index);
                    }
                }
                handle.msg_to_main_thread(Rebuilt {
                    generation,
                    members,
                    accumulator,
                });
            })
            .context("Failed to spawn statistics worker")?;
        Ok(())
    }

    /// Fold a newly arrived similar packet in
    fn append(&mut self, index: usize, packet: &Packet) {
        let bytes = packet.build();
        if self.pending {
            self.backlog.push((index, bytes));
            return;
        }
        if let Some(accumulator) = &mut self.accumulator {
            accumulator.push(&bytes);
            self.members.push(index);
            self.refresh_report();
        }
    }

    /// Whether an edit of `index` changes the compared set
    fn affects(&self, index: usize, packet: &Packet) -> bool {
        let Some(key) = &self.key else {
            return false;
        };
        key.matches(packet) || self.members.binary_search(&index).is_ok()
    }
}

impl DetailsView for StatisticsView {
    fn title(&self) -> &str {
        "Statistics"
    }

    fn update_packets(&mut self, update: &PacketUpdate<'_>, handle: &ViewHandle) -> Result<()> {
        match update.reason {
            UpdateReason::SelectionChanged => self.focus(update.packet, update.all, handle),
            UpdateReason::PacketModified if update.is_selected() => {
                self.key = None;
                self.focus(update.packet, update.all, handle)
            }
            UpdateReason::PacketModified => {
                if self.affects(update.index, update.packet) {
                    self.rebuild(update.all, handle)
                } else {
                    Ok(())
                }
            }
            UpdateReason::NewPacket => {
                if self.key.as_ref().is_some_and(|k| k.matches(update.packet)) {
                    self.append(update.index, update.packet);
                }
                Ok(())
            }
        }
    }

    fn selection_cleared(&mut self, _handle: &ViewHandle) -> Result<()> {
        // Any running rebuild is for the old selection
        self.generation += 1;
        self.key = None;
        self.current.clear();
        self.accumulator = None;
        self.members.clear();
        self.backlog.clear();
        self.report = None;
        self.pending = false;
        Ok(())
    }

    fn handle_view_message(&mut self, payload: Box<dyn Any + Send>, _handle: &ViewHandle) -> Result<()> {
        let rebuilt = payload
            .downcast::<Rebuilt>()
            .map_err(|_| anyhow!("unexpected statistics payload"))?;
        if rebuilt.generation != self.generation {
            tracing::trace!(
                "Dropping stale statistics rebuild {} (current {})",
                rebuilt.generation,
                self.generation
            );
            return Ok(());
        }

        let Rebuilt {
            members,
            mut accumulator,
            ..
        } = *rebuilt;
        self.members = members;
        for (index, bytes) in std::mem::take(&mut self.backlog) {
            accumulator.push(&bytes);
            self.members.push(index);
        }
        self.accumulator = Some(accumulator);
        self.pending = false;
        self.refresh_report();
        Ok(())
    }

    fn render(&self, frame: &mut Frame, area: Rect, focused: bool) {
        let t = theme();
        let title = match &self.report {
            Some(r) => format!(
                " Statistics: {} × {} bytes, {} packets{} ",
                r.class,
                r.length,
                r.samples,
                if self.pending { " (updating)" } else { "" }
            ),
            None => " Statistics ".to_string(),
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(t.border_style(focused))
            .title(Span::styled(title, t.header_style()));

        let Some(report) = &self.report else {
            let text = if self.pending { "Computing..." } else { "No packet selected" };
            frame.render_widget(Paragraph::new(text).style(t.muted_style()).block(block), area);
            return;
        };

        let header = Row::new(["POS", "VALUE", "MIN", "MAX", "DISTINCT", "CHANGES"])
            .style(t.header_style());
        let rows = report.bytes.iter().map(|b| {
            let style = if b.distinct > 1 {
                Style::default().fg(t.accent)
            } else {
                t.muted_style()
            };
            Row::new([
                b.position.to_string(),
                format!("{:02x}", b.current),
                format!("{:02x}", b.min),
                format!("{:02x}", b.max),
                b.distinct.to_string(),
                b.changes.to_string(),
            ])
            .style(style)
        });
        let widths = [
            Constraint::Length(5),
            Constraint::Length(6),
            Constraint::Length(5),
            Constraint::Length(5),
            Constraint::Length(9),
            Constraint::Length(8),
        ];
        frame.render_widget(Table::new(rows, widths).header(header).block(block), area);
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::details::ViewId;
    use crate::inbox::{create_inbox, InboxReceiver, Message};
    use crate::packet::{ClassCatalog, FieldValue};

    #[test]
    fn test_byte_statistics() {
        let samples = vec![vec![1, 9], vec![2, 9], vec![1, 9], vec![3, 9]];
        let stats = byte_statistics(&[2, 9], &samples);
        assert_eq!(
            stats[0],
            ByteStats {
                position: 0,
                current: 2,
                min: 1,
                max: 3,
                distinct: 3,
                changes: 3,
            }
        );
        assert_eq!(stats[1].distinct, 1);
        assert_eq!(stats[1].changes, 0);
    }

    #[test]
    fn test_accumulator_matches_batch() {
        let samples = vec![vec![0, 255], vec![64, 255], vec![0, 128]];
        let mut accumulator = Accumulator::new(2);
        for sample in &samples {
            accumulator.push(sample);
        }
        assert_eq!(accumulator.samples(), 3);
        assert_eq!(accumulator.stats(&[64, 255]), byte_statistics(&[64, 255], &samples));
        assert_eq!(accumulator.stats(&[64, 255])[1].distinct, 2);
    }

    fn can(id: u64, data: &[u8]) -> Packet {
        ClassCatalog::builtin()
            .get("CAN")
            .unwrap()
            .instantiate()
            .with_field("identifier", FieldValue::Int(id))
            .unwrap()
            .with_field("data", FieldValue::Bytes(data.to_vec()))
            .unwrap()
    }

    fn update<'a>(
        reason: UpdateReason,
        index: usize,
        selection: Option<usize>,
        all: &'a [Packet],
    ) -> PacketUpdate<'a> {
        PacketUpdate {
            reason,
            index,
            packet: &all[index],
            selection,
            all,
        }
    }

    /// Wait for the worker and hand its result to the view
    async fn deliver_rebuild(view: &mut StatisticsView, rx: &mut InboxReceiver, handle: &ViewHandle) {
        let Some(Message::ViewSpecific { origin, payload }) = rx.recv().await else {
            panic!("expected a statistics rebuild");
        };
        assert_eq!(origin, handle.id());
        view.handle_view_message(payload, handle).unwrap();
    }

    #[tokio::test]
    async fn test_worker_rebuild_round_trip() {
        let (tx, mut rx) = create_inbox(100);
        let handle = ViewHandle::new(ViewId(1), tx);
        let mut view = StatisticsView::new();
        let all = vec![can(1, &[0, 1]), can(2, &[0, 2]), can(3, &[0])];

        view.update_packets(&update(UpdateReason::SelectionChanged, 0, Some(0), &all), &handle)
            .unwrap();
        assert!(view.is_pending());
        deliver_rebuild(&mut view, &mut rx, &handle).await;

        let report = view.report().unwrap();
        assert!(!view.is_pending());
        // The shorter third packet is not compared
        assert_eq!(report.samples, 2);
        assert_eq!(report.class, "CAN");
        assert_eq!(report.bytes.last().unwrap().distinct, 2);
    }

    #[tokio::test]
    async fn test_new_packets_are_folded_in_without_worker() {
        let (tx, mut rx) = create_inbox(100);
        let handle = ViewHandle::new(ViewId(0), tx);
        let mut view = StatisticsView::new();
        let mut all = vec![can(1, &[0, 1])];

        view.update_packets(&update(UpdateReason::SelectionChanged, 0, Some(0), &all), &handle)
            .unwrap();
        deliver_rebuild(&mut view, &mut rx, &handle).await;

        for i in 0..50u8 {
            all.push(can(1, &[0, i]));
            let index = all.len() - 1;
            view.update_packets(&update(UpdateReason::NewPacket, index, Some(0), &all), &handle)
                .unwrap();
        }
        // A different length is not similar
        all.push(can(1, &[0]));
        view.update_packets(&update(UpdateReason::NewPacket, 51, Some(0), &all), &handle)
            .unwrap();

        assert!(!view.is_pending());
        assert!(rx.try_recv().is_none());
        let report = view.report().unwrap();
        assert_eq!(report.samples, 51);
        assert_eq!(report.bytes[1].distinct, 50);
    }

    #[tokio::test]
    async fn test_packets_arriving_during_rebuild_are_kept() {
        let (tx, mut rx) = create_inbox(100);
        let handle = ViewHandle::new(ViewId(0), tx);
        let mut view = StatisticsView::new();
        let all = vec![can(1, &[7]), can(1, &[8]), can(1, &[9])];

        view.update_packets(&update(UpdateReason::SelectionChanged, 0, Some(0), &all[..1]), &handle)
            .unwrap();
        view.update_packets(&update(UpdateReason::NewPacket, 1, Some(0), &all[..2]), &handle)
            .unwrap();
        view.update_packets(&update(UpdateReason::NewPacket, 2, Some(0), &all), &handle)
            .unwrap();
        deliver_rebuild(&mut view, &mut rx, &handle).await;

        let report = view.report().unwrap();
        assert_eq!(report.samples, 3);
        assert_eq!(report.bytes.last().unwrap().changes, 2);
    }

    #[tokio::test]
    async fn test_edit_of_member_rebuilds() {
        let (tx, mut rx) = create_inbox(100);
        let handle = ViewHandle::new(ViewId(0), tx);
        let mut view = StatisticsView::new();
        let mut all = vec![can(1, &[1]), can(1, &[2])];

        view.update_packets(&update(UpdateReason::SelectionChanged, 0, Some(0), &all), &handle)
            .unwrap();
        deliver_rebuild(&mut view, &mut rx, &handle).await;
        assert_eq!(view.report().unwrap().bytes.last().unwrap().max, 2);

        all[1] = can(1, &[5]);
        view.update_packets(&update(UpdateReason::PacketModified, 1, Some(0), &all), &handle)
            .unwrap();
        assert!(view.is_pending());
        deliver_rebuild(&mut view, &mut rx, &handle).await;
        assert_eq!(view.report().unwrap().bytes.last().unwrap().max, 5);
    }

    #[tokio::test]
    async fn test_stale_rebuild_is_dropped() {
        let (tx, mut rx) = create_inbox(100);
        let handle = ViewHandle::new(ViewId(0), tx);
        let mut view = StatisticsView::new();
        let all = vec![can(1, &[1])];

        view.update_packets(&update(UpdateReason::SelectionChanged, 0, Some(0), &all), &handle)
            .unwrap();
        view.selection_cleared(&handle).unwrap();
        deliver_rebuild(&mut view, &mut rx, &handle).await;
        assert!(view.report().is_none());
        assert!(!view.is_pending());
    }

    #[test]
    fn test_unexpected_payload_is_an_error() {
        let (tx, _rx) = create_inbox(100);
        let handle = ViewHandle::new(ViewId(0), tx);
        let mut view = StatisticsView::new();
        assert!(view.handle_view_message(Box::new("nope"), &handle).is_err());
    }
}
