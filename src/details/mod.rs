//! Detail views
//!
//! A detail view is a panel below the packet list that follows the packet
//! stream: it is told about new packets, selection moves and edits, and can
//! talk back to the coordinator through its [`ViewHandle`]. Views never touch
//! the registry directly; every effect they have goes through the inbox.

mod edit_view;
mod statistics_view;

pub use edit_view::EditView;
pub use statistics_view::{ByteStats, StatisticsReport, StatisticsView};

use std::any::Any;
use std::fmt;

use anyhow::Result;
use crossterm::event::KeyEvent;
use ratatui::prelude::{Frame, Rect};

use crate::inbox::{InboxSender, Message};
use crate::packet::Packet;

/// Position of a view in the coordinator's registration list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewId(pub usize);

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "view#{}", self.0)
    }
}

/// Kind of user-facing popup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    /// Acknowledged with OK
    Info,
    /// Answered with Yes or No
    Question,
}

/// Why a view is being updated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateReason {
    NewPacket,
    SelectionChanged,
    PacketModified,
}

/// Update delivered to every detail view
#[derive(Debug, Clone, Copy)]
pub struct PacketUpdate<'a> {
    pub reason: UpdateReason,
    /// Registry index of `packet`
    pub index: usize,
    /// The new, selected or modified packet
    pub packet: &'a Packet,
    /// Registry index of the current selection, if any
    pub selection: Option<usize>,
    /// Every packet in the registry, in index order
    pub all: &'a [Packet],
}

impl PacketUpdate<'_> {
    /// Whether `packet` is the one the list has selected
    pub fn is_selected(&self) -> bool {
        self.selection == Some(self.index)
    }
}

/// A view's channel back to the coordinator
#[derive(Debug, Clone)]
pub struct ViewHandle {
    id: ViewId,
    inbox: InboxSender,
}

impl ViewHandle {
    pub fn new(id: ViewId, inbox: InboxSender) -> Self {
        Self { id, inbox }
    }

    pub fn id(&self) -> ViewId {
        self.id
    }

    /// Show a popup to the user
    pub fn notify(&self, message: impl Into<String>, kind: NotificationKind) {
        self.post(Message::Notification {
            message: message.into(),
            kind,
            origin: Some(self.id),
        });
    }

    /// Report an edited packet; every other view is updated with it
    pub fn packet_modified(&self, index: usize, packet: Packet) {
        self.post(Message::PacketModified {
            index,
            packet,
            origin: self.id,
        });
    }

    /// Deliver `payload` back to this view on the coordination thread
    ///
    /// Safe to call from worker threads (clone the handle first).
    pub fn msg_to_main_thread<T: Any + Send>(&self, payload: T) {
        self.post(Message::ViewSpecific {
            origin: self.id,
            payload: Box::new(payload),
        });
    }

    /// Send a packet through the live socket
    pub fn request_send(&self, packet: Packet) {
        self.post(Message::SendPacket(packet));
    }

    fn post(&self, message: Message) {
        let kind = message.kind();
        if self.inbox.send(message).is_err() {
            tracing::debug!("{}: inbox closed, dropped {}", self.id, kind);
        }
    }
}

/// A pluggable panel following the packet stream
///
/// All methods run on the coordination thread. Returning an error (or
/// panicking) is contained: the coordinator logs it, reports it, and keeps
/// delivering to the remaining views.
pub trait DetailsView: Send {
    /// Label of the button that toggles this view
    fn title(&self) -> &str;

    /// React to a new packet, a selection move or another view's edit
    fn update_packets(&mut self, update: &PacketUpdate<'_>, handle: &ViewHandle) -> Result<()>;

    /// The list no longer has a selection (every row filtered out)
    fn selection_cleared(&mut self, _handle: &ViewHandle) -> Result<()> {
        Ok(())
    }

    /// Receive a payload previously sent with [`ViewHandle::msg_to_main_thread`]
    fn handle_view_message(
        &mut self,
        _payload: Box<dyn Any + Send>,
        _handle: &ViewHandle,
    ) -> Result<()> {
        Ok(())
    }

    /// Answer to a question popup this view raised
    fn question_answered(&mut self, _accepted: bool, _handle: &ViewHandle) -> Result<()> {
        Ok(())
    }

    /// Handle a key while the view has focus; `true` when consumed
    fn handle_key(&mut self, _key: KeyEvent, _handle: &ViewHandle) -> Result<bool> {
        Ok(false)
    }

    /// Key hints shown in the footer while focused
    fn key_hints(&self) -> Vec<(&'static str, &'static str)> {
        Vec::new()
    }

    fn render(&self, frame: &mut Frame, area: Rect, focused: bool);
}
