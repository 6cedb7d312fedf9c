//! Coordinator inbox
//!
//! Every cross-thread interaction reaches the coordinator as a [`Message`]
//! pushed into a single FIFO channel. Producers (capture thread, terminal
//! input pump, detail-view workers, the list view itself) only hold an
//! [`InboxSender`]; the coordinator is the sole consumer.

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crossterm::event::Event;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::capture::CaptureError;
use crate::details::{NotificationKind, ViewId};
use crate::packet::Packet;

/// Opaque payload a detail view sends to itself through the coordinator
pub type ViewPayload = Box<dyn Any + Send>;

/// Messages consumed by the coordinator, in arrival order
pub enum Message {
    /// A packet arrived from the capture source
    NewPacket(Packet),
    /// The list selection moved to this registry index
    SelectionChanged(usize),
    /// Every row was filtered out; nothing is selected
    SelectionCleared,
    /// A view edited the packet at `index`
    PacketModified {
        index: usize,
        packet: Packet,
        origin: ViewId,
    },
    /// Forwarded untouched to `origin`
    ViewSpecific { origin: ViewId, payload: ViewPayload },
    /// User-facing popup request
    Notification {
        message: String,
        kind: NotificationKind,
        origin: Option<ViewId>,
    },
    /// Send a packet through the live socket
    SendPacket(Packet),
    /// The capture source failed; fatal
    CaptureFailed(CaptureError),
    /// The capture source reached its end
    CaptureFinished,
    /// Terminal input from the input pump
    Terminal(Event),
    /// Leave the event loop
    Quit,
    /// Sentinel that only interrupts the blocking wait
    Wake,
}

impl Message {
    /// Short variant name for logging
    pub fn kind(&self) -> &'static str {
        match self {
            Message::NewPacket(_) => "NewPacket",
            Message::SelectionChanged(_) => "SelectionChanged",
            Message::SelectionCleared => "SelectionCleared",
            Message::PacketModified { .. } => "PacketModified",
            Message::ViewSpecific { .. } => "ViewSpecific",
            Message::Notification { .. } => "Notification",
            Message::SendPacket(_) => "SendPacket",
            Message::CaptureFailed(_) => "CaptureFailed",
            Message::CaptureFinished => "CaptureFinished",
            Message::Terminal(_) => "Terminal",
            Message::Quit => "Quit",
            Message::Wake => "Wake",
        }
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Message::NewPacket(p) => f.debug_tuple("NewPacket").field(&p.repr()).finish(),
            Message::SelectionChanged(i) => f.debug_tuple("SelectionChanged").field(i).finish(),
            Message::PacketModified { index, origin, .. } => f
                .debug_struct("PacketModified")
                .field("index", index)
                .field("origin", origin)
                .finish_non_exhaustive(),
            Message::ViewSpecific { origin, .. } => f
                .debug_struct("ViewSpecific")
                .field("origin", origin)
                .finish_non_exhaustive(),
            Message::Notification {
                message,
                kind,
                origin,
            } => f
                .debug_struct("Notification")
                .field("message", message)
                .field("kind", kind)
                .field("origin", origin)
                .finish(),
            Message::SendPacket(p) => f.debug_tuple("SendPacket").field(&p.repr()).finish(),
            Message::CaptureFailed(e) => f.debug_tuple("CaptureFailed").field(e).finish(),
            Message::Terminal(e) => f.debug_tuple("Terminal").field(e).finish(),
            other => f.write_str(other.kind()),
        }
    }
}

/// The coordinator stopped consuming messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("coordinator inbox is closed")]
pub struct InboxClosed;

/// Producer half of the inbox; cheap to clone into any thread
#[derive(Clone)]
pub struct InboxSender {
    tx: mpsc::UnboundedSender<Message>,
    depth: Arc<AtomicUsize>,
}

impl InboxSender {
    /// Enqueue a message
    pub fn send(&self, message: Message) -> Result<(), InboxClosed> {
        self.depth.fetch_add(1, Ordering::SeqCst);
        self.tx.send(message).map_err(|_| {
            self.depth.fetch_sub(1, Ordering::SeqCst);
            InboxClosed
        })
    }

    /// Interrupt the coordinator's blocking wait
    pub fn wake(&self) {
        let _ = self.send(Message::Wake);
    }

    /// Ask the coordinator to exit
    pub fn quit(&self) -> Result<(), InboxClosed> {
        self.send(Message::Quit)
    }

    /// Messages sent but not yet received
    pub fn depth(&self) -> usize {
        self.depth.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl fmt::Debug for InboxSender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InboxSender")
            .field("depth", &self.depth())
            .finish()
    }
}

/// Consumer half of the inbox, owned by the coordinator
pub struct InboxReceiver {
    rx: mpsc::UnboundedReceiver<Message>,
    depth: Arc<AtomicUsize>,
    warn_depth: usize,
    warned: bool,
}

impl InboxReceiver {
    /// Wait for the next message; `None` once every sender is gone
    pub async fn recv(&mut self) -> Option<Message> {
        let message = self.rx.recv().await;
        self.received(message)
    }

    /// Next message if one is already queued
    pub fn try_recv(&mut self) -> Option<Message> {
        let message = self.rx.try_recv().ok();
        self.received(message)
    }

    pub fn depth(&self) -> usize {
        self.depth.load(Ordering::SeqCst)
    }

    fn received(&mut self, message: Option<Message>) -> Option<Message> {
        if message.is_some() {
            let before = self.depth.fetch_sub(1, Ordering::SeqCst);
            if before > self.warn_depth && !self.warned {
                tracing::warn!(
                    "Inbox backlog of {} messages exceeds {}",
                    before,
                    self.warn_depth
                );
                self.warned = true;
            } else if before <= self.warn_depth / 2 {
                self.warned = false;
            }
        }
        message
    }
}

/// Create the coordinator inbox
///
/// `warn_depth` is the backlog above which a warning is logged; the channel
/// itself is unbounded so producers never block.
pub fn create_inbox(warn_depth: usize) -> (InboxSender, InboxReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    let depth = Arc::new(AtomicUsize::new(0));
    (
        InboxSender {
            tx,
            depth: Arc::clone(&depth),
        },
        InboxReceiver {
            rx,
            depth,
            warn_depth,
            warned: false,
        },
    )
}
