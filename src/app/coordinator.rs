//! Coordinator
//!
//! Owns the packet list, the details views and the UI state, and applies
//! every inbox message on a single thread. It knows nothing about the
//! terminal: [`App`](super::App) feeds it terminal input as messages and
//! renders its state, tests drive it directly.
//!
//! Life cycle: `Idle` until [`Coordinator::start`], `Running` while messages
//! are processed, `Exiting` once quit was requested or a fatal error hit.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use crossterm::event::KeyCode;
use ratatui::layout::Rect;
use ratatui::Frame;

use super::actions::{build_actions, Action, Command};
use super::input_mode::InputMode;
use super::packet_list::{ListEvent, PacketListView};
use super::state::UiState;
use super::view::DetailsVisibility;
use crate::capture::{spawn_capture, CaptureError, CaptureHandle, PacketSource};
use crate::column::{Column, ColumnConfig, ColumnModel};
use crate::craft::CraftContext;
use crate::details::{DetailsView, NotificationKind, PacketUpdate, UpdateReason, ViewHandle, ViewId};
use crate::filter::Filter;
use crate::inbox::{create_inbox, InboxReceiver, InboxSender, Message};
use crate::packet::{Packet, PacketClass};
use crate::tui::notifications::{NotificationManager, NotificationSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Running,
    Exiting,
}

/// Result of a viewer session
#[derive(Debug, Clone, PartialEq)]
pub struct ViewerOutput {
    /// Marked packets in marking order
    pub selected: Vec<Packet>,
    /// Every packet in the registry, in final edited state
    pub all: Vec<Packet>,
}

/// Session settings
pub struct ViewerOptions {
    /// Only packets of this class are listed
    pub basecls: Option<Arc<PacketClass>>,
    /// Explicit columns after `NO` and `TIME`
    pub columns: Option<Vec<Column>>,
    pub column_config: ColumnConfig,
    /// Enables Craft&Send
    pub craft: Option<CraftContext>,
    /// Ask before quitting
    pub confirm_quit: bool,
    /// Inbox backlog that triggers a warning
    pub inbox_warn_depth: usize,
    /// Details panel height when shown (percent)
    pub details_height_percent: u16,
}

impl Default for ViewerOptions {
    fn default() -> Self {
        Self {
            basecls: None,
            columns: None,
            column_config: ColumnConfig::default(),
            craft: None,
            confirm_quit: false,
            inbox_warn_depth: 10_000,
            details_height_percent: 30,
        }
    }
}

/// A registered details view
pub(crate) struct ViewSlot {
    pub(crate) view: Box<dyn DetailsView>,
    pub(crate) handle: ViewHandle,
    /// Already reported a failure to the user
    failed: bool,
}

pub struct Coordinator {
    phase: Phase,
    pub(crate) list: PacketListView,
    pub(crate) views: Vec<ViewSlot>,
    pub(crate) state: UiState,
    pub(crate) actions: Vec<Action>,
    inbox: InboxSender,
    receiver: InboxReceiver,
    source: PacketSource,
    capture: Option<CaptureHandle>,
    craft: Option<CraftContext>,
    confirm_quit: bool,
    fatal_error: Option<String>,
}

impl Coordinator {
    pub fn new(source: PacketSource, views: Vec<Box<dyn DetailsView>>, options: ViewerOptions) -> Self {
        let (inbox, receiver) = create_inbox(options.inbox_warn_depth);
        let columns = ColumnModel::resolve(options.basecls, options.columns, &options.column_config);

        let views: Vec<ViewSlot> = views
            .into_iter()
            .enumerate()
            .map(|(i, view)| ViewSlot {
                view,
                handle: ViewHandle::new(ViewId(i), inbox.clone()),
                failed: false,
            })
            .collect();
        let actions = build_actions(
            source.is_live(),
            views.iter().map(|slot| (slot.handle.id(), slot.view.title())),
        );
        tracing::debug!("Registered {} details views for {:?}", views.len(), source);

        Self {
            phase: Phase::Idle,
            list: PacketListView::new(columns),
            views,
            state: UiState::new(options.details_height_percent),
            actions,
            inbox,
            receiver,
            source,
            capture: None,
            craft: options.craft,
            confirm_quit: options.confirm_quit,
            fatal_error: None,
        }
    }

    /// Start delivering packets
    ///
    /// A packet list is queued into the inbox; a live socket gets a capture
    /// thread.
    pub fn start(&mut self) -> Result<()> {
        if self.phase != Phase::Idle {
            return Ok(());
        }
        self.phase = Phase::Running;

        match &mut self.source {
            PacketSource::List(packets) => {
                let packets = std::mem::take(packets);
                tracing::info!("Viewing {} packets", packets.len());
                for packet in packets {
                    self.post(Message::NewPacket(packet))?;
                }
            }
            PacketSource::Live(socket) => {
                let handle = spawn_capture(Arc::clone(socket), self.inbox.clone())
                    .context("Failed to start capture thread")?;
                self.capture = Some(handle);
                if self.craft.is_none() {
                    self.state.notifications.push(
                        NotificationKind::Info,
                        "Craft&Send is disabled: no craft context was supplied.",
                        NotificationSource::Viewer,
                    );
                }
            }
        }
        Ok(())
    }

    /// A sender for producers outside the coordinator
    pub fn inbox(&self) -> InboxSender {
        self.inbox.clone()
    }

    fn post(&self, message: Message) -> Result<()> {
        self.inbox
            .send(message)
            .map_err(|_| anyhow!("coordinator inbox closed"))
    }

    /// Wait for the next message
    pub async fn next_message(&mut self) -> Option<Message> {
        self.receiver.recv().await
    }

    /// Apply one message
    pub fn handle_message(&mut self, message: Message) -> Result<()> {
        tracing::trace!("Handling {}", message.kind());
        self.state.needs_render = true;

        match message {
            Message::NewPacket(packet) => self.on_new_packet(packet)?,
            Message::SelectionChanged(index) => self.on_selection_changed(index),
            Message::SelectionCleared => self.on_selection_cleared(),
            Message::PacketModified {
                index,
                packet,
                origin,
            } => self.on_packet_modified(index, packet, origin)?,
            Message::ViewSpecific { origin, payload } => match self.views.get_mut(origin.0) {
                Some(slot) => guarded(
                    slot,
                    &mut self.state.notifications,
                    "handle_view_message",
                    |view, handle| view.handle_view_message(payload, handle),
                ),
                None => tracing::warn!("Dropping message for unknown {}", origin),
            },
            Message::Notification {
                message,
                kind,
                origin,
            } => {
                let source = origin.map_or(NotificationSource::Viewer, NotificationSource::View);
                self.state.notifications.push(kind, message, source);
            }
            Message::SendPacket(packet) => self.send_packet(&packet),
            Message::CaptureFailed(e) => self.fail(format!("Capture failed.\n{}", e)),
            Message::CaptureFinished => {
                tracing::info!("Capture source reached its end");
                self.state.capture_finished = true;
            }
            Message::Terminal(event) => crate::input::handle_event(self, event)?,
            Message::Quit => self.begin_exit(),
            Message::Wake => {}
        }
        Ok(())
    }

    /// Apply everything already queued; returns the number of messages
    pub fn process_pending(&mut self) -> Result<usize> {
        let mut count = 0;
        while self.phase != Phase::Exiting {
            let Some(message) = self.receiver.try_recv() else {
                break;
            };
            self.handle_message(message)?;
            count += 1;
        }
        Ok(count)
    }

    /// Run without a terminal until quit
    pub async fn run_headless(&mut self) -> Result<ViewerOutput> {
        self.start()?;
        while self.phase == Phase::Running {
            match self.receiver.recv().await {
                Some(message) => self.handle_message(message)?,
                None => break,
            }
        }
        Ok(self.finish())
    }

    /// Tear down capture and socket and hand out the result
    pub fn finish(&mut self) -> ViewerOutput {
        self.phase = Phase::Exiting;
        if let Some(mut capture) = self.capture.take() {
            capture.stop();
        }
        if let Some(socket) = self.source.socket() {
            socket.close();
        }

        let output = ViewerOutput {
            selected: self.list.marked_packets(),
            all: self.list.packets().to_vec(),
        };
        tracing::info!(
            "Viewer closed with {} packets, {} selected",
            output.all.len(),
            output.selected.len()
        );
        output
    }

    fn on_new_packet(&mut self, packet: Packet) -> Result<()> {
        let Some((index, events)) = self.list.add_packet(packet) else {
            return Ok(());
        };
        self.fan_out(UpdateReason::NewPacket, index, None);
        self.apply_list_events(&events)
    }

    /// Every selection move reaches the views, in the order it was made
    fn on_selection_changed(&mut self, index: usize) {
        self.fan_out(UpdateReason::SelectionChanged, index, None);
    }

    fn on_selection_cleared(&mut self) {
        let Self { views, state, .. } = self;
        for slot in views.iter_mut() {
            guarded(slot, &mut state.notifications, "selection_cleared", |view, handle| {
                view.selection_cleared(handle)
            });
        }
    }

    fn on_packet_modified(&mut self, index: usize, packet: Packet, origin: ViewId) -> Result<()> {
        let events = match self.list.replace_packet(index, packet) {
            Ok(events) => events,
            Err(e) => {
                tracing::warn!("{} modified an unknown packet: {}", origin, e);
                return Ok(());
            }
        };
        tracing::debug!("{} modified packet {}", origin, index);
        self.fan_out(UpdateReason::PacketModified, index, Some(origin));
        self.apply_list_events(&events)
    }

    /// Turn list changes into inbox messages
    pub(crate) fn apply_list_events(&mut self, events: &[ListEvent]) -> Result<()> {
        for event in events {
            match event {
                ListEvent::SelectionMoved { index } => self.post(Message::SelectionChanged(*index))?,
                ListEvent::SelectionCleared => self.post(Message::SelectionCleared)?,
                ListEvent::RowInserted { .. } | ListEvent::RowRefreshed { .. } => {}
            }
        }
        Ok(())
    }

    /// Deliver an update to every view but `exclude`
    fn fan_out(&mut self, reason: UpdateReason, index: usize, exclude: Option<ViewId>) {
        let Self {
            list,
            views,
            state,
            ..
        } = self;
        let Ok(packet) = list.registry().get(index) else {
            return;
        };
        let update = PacketUpdate {
            reason,
            index,
            packet,
            selection: list.selected(),
            all: list.packets(),
        };
        for slot in views.iter_mut() {
            if exclude == Some(slot.handle.id()) {
                continue;
            }
            guarded(slot, &mut state.notifications, "update_packets", |view, handle| {
                view.update_packets(&update, handle)
            });
        }
    }

    /// Offer a key to the visible details view; `true` when consumed
    pub(crate) fn view_key(&mut self, key: crossterm::event::KeyEvent) -> bool {
        let Some((id, _)) = self.state.details.visible() else {
            return false;
        };
        let Some(slot) = self.views.get_mut(id.0) else {
            return false;
        };
        let mut consumed = false;
        guarded(slot, &mut self.state.notifications, "handle_key", |view, handle| {
            consumed = view.handle_key(key, handle)?;
            Ok(())
        });
        consumed
    }

    /// Draw a details view into `area`
    pub(crate) fn render_view(&mut self, id: ViewId, frame: &mut Frame, area: Rect, focused: bool) {
        let Some(slot) = self.views.get_mut(id.0) else {
            return;
        };
        let queued = self.state.notifications.len();
        guarded(slot, &mut self.state.notifications, "render", |view, _| {
            view.render(frame, area, focused);
            Ok(())
        });
        // A failure popup shows on the next frame
        if self.state.notifications.len() > queued {
            self.state.needs_render = true;
        }
    }

    /// Key hints of a details view
    pub(crate) fn view_key_hints(&mut self, id: ViewId) -> Vec<(&'static str, &'static str)> {
        let Some(slot) = self.views.get_mut(id.0) else {
            return Vec::new();
        };
        let mut hints = Vec::new();
        guarded(slot, &mut self.state.notifications, "key_hints", |view, _| {
            hints = view.key_hints();
            Ok(())
        });
        hints
    }

    /// Dismiss the current popup with an answer
    pub(crate) fn answer_popup(&mut self, accepted: bool) {
        let Some(notification) = self.state.notifications.dismiss_current() else {
            return;
        };
        if !notification.is_question() {
            return;
        }
        match notification.source {
            NotificationSource::QuitConfirmation if accepted => self.begin_exit(),
            NotificationSource::View(id) => {
                if let Some(slot) = self.views.get_mut(id.0) {
                    guarded(slot, &mut self.state.notifications, "question_answered", |view, handle| {
                        view.question_answered(accepted, handle)
                    });
                }
            }
            NotificationSource::QuitConfirmation | NotificationSource::Viewer => {}
        }
    }

    /// Quit, asking first when configured to
    pub(crate) fn request_quit(&mut self) {
        if !self.confirm_quit {
            self.begin_exit();
            return;
        }
        if !self
            .state
            .notifications
            .contains(NotificationSource::QuitConfirmation)
        {
            self.state.notifications.push(
                NotificationKind::Question,
                "Do you really want to quit?",
                NotificationSource::QuitConfirmation,
            );
        }
    }

    fn begin_exit(&mut self) {
        if self.phase == Phase::Exiting {
            return;
        }
        tracing::info!("Leaving the viewer");
        self.phase = Phase::Exiting;
        self.inbox.wake();
    }

    /// Report a fatal error and leave
    fn fail(&mut self, message: String) {
        tracing::error!("{}", message);
        self.state.notifications.push(
            NotificationKind::Info,
            message.clone(),
            NotificationSource::Viewer,
        );
        self.fatal_error = Some(message);
        self.begin_exit();
    }

    fn notify(&mut self, message: impl Into<String>) {
        self.state
            .notifications
            .push(NotificationKind::Info, message, NotificationSource::Viewer);
    }

    fn send_packet(&mut self, packet: &Packet) {
        let Some(socket) = self.source.socket().cloned() else {
            self.notify("Sending needs a live capture source.");
            return;
        };
        match socket.send(packet) {
            Ok(()) => tracing::info!("Sent {} packet ({} bytes)", packet.class_name(), packet.wire_len()),
            Err(CaptureError::NoPeer) => self.notify("No peer address to send to."),
            Err(e) => self.fail(format!("Send failed.\n{}", e)),
        }
    }

    /// Run the button bound to a function key; `true` when one matched
    pub(crate) fn execute_action(&mut self, code: KeyCode) -> bool {
        let Some(command) = self
            .actions
            .iter_mut()
            .find(|a| a.matches(code))
            .and_then(Action::execute)
        else {
            return false;
        };
        tracing::debug!("Button {:?} -> {:?}", code, command);
        self.run_command(command);
        true
    }

    fn run_command(&mut self, command: Command) {
        match command {
            Command::Resend => match self.list.selected_packet().cloned() {
                Some(packet) => self.send_packet(&packet),
                None => self.notify("No packet selected."),
            },
            Command::Pause => {
                if let Some(capture) = &self.capture {
                    capture.pause();
                    self.state.paused = true;
                }
            }
            Command::Continue => {
                if let Some(capture) = &self.capture {
                    capture.resume();
                    self.state.paused = false;
                }
            }
            Command::Quit => self.request_quit(),
            Command::Filter => {
                let last = self.state.last_filter.clone();
                self.state.start_input(InputMode::Filter, &last);
            }
            Command::Craft => {
                if self.craft.is_some() {
                    self.state.start_input(InputMode::Craft, "");
                } else {
                    self.notify("Craft&Send is disabled: no craft context was supplied.");
                }
            }
            Command::ToggleView(view, visibility) => {
                self.state.details.set(view, visibility);
                for action in &mut self.actions {
                    if action.toggled_view().is_some_and(|v| v != view) {
                        action.reset();
                    }
                }
                if visibility == DetailsVisibility::Hidden
                    && self.state.input_mode == InputMode::DetailsFocus
                {
                    self.state.input_mode = InputMode::Normal;
                }
            }
        }
    }

    /// Apply a filter typed into the input line
    pub(crate) fn commit_filter(&mut self, text: &str) -> Result<()> {
        let text = text.trim();
        self.state.last_filter = text.to_string();
        let filter = if text.is_empty() {
            None
        } else {
            match Filter::parse(text) {
                Ok(filter) => Some(filter),
                Err(e) => {
                    self.notify(format!("Invalid filter.\n{}", e));
                    return Ok(());
                }
            }
        };
        match self.list.set_filter(filter) {
            Some(event) => self.apply_list_events(&[event]),
            None => Ok(()),
        }
    }

    /// Craft a packet typed into the input line and send it
    pub(crate) fn commit_craft(&mut self, text: &str) {
        let crafted = match &self.craft {
            Some(craft) => craft.craft(text.trim()),
            None => return,
        };
        match crafted {
            Ok(packet) => self.send_packet(&packet),
            Err(e) => self.notify(format!("Cannot craft packet.\n{}", e)),
        }
    }

    /// Move the selection with a list operation
    pub(crate) fn move_selection<F>(&mut self, op: F) -> Result<()>
    where
        F: FnOnce(&mut PacketListView) -> Option<ListEvent>,
    {
        match op(&mut self.list) {
            Some(event) => self.apply_list_events(&[event]),
            None => Ok(()),
        }
    }

    /// Select a registry index
    pub fn select(&mut self, index: usize) -> Result<()> {
        if let Some(event) = self.list.select(index)? {
            self.apply_list_events(&[event])?;
        }
        Ok(())
    }

    /// Mark or unmark the selected packet
    pub fn toggle_mark(&mut self) -> Option<bool> {
        self.list.toggle_mark()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn list(&self) -> &PacketListView {
        &self.list
    }

    pub fn state(&self) -> &UiState {
        &self.state
    }

    pub fn notifications(&self) -> &NotificationManager {
        &self.state.notifications
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn is_live(&self) -> bool {
        self.source.is_live()
    }

    /// Description of the packet source for the header
    pub fn source_label(&self) -> String {
        match self.source.socket() {
            Some(socket) => socket.describe(),
            None => "packet list".to_string(),
        }
    }

    /// Title of a registered view
    pub fn view_title(&self, id: ViewId) -> Option<&str> {
        self.views.get(id.0).map(|slot| slot.view.title())
    }

    pub fn view_count(&self) -> usize {
        self.views.len()
    }

    /// The error that ended the session, if any
    pub fn fatal_error(&self) -> Option<&str> {
        self.fatal_error.as_deref()
    }
}

/// Run a view callback, containing errors and panics
///
/// A failing view is logged every time but reported to the user only once.
fn guarded<F>(slot: &mut ViewSlot, notifications: &mut NotificationManager, operation: &str, f: F)
where
    F: FnOnce(&mut Box<dyn DetailsView>, &ViewHandle) -> Result<()>,
{
    let ViewSlot {
        view,
        handle,
        failed,
    } = slot;
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| f(view, handle)));
    let error = match outcome {
        Ok(Ok(())) => return,
        Ok(Err(e)) => format!("{:#}", e),
        Err(payload) => format!("panicked: {}", panic_message(payload.as_ref())),
    };

    let title = view.title().to_string();
    tracing::warn!("{} ({}) {} failed: {}", title, handle.id(), operation, error);
    if !*failed {
        *failed = true;
        notifications.push(
            NotificationKind::Info,
            format!("The {} view failed.\n{}", title, error),
            NotificationSource::Viewer,
        );
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
