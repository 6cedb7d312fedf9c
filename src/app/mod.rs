//! Application state and main event loop
//!
//! [`Coordinator`] owns every piece of viewer state and applies inbox
//! messages one at a time. [`App`] puts it on a terminal: it pumps input
//! events into the inbox and redraws whenever a message changed something.

mod actions;
mod coordinator;
mod event_loop;
mod input_mode;
mod packet_list;
mod state;
mod view;

pub use actions::{build_actions, Action, Command, LABEL_WIDTH};
pub use coordinator::{Coordinator, Phase, ViewerOptions, ViewerOutput};
pub use event_loop::{acknowledges_fatal, InputPump};
pub use input_mode::InputMode;
pub use packet_list::{ListEvent, PacketListView};
pub use state::UiState;
pub use view::{DetailsPanel, DetailsVisibility};

use anyhow::Result;
use crossterm::event::Event;
use ratatui::Frame;

use crate::capture::PacketSource;
use crate::details::DetailsView;
use crate::inbox::Message;
use crate::tui::views::{render_footer, render_input_line, render_packet_list, render_popup, Breadcrumb};
use crate::tui::{CaptureStatus, Header, ScreenLayout, Tui};

/// Main application struct
pub struct App {
    /// Terminal UI
    tui: Tui,
    coordinator: Coordinator,
}

impl App {
    /// Create a new application instance
    pub fn new(source: PacketSource, views: Vec<Box<dyn DetailsView>>, options: ViewerOptions) -> Result<Self> {
        Ok(Self {
            tui: Tui::new()?,
            coordinator: Coordinator::new(source, views, options),
        })
    }

    pub fn coordinator(&self) -> &Coordinator {
        &self.coordinator
    }

    /// Run the viewer until the user quits
    pub async fn run(&mut self) -> Result<ViewerOutput> {
        // Enter TUI mode
        self.tui.enter()?;

        tracing::info!("Viewer started on {}", self.coordinator.source_label());

        let mut pump = InputPump::spawn(self.coordinator.inbox())?;
        let mut result = self.event_loop().await;
        if result.is_ok() && self.coordinator.fatal_error().is_some() {
            result = self.await_acknowledgement().await;
        }
        pump.stop();

        // Exit TUI mode (also done in Drop, but explicit is clearer)
        self.tui.exit()?;

        // The capture is torn down even when the loop failed
        let output = self.coordinator.finish();
        result.map(|()| output)
    }

    /// Main event loop
    async fn event_loop(&mut self) -> Result<()> {
        self.coordinator.start()?;

        while self.coordinator.phase() == Phase::Running {
            // Only render when something has changed
            while self.coordinator.state.needs_render {
                self.coordinator.state.needs_render = false;
                self.render()?;
            }

            let Some(message) = self.coordinator.next_message().await else {
                break;
            };
            self.coordinator.handle_message(message)?;
            // Apply the backlog before drawing again
            self.coordinator.process_pending()?;
        }
        Ok(())
    }

    /// Keep the fatal popup on screen until a key dismisses it
    async fn await_acknowledgement(&mut self) -> Result<()> {
        self.render()?;
        while let Some(message) = self.coordinator.next_message().await {
            if acknowledges_fatal(&message) {
                break;
            }
            if matches!(message, Message::Terminal(Event::Resize(..))) {
                self.render()?;
            }
        }
        Ok(())
    }

    /// Render the current state
    fn render(&mut self) -> Result<()> {
        let coordinator = &mut self.coordinator;
        self.tui.draw(|frame| render_frame(frame, coordinator))
    }
}

fn render_frame(frame: &mut Frame, coordinator: &mut Coordinator) {
    let area = frame.size();
    let details = coordinator.state.details.visible();
    let details_percent = details
        .map(|(_, visibility)| visibility.height_percent(coordinator.state.details_height_percent))
        .unwrap_or(0);
    let input_mode = coordinator.state.input_mode;

    let areas = ScreenLayout::new(area)
        .with_details(details_percent)
        .with_input_line(input_mode.is_text_input())
        .split();

    header(coordinator).render(frame, areas.header);

    let list_focused = input_mode != InputMode::DetailsFocus;
    let rows = render_packet_list(frame, areas.list, coordinator.list(), list_focused);
    if rows > 0 {
        coordinator.state.page_rows = rows;
    }

    if let (Some((id, _)), Some(details_area)) = (details, areas.details) {
        coordinator.render_view(id, frame, details_area, !list_focused);
    }

    if let Some(input_area) = areas.input {
        render_input_line(frame, input_area, input_mode, &coordinator.state.input_buffer);
    }

    let hints = key_hints(coordinator);
    render_footer(frame, areas.footer, coordinator.actions(), &hints);

    let notifications = coordinator.notifications();
    if let Some(current) = notifications.current() {
        render_popup(frame, area, current, notifications.selected_yes(), notifications.len());
    }
}

fn header(coordinator: &Coordinator) -> Header {
    let list = coordinator.list();
    let mut suffix = format!("({} packets", list.packets().len());
    if list.filter().is_some() {
        suffix.push_str(&format!(", {} shown", list.visible_len()));
    }
    if !list.marks().is_empty() {
        suffix.push_str(&format!(", {} marked", list.marks().len()));
    }
    suffix.push(')');

    let state = coordinator.state();
    let status = if !coordinator.is_live() {
        CaptureStatus::Offline
    } else if state.capture_finished {
        CaptureStatus::Finished
    } else if state.paused {
        CaptureStatus::Paused
    } else {
        CaptureStatus::Live
    };

    Header::new(Breadcrumb::new().push(coordinator.source_label()))
        .with_suffix(suffix)
        .with_status(status)
}

fn key_hints(coordinator: &mut Coordinator) -> Vec<(&'static str, &'static str)> {
    match coordinator.state.input_mode {
        InputMode::Normal => {
            let mut hints = vec![("↑/↓", "move"), ("PgUp/PgDn", "page"), ("Space", "mark")];
            if coordinator.state.details.visible().is_some() {
                hints.push(("Tab", "details"));
            }
            hints.push(("q", "quit"));
            hints
        }
        InputMode::DetailsFocus => {
            let mut hints = coordinator
                .state
                .details
                .visible()
                .map(|(id, _)| coordinator.view_key_hints(id))
                .unwrap_or_default();
            hints.push(("Esc/Tab", "back to list"));
            hints
        }
        InputMode::Filter | InputMode::Craft => vec![("Enter", "apply"), ("Esc", "cancel")],
    }
}
