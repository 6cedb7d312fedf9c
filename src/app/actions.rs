//! Button bar actions
//!
//! Each button is bound to a function key and walks through a fixed cycle of
//! `(label, command)` steps: executing it runs the current step's command
//! and advances to the next one, so the label always names what the next
//! press will do.

use crossterm::event::KeyCode;

use super::view::DetailsVisibility;
use crate::details::ViewId;

/// Width every button label is padded (or cut) to
pub const LABEL_WIDTH: usize = 12;

/// First function key used for details view toggles
const FIRST_VIEW_KEY: u8 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Send the focused packet again
    Resend,
    Pause,
    Continue,
    Quit,
    /// Open the filter input line
    Filter,
    /// Open the craft input line
    Craft,
    /// Show, enlarge or hide a details view
    ToggleView(ViewId, DetailsVisibility),
}

#[derive(Debug, Clone)]
pub struct Action {
    key: u8,
    steps: Vec<(String, Command)>,
    position: usize,
}

impl Action {
    /// Single-step action
    pub fn new(key: u8, label: impl Into<String>, command: Command) -> Self {
        Self::cycling(key, vec![(label.into(), command)])
    }

    /// Action cycling through `steps`
    pub fn cycling(key: u8, steps: Vec<(String, Command)>) -> Self {
        Self {
            key,
            steps,
            position: 0,
        }
    }

    /// Function key number
    pub fn key(&self) -> u8 {
        self.key
    }

    pub fn matches(&self, code: KeyCode) -> bool {
        code == KeyCode::F(self.key)
    }

    pub fn label(&self) -> &str {
        self.steps
            .get(self.position)
            .map(|(label, _)| label.as_str())
            .unwrap_or_default()
    }

    /// Label cut or padded to [`LABEL_WIDTH`]
    pub fn padded_label(&self) -> String {
        crate::column::fit_cell(self.label(), LABEL_WIDTH)
    }

    /// Command of the current step, advancing the cycle
    pub fn execute(&mut self) -> Option<Command> {
        let (_, command) = self.steps.get(self.position)?;
        let command = *command;
        self.position = (self.position + 1) % self.steps.len();
        Some(command)
    }

    /// Back to the first step
    pub fn reset(&mut self) {
        self.position = 0;
    }

    /// The view this action toggles, if any
    pub fn toggled_view(&self) -> Option<ViewId> {
        self.steps.iter().find_map(|(_, command)| match command {
            Command::ToggleView(view, _) => Some(*view),
            _ => None,
        })
    }
}

/// The button bar of a session
///
/// Re-send, pause and craft need a live source; each details view gets its
/// own toggle starting at F7.
pub fn build_actions<'a>(live: bool, views: impl IntoIterator<Item = (ViewId, &'a str)>) -> Vec<Action> {
    let mut actions = Vec::new();
    if live {
        actions.push(Action::new(2, "Re-Send", Command::Resend));
        actions.push(Action::cycling(
            3,
            vec![
                ("Pause".to_string(), Command::Pause),
                ("Continue".to_string(), Command::Continue),
            ],
        ));
    }
    actions.push(Action::new(4, "Quit", Command::Quit));
    actions.push(Action::new(5, "Filter", Command::Filter));
    if live {
        actions.push(Action::new(6, "Craft&Send", Command::Craft));
    }

    for (offset, (view, title)) in views.into_iter().enumerate() {
        let key = u8::try_from(offset)
            .ok()
            .and_then(|o| FIRST_VIEW_KEY.checked_add(o))
            .filter(|&k| k <= 12);
        let Some(key) = key else {
            tracing::warn!("No function key left for details view {}", title);
            continue;
        };
        actions.push(Action::cycling(
            key,
            vec![
                (title.to_string(), Command::ToggleView(view, DetailsVisibility::Shown)),
                (
                    "FULLSCREEN".to_string(),
                    Command::ToggleView(view, DetailsVisibility::Fullscreen),
                ),
                (
                    format!("hide {}", title),
                    Command::ToggleView(view, DetailsVisibility::Hidden),
                ),
            ],
        ));
    }
    actions
}
