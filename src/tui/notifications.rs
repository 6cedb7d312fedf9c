//! Popup notifications
//!
//! Popups are queued and shown one at a time, oldest first. Info popups are
//! acknowledged, question popups are answered; the answer goes back to
//! whoever asked.

use std::collections::VecDeque;
use std::time::Instant;

use uuid::Uuid;

use crate::details::{NotificationKind, ViewId};

/// Who raised a popup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationSource {
    /// The viewer itself (errors, hints)
    Viewer,
    /// A details view; questions are answered back to it
    View(ViewId),
    /// The quit confirmation
    QuitConfirmation,
}

/// A popup waiting for the user
#[derive(Debug, Clone)]
pub struct Notification {
    pub id: Uuid,
    pub kind: NotificationKind,
    pub message: String,
    pub source: NotificationSource,
    pub created_at: Instant,
}

impl Notification {
    pub fn new(kind: NotificationKind, message: impl Into<String>, source: NotificationSource) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            message: message.into(),
            source,
            created_at: Instant::now(),
        }
    }

    pub fn title(&self) -> &'static str {
        match self.kind {
            NotificationKind::Info => "Info",
            NotificationKind::Question => "Question",
        }
    }

    pub fn is_question(&self) -> bool {
        self.kind == NotificationKind::Question
    }
}

/// Queue of pending popups
#[derive(Debug, Default)]
pub struct NotificationManager {
    notifications: VecDeque<Notification>,
    /// Highlighted answer of the current question
    selected_yes: bool,
}

impl NotificationManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, kind: NotificationKind, message: impl Into<String>, source: NotificationSource) {
        let notification = Notification::new(kind, message, source);
        tracing::debug!(
            id = %notification.id,
            "Queued {} popup: {}",
            notification.title(),
            notification.message
        );
        if self.notifications.is_empty() {
            self.selected_yes = true;
        }
        self.notifications.push_back(notification);
    }

    /// The popup on screen
    pub fn current(&self) -> Option<&Notification> {
        self.notifications.front()
    }

    /// Remove the popup on screen
    pub fn dismiss_current(&mut self) -> Option<Notification> {
        let dismissed = self.notifications.pop_front();
        self.selected_yes = true;
        dismissed
    }

    pub fn selected_yes(&self) -> bool {
        self.selected_yes
    }

    pub fn toggle_selection(&mut self) {
        self.selected_yes = !self.selected_yes;
    }

    /// Whether a popup of `source` is already queued
    pub fn contains(&self, source: NotificationSource) -> bool {
        self.notifications.iter().any(|n| n.source == source)
    }

    pub fn is_empty(&self) -> bool {
        self.notifications.is_empty()
    }

    pub fn len(&self) -> usize {
        self.notifications.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notification> {
        self.notifications.iter()
    }
}
