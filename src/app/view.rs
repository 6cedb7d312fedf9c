//! Details panel visibility

use crate::details::ViewId;

/// How much of the screen a details view takes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DetailsVisibility {
    #[default]
    Hidden,
    Shown,
    Fullscreen,
}

impl DetailsVisibility {
    /// Next state of a view's toggle button
    pub fn cycle(self) -> Self {
        match self {
            DetailsVisibility::Hidden => DetailsVisibility::Shown,
            DetailsVisibility::Shown => DetailsVisibility::Fullscreen,
            DetailsVisibility::Fullscreen => DetailsVisibility::Hidden,
        }
    }

    /// Percentage of the content height given to the panel
    pub fn height_percent(self, shown_percent: u16) -> u16 {
        match self {
            DetailsVisibility::Hidden => 0,
            DetailsVisibility::Shown => shown_percent,
            DetailsVisibility::Fullscreen => 75,
        }
    }
}

/// The details view currently on screen, if any
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DetailsPanel {
    pub view: Option<ViewId>,
    pub visibility: DetailsVisibility,
}

impl DetailsPanel {
    /// Apply a view's toggle; another view's panel is replaced at `visibility`
    pub fn set(&mut self, view: ViewId, visibility: DetailsVisibility) {
        if visibility == DetailsVisibility::Hidden {
            if self.view == Some(view) {
                *self = Self::default();
            }
            return;
        }
        self.view = Some(view);
        self.visibility = visibility;
    }

    /// The visible view and its visibility
    pub fn visible(&self) -> Option<(ViewId, DetailsVisibility)> {
        match (self.view, self.visibility) {
            (Some(_), DetailsVisibility::Hidden) | (None, _) => None,
            (Some(view), visibility) => Some((view, visibility)),
        }
    }
}
