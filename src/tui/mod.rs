//! Terminal UI module
//!
//! Terminal setup and teardown plus all rendering components, built on
//! Ratatui.

pub mod header;
pub mod layout;
pub mod notifications;
pub mod theme;
pub mod views;
pub mod widgets;

pub use header::{CaptureStatus, Header};
pub use layout::{LayoutAreas, ScreenLayout};
pub use notifications::{Notification, NotificationManager, NotificationSource};
pub use theme::{init_theme, theme, Theme};

use anyhow::Result;
use crossterm::event::{
    self, DisableBracketedPaste, EnableBracketedPaste, KeyboardEnhancementFlags,
    PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, supports_keyboard_enhancement, EnterAlternateScreen,
    LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::io::{self, stdout, Write};
use std::time::Duration;

/// Optional terminal modes switched on by [`Tui::enter`]
#[derive(Debug, Default, Clone, Copy)]
struct Modes {
    /// Press/release reporting, so held keys do not repeat list moves
    key_events: bool,
    /// Pastes arrive as one event for the input line
    paste: bool,
}

/// Where teardown problems are reported
#[derive(Clone, Copy)]
enum Teardown {
    /// Regular exit, tracing is up
    Logged,
    /// Drop during unwinding, the subscriber may be gone
    Stderr,
}

impl Teardown {
    fn report(self, step: &str, error: impl std::fmt::Display) {
        match self {
            Teardown::Logged => tracing::warn!("Terminal restore: {} failed: {}", step, error),
            Teardown::Stderr => eprintln!("packetview: terminal restore: {} failed: {}", step, error),
        }
    }

    fn check<T, E: std::fmt::Display>(self, step: &str, result: std::result::Result<T, E>) {
        if let Err(e) = result {
            self.report(step, e);
        }
    }
}

/// Switch the optional modes off again
///
/// Runs while still in raw mode: popping the keyboard flags can make the
/// terminal answer with a sequence that has to be read away.
fn leave_modes(modes: Modes, teardown: Teardown) {
    if modes.key_events {
        teardown.check("pop keyboard flags", stdout().execute(PopKeyboardEnhancementFlags));
        teardown.check("flush", stdout().flush());
        while event::poll(Duration::from_millis(10)).unwrap_or(false) {
            let _ = event::read();
        }
    }
    if modes.paste {
        teardown.check("disable bracketed paste", stdout().execute(DisableBracketedPaste));
    }
}

/// The terminal the viewer draws on
///
/// [`Tui::enter`] switches to raw mode on the alternate screen; [`Tui::exit`]
/// or dropping the value restores the shell.
pub struct Tui {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
    modes: Modes,
    /// Between `enter` and `exit`
    entered: bool,
}

impl Tui {
    pub fn new() -> Result<Self> {
        let terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
        Ok(Self {
            terminal,
            modes: Modes::default(),
            entered: false,
        })
    }

    /// Raw mode, alternate screen and the optional modes the terminal supports
    pub fn enter(&mut self) -> Result<()> {
        enable_raw_mode()?;
        stdout().execute(EnterAlternateScreen)?;
        self.entered = true;

        self.modes.key_events = supports_keyboard_enhancement().unwrap_or(false)
            && stdout()
                .execute(PushKeyboardEnhancementFlags(
                    KeyboardEnhancementFlags::REPORT_EVENT_TYPES,
                ))
                .is_ok();
        self.modes.paste = stdout().execute(EnableBracketedPaste).is_ok();
        tracing::debug!(
            "Terminal entered (key events: {}, paste: {})",
            self.modes.key_events,
            self.modes.paste
        );

        self.terminal.hide_cursor()?;
        self.terminal.clear()?;
        Ok(())
    }

    /// Give the terminal back to the shell
    pub fn exit(&mut self) -> Result<()> {
        if !self.entered {
            return Ok(());
        }
        self.entered = false;
        leave_modes(std::mem::take(&mut self.modes), Teardown::Logged);

        self.terminal.show_cursor()?;
        stdout().execute(LeaveAlternateScreen)?;
        disable_raw_mode()?;
        tracing::debug!("Terminal restored");
        Ok(())
    }

    /// Draw a frame
    pub fn draw<F>(&mut self, f: F) -> Result<()>
    where
        F: FnOnce(&mut Frame),
    {
        self.terminal.draw(f)?;
        Ok(())
    }
}

impl Drop for Tui {
    fn drop(&mut self) {
        if !self.entered {
            return;
        }
        let teardown = Teardown::Stderr;
        leave_modes(self.modes, teardown);
        teardown.check("show cursor", self.terminal.show_cursor());
        teardown.check("leave alternate screen", stdout().execute(LeaveAlternateScreen));
        teardown.check("disable raw mode", disable_raw_mode());
    }
}
