//! Terminal input pump
//!
//! Reads crossterm events on a dedicated thread and forwards them into the
//! coordinator inbox, so key presses queue behind packets and view messages
//! in arrival order.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyEventKind};

use crate::inbox::{InboxSender, Message};

/// How long one poll waits before checking the stop flag
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Handle of the running input thread
pub struct InputPump {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl InputPump {
    /// Start forwarding terminal events into `inbox`
    pub fn spawn(inbox: InboxSender) -> Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop);
        let thread = std::thread::Builder::new()
            .name("input".to_string())
            .spawn(move || pump(&inbox, &thread_stop))
            .context("Failed to spawn input thread")?;
        Ok(Self {
            stop,
            thread: Some(thread),
        })
    }

    /// Stop the thread and wait for it
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::warn!("Input thread panicked");
            }
        }
    }
}

impl Drop for InputPump {
    fn drop(&mut self) {
        self.stop();
    }
}

fn pump(inbox: &InboxSender, stop: &AtomicBool) {
    tracing::debug!("Input thread started");
    while !stop.load(Ordering::SeqCst) {
        match event::poll(POLL_INTERVAL) {
            Ok(false) => continue,
            Ok(true) => {}
            Err(e) => {
                tracing::error!("Terminal poll failed: {}", e);
                break;
            }
        }
        let event = match event::read() {
            Ok(event) => event,
            Err(e) => {
                tracing::error!("Terminal read failed: {}", e);
                break;
            }
        };
        if !forwarded(&event) {
            continue;
        }
        if inbox.send(Message::Terminal(event)).is_err() {
            break;
        }
    }
    tracing::debug!("Input thread stopped");
}

/// Mouse motion would flood the inbox
fn forwarded(event: &Event) -> bool {
    !matches!(event, Event::Mouse(_) | Event::FocusGained | Event::FocusLost)
}

/// Whether a message dismisses the fatal error popup
///
/// Only key presses count; packets still draining from the capture and
/// view results arriving late are ignored.
pub fn acknowledges_fatal(message: &Message) -> bool {
    matches!(
        message,
        Message::Terminal(Event::Key(key)) if key.kind == KeyEventKind::Press
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};

    #[test]
    fn test_forwarded_events() {
        let key = Event::Key(KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE));
        assert!(forwarded(&key));
        assert!(forwarded(&Event::Resize(80, 24)));
        assert!(forwarded(&Event::Paste("x".to_string())));

        let mouse = Event::Mouse(MouseEvent {
            kind: MouseEventKind::Moved,
            column: 0,
            row: 0,
            modifiers: KeyModifiers::NONE,
        });
        assert!(!forwarded(&mouse));
        assert!(!forwarded(&Event::FocusLost));
    }

    #[test]
    fn test_only_key_presses_acknowledge_fatal() {
        let press = KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE);
        assert!(acknowledges_fatal(&Message::Terminal(Event::Key(press))));

        let mut release = press;
        release.kind = KeyEventKind::Release;
        assert!(!acknowledges_fatal(&Message::Terminal(Event::Key(release))));
        assert!(!acknowledges_fatal(&Message::Terminal(Event::Resize(80, 24))));
        assert!(!acknowledges_fatal(&Message::CaptureFinished));
    }
}
