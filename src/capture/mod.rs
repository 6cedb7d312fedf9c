//! Packet sources
//!
//! A viewer session is fed either from an already captured list of packets
//! or from a live socket. Live sockets are read on a dedicated capture thread
//! that only ever pushes messages into the coordinator inbox.

mod file;
mod udp;

pub use file::{load_packets, save_packets};
pub use udp::UdpLiveSocket;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use thiserror::Error;

use crate::inbox::{InboxSender, Message};
use crate::packet::{Packet, PacketError};

/// Errors raised by packet sources
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("socket I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("socket is closed")]
    Closed,

    #[error("no peer address configured for sending")]
    NoPeer,

    #[error("sending is not supported by this source")]
    SendUnsupported,

    #[error("invalid packet file: {0}")]
    Format(String),

    #[error(transparent)]
    Packet(#[from] PacketError),
}

/// A live, bidirectional packet socket
///
/// `recv` blocks until a packet arrives; it returns `Ok(None)` once the
/// socket has been closed or the stream ended. Implementations must make
/// `close` unblock a pending `recv` so the capture thread can exit.
pub trait LiveSocket: Send + Sync {
    /// Human-readable description (address, interface)
    fn describe(&self) -> String;

    fn recv(&self) -> Result<Option<Packet>, CaptureError>;

    fn send(&self, packet: &Packet) -> Result<(), CaptureError>;

    fn close(&self);
}

/// Where the viewer's packets come from
#[derive(Clone)]
pub enum PacketSource {
    /// Already captured packets
    List(Vec<Packet>),
    /// Packets read from a socket while the viewer runs
    Live(Arc<dyn LiveSocket>),
}

impl PacketSource {
    pub fn is_live(&self) -> bool {
        matches!(self, PacketSource::Live(_))
    }

    pub fn socket(&self) -> Option<&Arc<dyn LiveSocket>> {
        match self {
            PacketSource::Live(socket) => Some(socket),
            PacketSource::List(_) => None,
        }
    }
}

impl std::fmt::Debug for PacketSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PacketSource::List(packets) => write!(f, "List({} packets)", packets.len()),
            PacketSource::Live(socket) => write!(f, "Live({})", socket.describe()),
        }
    }
}

/// Control handle of a running capture thread
pub struct CaptureHandle {
    socket: Arc<dyn LiveSocket>,
    paused: Arc<AtomicBool>,
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl CaptureHandle {
    /// Discard incoming packets until [`resume`](Self::resume)
    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
        tracing::info!("Capture paused");
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
        tracing::info!("Capture resumed");
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    /// Stop the thread and close the socket
    ///
    /// Does not wait for a thread that is still blocked in `recv`; it exits
    /// on its own once the closed socket returns.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        self.socket.close();
        if let Some(thread) = self.thread.take() {
            if thread.is_finished() {
                if thread.join().is_err() {
                    tracing::warn!("Capture thread panicked");
                }
            } else {
                tracing::debug!("Capture thread still draining, detaching");
            }
        }
    }
}

impl Drop for CaptureHandle {
    fn drop(&mut self) {
        if self.thread.is_some() {
            self.stop();
        }
    }
}

/// Start reading `socket` on a dedicated thread
///
/// Each packet becomes a [`Message::NewPacket`]; I/O failures are reported
/// once as [`Message::CaptureFailed`] and end the thread, a clean end of
/// stream yields [`Message::CaptureFinished`].
pub fn spawn_capture(
    socket: Arc<dyn LiveSocket>,
    inbox: InboxSender,
) -> std::io::Result<CaptureHandle> {
    let paused = Arc::new(AtomicBool::new(false));
    let stop = Arc::new(AtomicBool::new(false));

    let thread = {
        let socket = Arc::clone(&socket);
        let paused = Arc::clone(&paused);
        let stop = Arc::clone(&stop);
        std::thread::Builder::new()
            .name("capture".to_string())
            .spawn(move || capture_loop(socket.as_ref(), &inbox, &paused, &stop))?
    };

    tracing::info!("Capture started on {}", socket.describe());
    Ok(CaptureHandle {
        socket,
        paused,
        stop,
        thread: Some(thread),
    })
}

fn capture_loop(socket: &dyn LiveSocket, inbox: &InboxSender, paused: &AtomicBool, stop: &AtomicBool) {
    loop {
        if stop.load(Ordering::SeqCst) {
            break;
        }
        let message = match socket.recv() {
            Ok(Some(_)) if paused.load(Ordering::SeqCst) => continue,
            Ok(Some(packet)) => Message::NewPacket(packet),
            Ok(None) => {
                if !stop.load(Ordering::SeqCst) {
                    let _ = inbox.send(Message::CaptureFinished);
                }
                break;
            }
            Err(e) => {
                if !stop.load(Ordering::SeqCst) {
                    tracing::error!("Capture failed: {}", e);
                    let _ = inbox.send(Message::CaptureFailed(e));
                }
                break;
            }
        };
        if inbox.send(message).is_err() {
            tracing::debug!("Inbox closed, capture thread exiting");
            break;
        }
    }
    tracing::debug!("Capture thread finished");
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::inbox::create_inbox;
    use crate::packet::{ClassCatalog, FieldValue};
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Scripted socket: yields queued results, then blocks until closed
    pub(crate) struct ScriptedSocket {
        script: Mutex<VecDeque<Result<Option<Packet>, CaptureError>>>,
        pub sent: Mutex<Vec<Packet>>,
        closed: AtomicBool,
    }

    impl ScriptedSocket {
        pub(crate) fn new(script: Vec<Result<Option<Packet>, CaptureError>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                sent: Mutex::new(Vec::new()),
                closed: AtomicBool::new(false),
            }
        }

        pub(crate) fn is_closed(&self) -> bool {
            self.closed.load(Ordering::SeqCst)
        }
    }

    impl LiveSocket for ScriptedSocket {
        fn describe(&self) -> String {
            "scripted".to_string()
        }

        fn recv(&self) -> Result<Option<Packet>, CaptureError> {
            loop {
                if self.closed.load(Ordering::SeqCst) {
                    return Ok(None);
                }
                if let Some(next) = self.script.lock().unwrap().pop_front() {
                    return next;
                }
                std::thread::sleep(Duration::from_millis(5));
            }
        }

        fn send(&self, packet: &Packet) -> Result<(), CaptureError> {
            if self.closed.load(Ordering::SeqCst) {
                return Err(CaptureError::Closed);
            }
            self.sent.lock().unwrap().push(packet.clone());
            Ok(())
        }

        fn close(&self) {
            self.closed.store(true, Ordering::SeqCst);
        }
    }

    fn raw(byte: u8) -> Packet {
        ClassCatalog::builtin()
            .get("Raw")
            .unwrap()
            .instantiate()
            .with_field("load", FieldValue::Bytes(vec![byte]))
            .unwrap()
    }

    #[tokio::test]
    async fn test_capture_pushes_packets_in_order() {
        let socket = Arc::new(ScriptedSocket::new(vec![
            Ok(Some(raw(1))),
            Ok(Some(raw(2))),
            Ok(None),
        ]));
        let (tx, mut rx) = create_inbox(100);
        let _handle = spawn_capture(socket, tx).unwrap();

        let mut loads = Vec::new();
        loop {
            match rx.recv().await {
                Some(Message::NewPacket(p)) => loads.push(p.field("load").unwrap().clone()),
                Some(Message::CaptureFinished) => break,
                other => panic!("unexpected {:?}", other),
            }
        }
        assert_eq!(
            loads,
            vec![FieldValue::Bytes(vec![1]), FieldValue::Bytes(vec![2])]
        );
    }

    #[tokio::test]
    async fn test_capture_error_is_reported() {
        let socket = Arc::new(ScriptedSocket::new(vec![Err(CaptureError::Io(
            std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset"),
        ))]));
        let (tx, mut rx) = create_inbox(100);
        let _handle = spawn_capture(socket, tx).unwrap();
        assert!(matches!(rx.recv().await, Some(Message::CaptureFailed(_))));
    }

    #[tokio::test]
    async fn test_stop_closes_socket_without_further_messages() {
        let socket = Arc::new(ScriptedSocket::new(vec![]));
        let (tx, mut rx) = create_inbox(100);
        let mut handle = spawn_capture(Arc::clone(&socket) as Arc<dyn LiveSocket>, tx).unwrap();

        handle.stop();
        assert!(socket.closed.load(Ordering::SeqCst));

        // The thread exits on its own; no CaptureFinished after an explicit stop
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(rx.try_recv().is_none());
    }

    #[test]
    fn test_pause_flag() {
        let socket = Arc::new(ScriptedSocket::new(vec![]));
        let (tx, _rx) = create_inbox(100);
        let mut handle = spawn_capture(socket, tx).unwrap();
        assert!(!handle.is_paused());
        handle.pause();
        assert!(handle.is_paused());
        handle.resume();
        assert!(!handle.is_paused());
        handle.stop();
    }
}
