//! UDP live socket
//!
//! Every received datagram becomes a `Raw` packet carrying the datagram bytes
//! in its `load` field. Sending writes a packet's built bytes to the
//! configured peer.

use std::io::ErrorKind;
use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use super::{CaptureError, LiveSocket};
use crate::packet::{FieldValue, PacketClass, Packet};

/// How long a blocking receive waits before re-checking the closed flag
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Largest datagram accepted
const MAX_DATAGRAM: usize = 65_535;

pub struct UdpLiveSocket {
    socket: UdpSocket,
    local: SocketAddr,
    peer: Option<SocketAddr>,
    raw_class: Arc<PacketClass>,
    closed: AtomicBool,
}

impl UdpLiveSocket {
    /// Bind to `addr`; packets are sent to `peer` when one is given
    pub fn bind(
        addr: SocketAddr,
        peer: Option<SocketAddr>,
        raw_class: Arc<PacketClass>,
    ) -> Result<Self, CaptureError> {
        let socket = UdpSocket::bind(addr)?;
        socket.set_read_timeout(Some(POLL_INTERVAL))?;
        let local = socket.local_addr()?;
        tracing::info!("Listening for UDP datagrams on {}", local);
        Ok(Self {
            socket,
            local,
            peer,
            raw_class,
            closed: AtomicBool::new(false),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl LiveSocket for UdpLiveSocket {
    fn describe(&self) -> String {
        match self.peer {
            Some(peer) => format!("udp {} -> {}", self.local, peer),
            None => format!("udp {}", self.local),
        }
    }

    fn recv(&self) -> Result<Option<Packet>, CaptureError> {
        let mut buf = vec![0u8; MAX_DATAGRAM];
        loop {
            if self.is_closed() {
                return Ok(None);
            }
            match self.socket.recv_from(&mut buf) {
                Ok((len, from)) => {
                    tracing::trace!("Datagram of {} bytes from {}", len, from);
                    let packet = self
                        .raw_class
                        .instantiate()
                        .with_field("load", FieldValue::Bytes(buf[..len].to_vec()))?
                        .with_time(now_secs());
                    return Ok(Some(packet));
                }
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    continue
                }
                Err(e) if self.is_closed() => {
                    tracing::debug!("Receive error after close ignored: {}", e);
                    return Ok(None);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn send(&self, packet: &Packet) -> Result<(), CaptureError> {
        if self.is_closed() {
            return Err(CaptureError::Closed);
        }
        let peer = self.peer.ok_or(CaptureError::NoPeer)?;
        let bytes = packet.build();
        self.socket.send_to(&bytes, peer)?;
        tracing::debug!("Sent {} bytes to {}", bytes.len(), peer);
        Ok(())
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            tracing::info!("Closed {}", self.describe());
        }
    }
}

fn now_secs() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::ClassCatalog;

    fn loopback() -> SocketAddr {
        "127.0.0.1:0".parse().unwrap()
    }

    #[test]
    fn test_receive_datagram_as_raw_packet() {
        let raw = ClassCatalog::builtin().get("Raw").unwrap();
        let socket = UdpLiveSocket::bind(loopback(), None, raw).unwrap();

        let client = UdpSocket::bind(loopback()).unwrap();
        client.send_to(b"\x01\x02abc", socket.local_addr()).unwrap();

        let packet = socket.recv().unwrap().unwrap();
        assert_eq!(packet.class_name(), "Raw");
        assert_eq!(
            packet.field("load").unwrap(),
            &FieldValue::Bytes(b"\x01\x02abc".to_vec())
        );
        assert!(packet.time() > 0.0);
    }

    #[test]
    fn test_send_to_peer() {
        let catalog = ClassCatalog::builtin();
        let peer = UdpSocket::bind(loopback()).unwrap();
        peer.set_read_timeout(Some(Duration::from_secs(2))).unwrap();
        let socket = UdpLiveSocket::bind(
            loopback(),
            Some(peer.local_addr().unwrap()),
            catalog.get("Raw").unwrap(),
        )
        .unwrap();

        let packet = catalog
            .get("UDP")
            .unwrap()
            .instantiate()
            .with_field("sport", FieldValue::Int(0x0102))
            .unwrap();
        socket.send(&packet).unwrap();

        let mut buf = [0u8; 64];
        let (len, _) = peer.recv_from(&mut buf).unwrap();
        assert_eq!(&buf[..len], &[0x01, 0x02, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_send_without_peer_fails() {
        let raw = ClassCatalog::builtin().get("Raw").unwrap();
        let socket = UdpLiveSocket::bind(loopback(), None, Arc::clone(&raw)).unwrap();
        assert!(matches!(
            socket.send(&raw.instantiate()).unwrap_err(),
            CaptureError::NoPeer
        ));
    }

    #[test]
    fn test_close_unblocks_recv() {
        let raw = ClassCatalog::builtin().get("Raw").unwrap();
        let socket = Arc::new(UdpLiveSocket::bind(loopback(), None, raw).unwrap());
        let reader = {
            let socket = Arc::clone(&socket);
            std::thread::spawn(move || socket.recv())
        };
        std::thread::sleep(Duration::from_millis(20));
        socket.close();
        assert!(reader.join().unwrap().unwrap().is_none());
        assert!(matches!(
            socket.send(&ClassCatalog::builtin().get("Raw").unwrap().instantiate()),
            Err(CaptureError::Closed)
        ));
    }
}
