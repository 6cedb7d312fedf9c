//! Packet registry
//!
//! The ordered set of packets known to a viewer session. Indices are assigned
//! on append and never change: there is no removal, and edits replace a
//! packet in place. Every other component refers to packets by index.

use super::{Packet, PacketError};

/// Append-only, index-stable packet store
#[derive(Debug, Clone, Default)]
pub struct PacketRegistry {
    packets: Vec<Packet>,
}

impl PacketRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a packet and return its index
    pub fn append(&mut self, packet: Packet) -> usize {
        self.packets.push(packet);
        self.packets.len() - 1
    }

    /// Get the packet at `index`
    pub fn get(&self, index: usize) -> Result<&Packet, PacketError> {
        self.packets.get(index).ok_or(PacketError::IndexOutOfRange {
            index,
            len: self.packets.len(),
        })
    }

    /// Replace the packet at `index`, returning the previous one
    pub fn replace(&mut self, index: usize, packet: Packet) -> Result<Packet, PacketError> {
        let len = self.packets.len();
        let slot = self
            .packets
            .get_mut(index)
            .ok_or(PacketError::IndexOutOfRange { index, len })?;
        Ok(std::mem::replace(slot, packet))
    }

    pub fn len(&self) -> usize {
        self.packets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Packet> {
        self.packets.iter()
    }

    /// All packets in index order
    pub fn as_slice(&self) -> &[Packet] {
        &self.packets
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::{ClassCatalog, FieldValue};

    fn raw(load: &[u8]) -> Packet {
        ClassCatalog::builtin()
            .get("Raw")
            .unwrap()
            .instantiate()
            .with_field("load", FieldValue::Bytes(load.to_vec()))
            .unwrap()
    }

    #[test]
    fn test_append_assigns_increasing_indices() {
        let mut registry = PacketRegistry::new();
        let indices: Vec<usize> = (0..5).map(|i| registry.append(raw(&[i]))).collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4]);
        assert_eq!(registry.len(), 5);
    }

    #[test]
    fn test_replace_keeps_index_and_length() {
        let mut registry = PacketRegistry::new();
        registry.append(raw(b"a"));
        registry.append(raw(b"b"));

        let old = registry.replace(0, raw(b"z")).unwrap();
        assert_eq!(old, raw(b"a"));
        assert_eq!(registry.get(0).unwrap(), &raw(b"z"));
        assert_eq!(registry.get(1).unwrap(), &raw(b"b"));
        assert_eq!(registry.len(), 2);

        // Appending after a replace continues the sequence
        assert_eq!(registry.append(raw(b"c")), 2);
    }

    #[test]
    fn test_out_of_range() {
        let mut registry = PacketRegistry::new();
        assert_eq!(
            registry.get(0).unwrap_err(),
            PacketError::IndexOutOfRange { index: 0, len: 0 }
        );
        registry.append(raw(b"a"));
        assert!(registry.replace(3, raw(b"b")).is_err());
        assert_eq!(registry.get(0).unwrap(), &raw(b"a"));
    }
}
