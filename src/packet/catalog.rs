//! Catalog of known packet classes
//!
//! Used to resolve `--basecls`, to load packets from files and as the symbol
//! table for packet crafting.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::{FieldDecl, PacketClass, PacketError};

/// Name-indexed set of packet classes (lookups are case-insensitive)
#[derive(Debug, Clone, Default)]
pub struct ClassCatalog {
    classes: BTreeMap<String, Arc<PacketClass>>,
}

impl ClassCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog with the built-in classes: UDP, TCP, Raw, CAN and ISOTP
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        catalog.register(PacketClass::new(
            "UDP",
            vec![
                FieldDecl::uint("sport", 16),
                FieldDecl::uint("dport", 16),
                FieldDecl::uint("len", 16),
                FieldDecl::uint("chksum", 16),
            ],
        ));
        catalog.register(PacketClass::new(
            "TCP",
            vec![
                FieldDecl::uint("sport", 16),
                FieldDecl::uint("dport", 16),
                FieldDecl::uint("seq", 32),
                FieldDecl::uint("ack", 32),
                FieldDecl::uint("dataofs", 8),
                FieldDecl::uint("flags", 8),
                FieldDecl::uint("window", 16),
                FieldDecl::uint("chksum", 16),
                FieldDecl::uint("urgptr", 16),
            ],
        ));
        catalog.register(PacketClass::new("Raw", vec![FieldDecl::bytes("load")]));
        catalog.register(PacketClass::new(
            "CAN",
            vec![
                FieldDecl::uint("identifier", 32),
                FieldDecl::uint("length", 8),
                FieldDecl::bytes("data"),
            ],
        ));
        catalog.register(PacketClass::new(
            "ISOTP",
            vec![
                FieldDecl::uint("src", 16),
                FieldDecl::uint("dst", 16),
                FieldDecl::bytes("data"),
            ],
        ));
        catalog
    }

    /// Register (or replace) a class
    pub fn register(&mut self, class: PacketClass) -> Arc<PacketClass> {
        let class = Arc::new(class);
        self.classes
            .insert(class.name.to_ascii_lowercase(), Arc::clone(&class));
        class
    }

    /// Look up a class by name
    pub fn get(&self, name: &str) -> Option<Arc<PacketClass>> {
        self.classes.get(&name.to_ascii_lowercase()).cloned()
    }

    /// Look up a class by name, failing with [`PacketError::UnknownClass`]
    pub fn require(&self, name: &str) -> Result<Arc<PacketClass>, PacketError> {
        self.get(name)
            .ok_or_else(|| PacketError::UnknownClass(name.to_string()))
    }

    /// Names of all registered classes
    pub fn names(&self) -> Vec<String> {
        self.classes.values().map(|c| c.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_lookup() {
        let catalog = ClassCatalog::builtin();
        assert_eq!(catalog.len(), 5);
        assert_eq!(catalog.get("udp").unwrap().name, "UDP");
        assert_eq!(catalog.get("raw").unwrap().fields[0].name, "load");
    }

    #[test]
    fn test_require_unknown() {
        let catalog = ClassCatalog::builtin();
        assert_eq!(
            catalog.require("IPv9").unwrap_err(),
            PacketError::UnknownClass("IPv9".to_string())
        );
    }

    #[test]
    fn test_register_replaces() {
        let mut catalog = ClassCatalog::new();
        catalog.register(PacketClass::new("Foo", vec![]));
        catalog.register(PacketClass::new("FOO", vec![FieldDecl::uint("a", 8)]));
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.get("foo").unwrap().fields.len(), 1);
    }
}
