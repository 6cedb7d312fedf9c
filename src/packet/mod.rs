//! Packet model
//!
//! A small, dynamically typed packet representation. Every packet belongs to a
//! [`PacketClass`] that declares its fields in order; the viewer core only ever
//! talks to packets through this module (field lookup, field edits, `repr`,
//! wire bytes).

mod catalog;
mod dump;
pub mod literal;
pub mod registry;

pub use catalog::ClassCatalog;
pub use dump::hexdump;
pub use registry::PacketRegistry;

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use literal::{escape_bytes, unescape};

/// Errors raised by the packet model
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PacketError {
    /// The packet's class does not declare the requested field
    #[error("{class} has no field '{field}'")]
    MissingField { class: String, field: String },

    /// A value could not be parsed or does not fit the field
    #[error("invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    /// Registry access outside the assigned indices
    #[error("packet index {index} out of range ({len} packets)")]
    IndexOutOfRange { index: usize, len: usize },

    /// No class with this name is known
    #[error("unknown packet class '{0}'")]
    UnknownClass(String),
}

/// Storage kind of a declared field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Unsigned integer of the given bit width (1..=64), big-endian on the wire
    UInt { bits: u8 },
    /// Raw bytes
    Bytes,
    /// Text
    Str,
}

impl FieldKind {
    /// Human-readable type name, used in validation messages
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldKind::UInt { .. } => "int",
            FieldKind::Bytes => "bytes",
            FieldKind::Str => "str",
        }
    }

    /// Largest value an integer field of this kind can hold
    fn max_value(&self) -> Option<u64> {
        match self {
            FieldKind::UInt { bits } if *bits >= 64 => Some(u64::MAX),
            FieldKind::UInt { bits } => Some((1u64 << bits) - 1),
            _ => None,
        }
    }
}

/// Value held by a packet field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Int(u64),
    Bytes(Vec<u8>),
    Str(String),
}

impl FieldValue {
    /// Type name of the value (mirrors [`FieldKind::type_name`])
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Int(_) => "int",
            FieldValue::Bytes(_) => "bytes",
            FieldValue::Str(_) => "str",
        }
    }

    pub fn as_int(&self) -> Option<u64> {
        match self {
            FieldValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Quoted representation, parseable back by [`parse_field_value`]
    pub fn repr(&self) -> String {
        match self {
            FieldValue::Int(v) => v.to_string(),
            FieldValue::Bytes(b) => format!("b\"{}\"", escape_bytes(b)),
            FieldValue::Str(s) => format!("\"{}\"", s.replace('"', "\\\"")),
        }
    }
}

impl fmt::Display for FieldValue {
    /// Unquoted representation used in list columns
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Int(v) => write!(f, "{}", v),
            FieldValue::Bytes(b) => write!(f, "{}", escape_bytes(b)),
            FieldValue::Str(s) => write!(f, "{}", s),
        }
    }
}

/// Declaration of one field on a packet class
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDecl {
    pub name: String,
    pub kind: FieldKind,
    pub default: FieldValue,
}

impl FieldDecl {
    /// Unsigned integer field defaulting to zero
    pub fn uint(name: impl Into<String>, bits: u8) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::UInt { bits },
            default: FieldValue::Int(0),
        }
    }

    /// Byte-string field defaulting to empty
    pub fn bytes(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Bytes,
            default: FieldValue::Bytes(Vec::new()),
        }
    }

    /// Text field defaulting to empty
    pub fn string(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Str,
            default: FieldValue::Str(String::new()),
        }
    }

    /// Check that `value` can be stored in this field
    pub fn check(&self, value: &FieldValue) -> Result<(), PacketError> {
        let invalid = |reason: String| PacketError::InvalidValue {
            field: self.name.clone(),
            reason,
        };
        match (&self.kind, value) {
            (FieldKind::UInt { .. }, FieldValue::Int(v)) => {
                let max = self.kind.max_value().unwrap_or(u64::MAX);
                if *v > max {
                    return Err(invalid(format!("{} exceeds maximum {}", v, max)));
                }
                Ok(())
            }
            (FieldKind::Bytes, FieldValue::Bytes(_)) => Ok(()),
            (FieldKind::Str, FieldValue::Str(_)) => Ok(()),
            (kind, value) => Err(invalid(format!(
                "given type: {}, expected type: {}",
                value.type_name(),
                kind.type_name()
            ))),
        }
    }
}

/// A packet type: a name and its ordered field declarations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketClass {
    pub name: String,
    pub fields: Vec<FieldDecl>,
}

impl PacketClass {
    pub fn new(name: impl Into<String>, fields: Vec<FieldDecl>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }

    /// Position of a field, matched case-insensitively
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields
            .iter()
            .position(|f| f.name.eq_ignore_ascii_case(name))
    }

    /// Create a packet of this class with every field at its default
    pub fn instantiate(self: &Arc<Self>) -> Packet {
        Packet::new(Arc::clone(self))
    }
}

/// A single packet
#[derive(Debug, Clone, PartialEq)]
pub struct Packet {
    class: Arc<PacketClass>,
    values: Vec<FieldValue>,
    payload: Vec<u8>,
    /// Capture or arrival time in seconds since the Unix epoch
    time: f64,
}

impl Packet {
    /// Create a packet with default field values
    pub fn new(class: Arc<PacketClass>) -> Self {
        let values = class.fields.iter().map(|f| f.default.clone()).collect();
        Self {
            class,
            values,
            payload: Vec::new(),
            time: 0.0,
        }
    }

    /// Builder: set the capture time
    pub fn with_time(mut self, time: f64) -> Self {
        self.time = time;
        self
    }

    /// Builder: set the payload bytes
    pub fn with_payload(mut self, payload: impl Into<Vec<u8>>) -> Self {
        self.payload = payload.into();
        self
    }

    /// Builder: set a field, validating the value
    pub fn with_field(mut self, name: &str, value: FieldValue) -> Result<Self, PacketError> {
        self.set_field(name, value)?;
        Ok(self)
    }

    pub fn class(&self) -> &Arc<PacketClass> {
        &self.class
    }

    pub fn class_name(&self) -> &str {
        &self.class.name
    }

    /// Whether this packet is of the given class
    pub fn is_instance_of(&self, class: &PacketClass) -> bool {
        self.class.name == class.name
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn set_time(&mut self, time: f64) {
        self.time = time;
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn set_payload(&mut self, payload: Vec<u8>) {
        self.payload = payload;
    }

    /// Look up a field value by name (case-insensitive)
    pub fn field(&self, name: &str) -> Result<&FieldValue, PacketError> {
        self.class
            .field_index(name)
            .map(|i| &self.values[i])
            .ok_or_else(|| self.missing(name))
    }

    /// Declaration of a field by name (case-insensitive)
    pub fn field_decl(&self, name: &str) -> Result<&FieldDecl, PacketError> {
        self.class
            .field_index(name)
            .map(|i| &self.class.fields[i])
            .ok_or_else(|| self.missing(name))
    }

    /// Iterate over declared fields with their current values
    pub fn fields(&self) -> impl Iterator<Item = (&FieldDecl, &FieldValue)> {
        self.class.fields.iter().zip(self.values.iter())
    }

    /// Set a field value; the packet is left untouched if validation fails
    pub fn set_field(&mut self, name: &str, value: FieldValue) -> Result<(), PacketError> {
        let index = self
            .class
            .field_index(name)
            .ok_or_else(|| self.missing(name))?;
        self.class.fields[index].check(&value)?;
        self.values[index] = value;
        Ok(())
    }

    /// Serialize fields and payload to wire bytes
    pub fn build(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for (decl, value) in self.fields() {
            match (&decl.kind, value) {
                (FieldKind::UInt { bits }, FieldValue::Int(v)) => {
                    let width = (usize::from(*bits) + 7) / 8;
                    let bytes = v.to_be_bytes();
                    out.extend_from_slice(&bytes[bytes.len() - width.min(8)..]);
                }
                (_, FieldValue::Bytes(b)) => out.extend_from_slice(b),
                (_, FieldValue::Str(s)) => out.extend_from_slice(s.as_bytes()),
                (_, FieldValue::Int(v)) => out.extend_from_slice(&v.to_be_bytes()),
            }
        }
        out.extend_from_slice(&self.payload);
        out
    }

    /// Length of the built packet in bytes
    pub fn wire_len(&self) -> usize {
        self.build().len()
    }

    /// Payload rendered as escaped text (empty when there is no payload)
    pub fn payload_repr(&self) -> String {
        escape_bytes(&self.payload)
    }

    /// Full one-line textual representation
    pub fn repr(&self) -> String {
        let fields: Vec<String> = self
            .fields()
            .map(|(decl, value)| format!("{}={}", decl.name, value.repr()))
            .collect();
        let mut out = format!("<{}", self.class.name);
        if !fields.is_empty() {
            out.push_str("  ");
            out.push_str(&fields.join(" "));
        }
        if !self.payload.is_empty() {
            out.push_str(&format!(" |b\"{}\"", self.payload_repr()));
        }
        out.push('>');
        out
    }

    /// Multi-line field listing, `name = value` per line plus the payload
    pub fn show_lines(&self) -> Vec<String> {
        let width = self
            .class
            .fields
            .iter()
            .map(|f| f.name.len())
            .max()
            .unwrap_or(0);
        let mut lines = vec![format!("###[ {} ]###", self.class.name)];
        lines.extend(
            self.fields()
                .map(|(decl, value)| format!("  {:<width$} = {}", decl.name, value.repr())),
        );
        if !self.payload.is_empty() {
            lines.push(format!("  {:<width$} = b\"{}\"", "payload", self.payload_repr()));
        }
        lines
    }

    fn missing(&self, name: &str) -> PacketError {
        PacketError::MissingField {
            class: self.class.name.clone(),
            field: name.to_string(),
        }
    }
}

/// Parse user text into a value for the given field
///
/// Integers accept decimal or `0x` hex; byte fields accept `b"..."`, a quoted
/// string or bare text; text fields accept a quoted string or bare text.
pub fn parse_field_value(decl: &FieldDecl, text: &str) -> Result<FieldValue, PacketError> {
    let text = text.trim();
    let invalid = |reason: String| PacketError::InvalidValue {
        field: decl.name.clone(),
        reason,
    };
    let value = match decl.kind {
        FieldKind::UInt { .. } => literal::parse_int(text)
            .map(FieldValue::Int)
            .ok_or_else(|| {
                invalid(format!(
                    "given '{}', expected type: {}",
                    text,
                    decl.kind.type_name()
                ))
            })?,
        FieldKind::Bytes => {
            let body = literal::strip_bytes_quotes(text)
                .or_else(|| literal::strip_quotes(text))
                .unwrap_or(text);
            FieldValue::Bytes(unescape(body).map_err(invalid)?)
        }
        FieldKind::Str => {
            let body = literal::strip_quotes(text).unwrap_or(text);
            let bytes = unescape(body).map_err(invalid)?;
            FieldValue::Str(String::from_utf8_lossy(&bytes).into_owned())
        }
    };
    decl.check(&value)?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn udp() -> Arc<PacketClass> {
        ClassCatalog::builtin().get("UDP").unwrap()
    }

    #[test]
    fn test_new_packet_has_defaults() {
        let packet = udp().instantiate();
        assert_eq!(packet.field("sport").unwrap(), &FieldValue::Int(0));
        assert!(packet.payload().is_empty());
    }

    #[test]
    fn test_field_lookup_is_case_insensitive() {
        let packet = udp()
            .instantiate()
            .with_field("SPORT", FieldValue::Int(1234))
            .unwrap();
        assert_eq!(packet.field("sport").unwrap().as_int(), Some(1234));
    }

    #[test]
    fn test_missing_field() {
        let packet = udp().instantiate();
        let err = packet.field("identifier").unwrap_err();
        assert!(matches!(err, PacketError::MissingField { .. }));
    }

    #[test]
    fn test_set_field_out_of_range_keeps_old_value() {
        let mut packet = udp()
            .instantiate()
            .with_field("dport", FieldValue::Int(53))
            .unwrap();
        assert!(packet.set_field("dport", FieldValue::Int(70_000)).is_err());
        assert_eq!(packet.field("dport").unwrap().as_int(), Some(53));
    }

    #[test]
    fn test_set_field_wrong_type() {
        let mut packet = udp().instantiate();
        let err = packet
            .set_field("sport", FieldValue::Str("abc".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("expected type: int"));
    }

    #[test]
    fn test_build_big_endian() {
        let packet = udp()
            .instantiate()
            .with_field("sport", FieldValue::Int(0x1234))
            .unwrap()
            .with_field("dport", FieldValue::Int(53))
            .unwrap()
            .with_payload(b"hi".to_vec());
        let bytes = packet.build();
        assert_eq!(&bytes[..4], &[0x12, 0x34, 0x00, 0x35]);
        assert_eq!(&bytes[8..], b"hi");
        assert_eq!(packet.wire_len(), 10);
    }

    #[test]
    fn test_repr() {
        let packet = udp()
            .instantiate()
            .with_field("sport", FieldValue::Int(1))
            .unwrap()
            .with_payload(b"\x01a".to_vec());
        assert_eq!(
            packet.repr(),
            "<UDP  sport=1 dport=0 len=0 chksum=0 |b\"\\x01a\">"
        );
    }

    #[test]
    fn test_show_lines() {
        let packet = udp()
            .instantiate()
            .with_field("sport", FieldValue::Int(7))
            .unwrap();
        let lines = packet.show_lines();
        assert_eq!(lines[0], "###[ UDP ]###");
        assert_eq!(lines[1], "  sport  = 7");
        assert_eq!(lines.len(), 5);
    }

    #[test]
    fn test_parse_field_value_int() {
        let decl = FieldDecl::uint("sport", 16);
        assert_eq!(parse_field_value(&decl, " 80 ").unwrap(), FieldValue::Int(80));
        assert_eq!(parse_field_value(&decl, "0x50").unwrap(), FieldValue::Int(80));
        assert!(parse_field_value(&decl, "abc").is_err());
        assert!(parse_field_value(&decl, "65536").is_err());
    }

    #[test]
    fn test_parse_field_value_bytes() {
        let decl = FieldDecl::bytes("load");
        assert_eq!(
            parse_field_value(&decl, "b\"\\xde\\xad\"").unwrap(),
            FieldValue::Bytes(vec![0xde, 0xad])
        );
        assert_eq!(
            parse_field_value(&decl, "hello").unwrap(),
            FieldValue::Bytes(b"hello".to_vec())
        );
    }

    #[test]
    fn test_parse_field_value_str() {
        let decl = FieldDecl::string("name");
        assert_eq!(
            parse_field_value(&decl, "\"a b\"").unwrap(),
            FieldValue::Str("a b".to_string())
        );
    }

    #[test]
    fn test_value_display_and_repr() {
        let bytes = FieldValue::Bytes(vec![b'a', 0x00]);
        assert_eq!(bytes.to_string(), "a\\x00");
        assert_eq!(bytes.repr(), "b\"a\\x00\"");
        assert_eq!(FieldValue::Int(7).repr(), "7");
    }
}
