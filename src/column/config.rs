//! Per-class column configuration
//!
//! Holds the column layouts registered for specific packet classes. The
//! process-wide defaults are built here; user entries from `config.toml` are
//! layered on top once at startup and the result is read-only afterwards.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::Column;
use crate::packet::FieldValue;

/// How a configured column renders its field value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueFormat {
    /// Integers in decimal, bytes escaped without quotes
    #[default]
    Plain,
    /// Integers as upper-case hex, zero-padded to three digits
    Hex,
    /// Quoted representation (`b"..."` for bytes)
    Repr,
}

impl ValueFormat {
    pub fn apply(&self, value: &FieldValue) -> String {
        match (self, value) {
            (ValueFormat::Hex, FieldValue::Int(v)) => format!("{:03X}", v),
            (ValueFormat::Repr, v) => v.repr(),
            (_, v) => v.to_string(),
        }
    }
}

/// A column as written in the configuration file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    /// Header name
    pub name: String,
    /// Display width in characters
    pub width: usize,
    /// Packet field the value is read from
    pub field: String,
    #[serde(default)]
    pub format: ValueFormat,
}

impl ColumnSpec {
    pub fn new(name: &str, width: usize, field: &str, format: ValueFormat) -> Self {
        Self {
            name: name.to_string(),
            width,
            field: field.to_string(),
            format,
        }
    }

    pub fn to_column(&self) -> Column {
        Column::formatted(self.name.clone(), self.width, self.field.clone(), self.format)
    }
}

/// Column layouts keyed by packet class name (case-insensitive)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnConfig {
    by_class: BTreeMap<String, Vec<ColumnSpec>>,
}

impl Default for ColumnConfig {
    /// Built-in layouts (ISOTP)
    fn default() -> Self {
        let mut config = Self::empty();
        config.register(
            "ISOTP",
            vec![
                ColumnSpec::new("SRC", 6, "src", ValueFormat::Hex),
                ColumnSpec::new("DST", 6, "dst", ValueFormat::Hex),
                ColumnSpec::new("DATA", 100, "data", ValueFormat::Repr),
            ],
        );
        config
    }
}

impl ColumnConfig {
    /// Configuration without any registered layout
    pub fn empty() -> Self {
        Self {
            by_class: BTreeMap::new(),
        }
    }

    /// Register (or replace) the layout of a class
    pub fn register(&mut self, class: &str, columns: Vec<ColumnSpec>) {
        self.by_class.insert(class.to_ascii_lowercase(), columns);
    }

    /// Layer user layouts over these; user entries replace built-in ones
    pub fn with_overrides(mut self, overrides: &BTreeMap<String, Vec<ColumnSpec>>) -> Self {
        for (class, columns) in overrides {
            self.register(class, columns.clone());
        }
        self
    }

    /// Layout registered for a class, if any
    pub fn get(&self, class: &str) -> Option<&[ColumnSpec]> {
        self.by_class
            .get(&class.to_ascii_lowercase())
            .map(Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_has_isotp() {
        let config = ColumnConfig::default();
        let isotp = config.get("isotp").unwrap();
        assert_eq!(isotp.len(), 3);
        assert_eq!(isotp[0].format, ValueFormat::Hex);
        assert!(config.get("UDP").is_none());
    }

    #[test]
    fn test_overrides_replace_defaults() {
        let mut overrides = BTreeMap::new();
        overrides.insert(
            "ISOTP".to_string(),
            vec![ColumnSpec::new("S", 4, "src", ValueFormat::Plain)],
        );
        let config = ColumnConfig::default().with_overrides(&overrides);
        assert_eq!(config.get("ISOTP").unwrap().len(), 1);
    }

    #[test]
    fn test_value_format() {
        assert_eq!(ValueFormat::Hex.apply(&FieldValue::Int(0x7e0)), "7E0");
        assert_eq!(ValueFormat::Hex.apply(&FieldValue::Int(1)), "001");
        assert_eq!(
            ValueFormat::Repr.apply(&FieldValue::Bytes(vec![1])),
            "b\"\\x01\""
        );
        assert_eq!(ValueFormat::Plain.apply(&FieldValue::Int(10)), "10");
    }

    #[test]
    fn test_column_spec_toml() {
        let spec: ColumnSpec =
            toml::from_str("name = \"SRC\"\nwidth = 6\nfield = \"src\"\nformat = \"hex\"")
                .unwrap();
        assert_eq!(spec, ColumnSpec::new("SRC", 6, "src", ValueFormat::Hex));

        let spec: ColumnSpec = toml::from_str("name = \"A\"\nwidth = 3\nfield = \"a\"").unwrap();
        assert_eq!(spec.format, ValueFormat::Plain);
    }
}
