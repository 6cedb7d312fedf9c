//! Packet crafting from a one-line text expression
//!
//! ```text
//! UDP(sport=1234, dport=53, payload=b"\x00\x01")
//! CAN(identifier=0x7e0, data=req)
//! ```
//!
//! Class names resolve through the [`CraftContext`] catalog. A value is either
//! a literal accepted by [`parse_field_value`] or the name of a variable bound
//! in the context. The pseudo field `payload` sets the bytes after the
//! declared fields.

use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;

use crate::packet::literal::{strip_bytes_quotes, strip_quotes, unescape};
use crate::packet::{parse_field_value, ClassCatalog, FieldValue, Packet, PacketError};

/// Errors raised while crafting a packet
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CraftError {
    #[error("syntax error: {0}")]
    Syntax(String),
    #[error(transparent)]
    Packet(#[from] PacketError),
}

/// Symbols available to crafted expressions
#[derive(Debug, Clone, Default)]
pub struct CraftContext {
    catalog: Arc<ClassCatalog>,
    variables: BTreeMap<String, FieldValue>,
}

impl CraftContext {
    pub fn new(catalog: Arc<ClassCatalog>) -> Self {
        Self {
            catalog,
            variables: BTreeMap::new(),
        }
    }

    /// Bind a variable usable as a field value
    pub fn bind(mut self, name: impl Into<String>, value: FieldValue) -> Self {
        self.variables.insert(name.into(), value);
        self
    }

    pub fn catalog(&self) -> &ClassCatalog {
        &self.catalog
    }

    pub fn variable(&self, name: &str) -> Option<&FieldValue> {
        self.variables.get(name)
    }

    /// Build a packet from `text`
    pub fn craft(&self, text: &str) -> Result<Packet, CraftError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(CraftError::Syntax("empty expression".to_string()));
        }

        let (class_name, args) = match text.find('(') {
            Some(open) => {
                let body = text[open + 1..]
                    .strip_suffix(')')
                    .ok_or_else(|| CraftError::Syntax("missing ')'".to_string()))?;
                (text[..open].trim(), body)
            }
            None => (text, ""),
        };
        if class_name.is_empty() || !class_name.chars().all(|c| c.is_alphanumeric() || c == '_') {
            return Err(CraftError::Syntax(format!("invalid class name '{}'", class_name)));
        }

        let mut packet = self.catalog.require(class_name)?.instantiate();
        for arg in split_args(args)? {
            let (key, value) = arg
                .split_once('=')
                .ok_or_else(|| CraftError::Syntax(format!("expected key=value, got '{}'", arg)))?;
            self.apply(&mut packet, key.trim(), value.trim())?;
        }
        Ok(packet)
    }

    fn apply(&self, packet: &mut Packet, key: &str, text: &str) -> Result<(), CraftError> {
        let bound = self.variables.get(text);

        if packet.field_decl(key).is_err() && key.eq_ignore_ascii_case("payload") {
            let bytes = match bound {
                Some(FieldValue::Bytes(b)) => b.clone(),
                Some(FieldValue::Str(s)) => s.as_bytes().to_vec(),
                Some(other) => {
                    return Err(PacketError::InvalidValue {
                        field: "payload".to_string(),
                        reason: format!("given type: {}, expected type: bytes", other.type_name()),
                    }
                    .into())
                }
                None => {
                    let body = strip_bytes_quotes(text)
                        .or_else(|| strip_quotes(text))
                        .unwrap_or(text);
                    unescape(body).map_err(|reason| PacketError::InvalidValue {
                        field: "payload".to_string(),
                        reason,
                    })?
                }
            };
            packet.set_payload(bytes);
            return Ok(());
        }

        let decl = packet.field_decl(key)?.clone();
        let value = match bound {
            Some(value) => value.clone(),
            None => parse_field_value(&decl, text)?,
        };
        packet.set_field(key, value)?;
        Ok(())
    }
}

/// Split an argument list on top-level commas (commas in quotes are kept)
fn split_args(args: &str) -> Result<Vec<&str>, CraftError> {
    let mut parts = Vec::new();
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut start = 0;

    for (i, c) in args.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match (quote, c) {
            (Some(_), '\\') => escaped = true,
            (Some(q), c) if c == q => quote = None,
            (None, '"' | '\'') => quote = Some(c),
            (None, ',') => {
                parts.push(&args[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if quote.is_some() {
        return Err(CraftError::Syntax("unterminated string".to_string()));
    }
    parts.push(&args[start..]);

    Ok(parts
        .into_iter()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> CraftContext {
        CraftContext::new(Arc::new(ClassCatalog::builtin()))
    }

    #[test]
    fn test_craft_with_fields_and_payload() {
        let packet = context()
            .craft("UDP(sport=1234, dport=0x35, payload=b\"a,b\\x00\")")
            .unwrap();
        assert_eq!(packet.class_name(), "UDP");
        assert_eq!(packet.field("sport").unwrap().as_int(), Some(1234));
        assert_eq!(packet.field("dport").unwrap().as_int(), Some(53));
        assert_eq!(packet.payload(), b"a,b\x00");
    }

    #[test]
    fn test_craft_bare_class_uses_defaults() {
        let packet = context().craft("raw").unwrap();
        assert_eq!(packet.class_name(), "Raw");
        assert_eq!(packet.field("load").unwrap(), &FieldValue::Bytes(Vec::new()));

        let packet = context().craft("TCP()").unwrap();
        assert_eq!(packet.field("window").unwrap().as_int(), Some(0));
    }

    #[test]
    fn test_craft_with_bound_variable() {
        let ctx = context().bind("req", FieldValue::Bytes(vec![0x10, 0x03]));
        let packet = ctx.craft("ISOTP(dst=0x7e0, data=req)").unwrap();
        assert_eq!(packet.field("data").unwrap(), &FieldValue::Bytes(vec![0x10, 0x03]));
    }

    #[test]
    fn test_craft_errors() {
        let ctx = context();
        assert!(matches!(
            ctx.craft("Nope(a=1)").unwrap_err(),
            CraftError::Packet(PacketError::UnknownClass(_))
        ));
        assert!(matches!(
            ctx.craft("UDP(sport=1").unwrap_err(),
            CraftError::Syntax(_)
        ));
        assert!(matches!(
            ctx.craft("UDP(sport)").unwrap_err(),
            CraftError::Syntax(_)
        ));
        assert!(matches!(
            ctx.craft("UDP(sport=99999)").unwrap_err(),
            CraftError::Packet(PacketError::InvalidValue { .. })
        ));
        assert!(matches!(
            ctx.craft("UDP(foo=1)").unwrap_err(),
            CraftError::Packet(PacketError::MissingField { .. })
        ));
        assert!(ctx.craft("").is_err());
    }

    #[test]
    fn test_split_args_respects_quotes() {
        assert_eq!(
            split_args("a=1, b='x,y', c=\"q\\\"r,\"").unwrap(),
            vec!["a=1", "b='x,y'", "c=\"q\\\"r,\""]
        );
        assert!(split_args("a='x").is_err());
    }
}
