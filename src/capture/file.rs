//! Packet files
//!
//! A packet file is a JSON array of records:
//!
//! ```json
//! [
//!   { "class": "UDP", "time": 1700000000.25,
//!     "fields": { "sport": 1234, "dport": 53 },
//!     "payload": "b\"\\x00\\x01\"" }
//! ]
//! ```
//!
//! Field values are JSON numbers for integer fields, strings in the same
//! notation the edit view accepts, or arrays of byte values.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::CaptureError;
use crate::packet::literal::{strip_bytes_quotes, strip_quotes, unescape};
use crate::packet::{parse_field_value, ClassCatalog, FieldValue, Packet, PacketError};

#[derive(Debug, Serialize, Deserialize)]
struct PacketRecord {
    class: String,
    #[serde(default)]
    time: f64,
    #[serde(default)]
    fields: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    payload: Option<Value>,
}

/// Load packets from a JSON packet file
pub fn load_packets(path: &Path, catalog: &ClassCatalog) -> Result<Vec<Packet>, CaptureError> {
    let content = std::fs::read_to_string(path)?;
    let records: Vec<PacketRecord> =
        serde_json::from_str(&content).map_err(|e| CaptureError::Format(e.to_string()))?;

    let packets = records
        .into_iter()
        .enumerate()
        .map(|(i, record)| {
            to_packet(record, catalog)
                .map_err(|e| CaptureError::Format(format!("record {}: {}", i, e)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    tracing::info!("Loaded {} packets from {}", packets.len(), path.display());
    Ok(packets)
}

/// Write packets as a JSON packet file
pub fn save_packets(path: &Path, packets: &[Packet]) -> Result<(), CaptureError> {
    let records: Vec<PacketRecord> = packets.iter().map(to_record).collect();
    let content =
        serde_json::to_string_pretty(&records).map_err(|e| CaptureError::Format(e.to_string()))?;
    std::fs::write(path, content)?;
    tracing::info!("Saved {} packets to {}", packets.len(), path.display());
    Ok(())
}

fn to_packet(record: PacketRecord, catalog: &ClassCatalog) -> Result<Packet, PacketError> {
    let mut packet = catalog.require(&record.class)?.instantiate().with_time(record.time);

    for (name, json) in &record.fields {
        let decl = packet.field_decl(name)?.clone();
        let value = match json {
            Value::Number(n) => FieldValue::Int(n.as_u64().ok_or_else(|| {
                PacketError::InvalidValue {
                    field: name.clone(),
                    reason: format!("{} is not an unsigned integer", n),
                }
            })?),
            Value::String(text) => parse_field_value(&decl, text)?,
            Value::Array(_) => FieldValue::Bytes(byte_array(name, json)?),
            other => {
                return Err(PacketError::InvalidValue {
                    field: name.clone(),
                    reason: format!("unsupported JSON value {}", other),
                })
            }
        };
        packet.set_field(name, value)?;
    }

    if let Some(payload) = &record.payload {
        let bytes = match payload {
            Value::String(text) => {
                let body = strip_bytes_quotes(text)
                    .or_else(|| strip_quotes(text))
                    .unwrap_or(text);
                unescape(body).map_err(|reason| PacketError::InvalidValue {
                    field: "payload".to_string(),
                    reason,
                })?
            }
            other => byte_array("payload", other)?,
        };
        packet.set_payload(bytes);
    }

    Ok(packet)
}

fn byte_array(field: &str, json: &Value) -> Result<Vec<u8>, PacketError> {
    let invalid = || PacketError::InvalidValue {
        field: field.to_string(),
        reason: "expected an array of byte values".to_string(),
    };
    json.as_array()
        .ok_or_else(invalid)?
        .iter()
        .map(|v| {
            v.as_u64()
                .and_then(|b| u8::try_from(b).ok())
                .ok_or_else(invalid)
        })
        .collect()
}

fn to_record(packet: &Packet) -> PacketRecord {
    let fields = packet
        .fields()
        .map(|(decl, value)| {
            let json = match value {
                FieldValue::Int(v) => Value::from(*v),
                FieldValue::Bytes(_) => Value::from(value.repr()),
                FieldValue::Str(s) => Value::from(s.clone()),
            };
            (decl.name.clone(), json)
        })
        .collect();
    PacketRecord {
        class: packet.class_name().to_string(),
        time: packet.time(),
        fields,
        payload: (!packet.payload().is_empty())
            .then(|| Value::from(format!("b\"{}\"", packet.payload_repr()))),
    }
}
