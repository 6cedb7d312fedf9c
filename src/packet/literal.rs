//! Literal parsing shared by field edits, filters and packet crafting
//!
//! Supports decimal and `0x` hex integers, `"..."`/`'...'` strings and
//! `b"..."` byte strings with `\xNN`, `\n`, `\r`, `\t`, `\0` and `\\` escapes.

use super::FieldValue;

/// Parse an unsigned integer in decimal or `0x` hex notation
pub fn parse_int(text: &str) -> Option<u64> {
    let text = text.trim();
    if let Some(hex) = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
    {
        u64::from_str_radix(hex, 16).ok()
    } else {
        text.parse().ok()
    }
}

/// Inner text of a `"..."` or `'...'` literal
pub fn strip_quotes(text: &str) -> Option<&str> {
    let text = text.trim();
    if text.len() < 2 {
        return None;
    }
    let first = text.chars().next()?;
    if (first == '"' || first == '\'') && text.ends_with(first) {
        Some(&text[1..text.len() - 1])
    } else {
        None
    }
}

/// Inner text of a `b"..."` or `b'...'` literal
pub fn strip_bytes_quotes(text: &str) -> Option<&str> {
    text.trim().strip_prefix('b').and_then(strip_quotes)
}

/// Parse a standalone literal: integer, string or byte string
pub fn parse_literal(text: &str) -> Option<FieldValue> {
    let text = text.trim();
    if let Some(v) = parse_int(text) {
        return Some(FieldValue::Int(v));
    }
    if let Some(body) = strip_bytes_quotes(text) {
        return unescape(body).ok().map(FieldValue::Bytes);
    }
    if let Some(body) = strip_quotes(text) {
        return unescape(body)
            .ok()
            .map(|b| FieldValue::Str(String::from_utf8_lossy(&b).into_owned()));
    }
    None
}

/// Resolve backslash escapes into raw bytes
pub fn unescape(text: &str) -> Result<Vec<u8>, String> {
    let mut out = Vec::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            let mut buf = [0u8; 4];
            out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            continue;
        }
        match chars.next() {
            Some('x') => {
                let hex: String = chars.by_ref().take(2).collect();
                let byte = u8::from_str_radix(&hex, 16)
                    .map_err(|_| format!("invalid escape '\\x{}'", hex))?;
                out.push(byte);
            }
            Some('n') => out.push(b'\n'),
            Some('r') => out.push(b'\r'),
            Some('t') => out.push(b'\t'),
            Some('0') => out.push(0),
            Some(c @ ('\\' | '"' | '\'')) => out.push(c as u8),
            Some(other) => return Err(format!("unknown escape '\\{}'", other)),
            None => return Err("trailing backslash".to_string()),
        }
    }
    Ok(out)
}

/// Render bytes as printable ASCII, escaping everything else as `\xNN`
pub fn escape_bytes(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for &b in bytes {
        match b {
            b'\\' => out.push_str("\\\\"),
            b'"' => out.push_str("\\\""),
            0x20..=0x7e => out.push(b as char),
            _ => out.push_str(&format!("\\x{:02x}", b)),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_int() {
        assert_eq!(parse_int("42"), Some(42));
        assert_eq!(parse_int("0x2A"), Some(42));
        assert_eq!(parse_int("-1"), None);
        assert_eq!(parse_int("forty"), None);
    }

    #[test]
    fn test_parse_literal() {
        assert_eq!(parse_literal("7"), Some(FieldValue::Int(7)));
        assert_eq!(
            parse_literal("'abc'"),
            Some(FieldValue::Str("abc".to_string()))
        );
        assert_eq!(
            parse_literal("b\"\\x00\\xff\""),
            Some(FieldValue::Bytes(vec![0x00, 0xff]))
        );
        assert_eq!(parse_literal("abc"), None);
    }

    #[test]
    fn test_unescape_rejects_bad_escape() {
        assert!(unescape("\\xzz").is_err());
        assert!(unescape("\\q").is_err());
        assert!(unescape("abc\\").is_err());
    }

    #[test]
    fn test_escape_roundtrips_through_unescape() {
        let raw = vec![0x00, b'a', b'"', b'\\', 0x7f];
        assert_eq!(unescape(&escape_bytes(&raw)).unwrap(), raw);
    }
}
