//! Hexdump rendering

/// Bytes shown per hexdump line
const BYTES_PER_LINE: usize = 16;

/// Render bytes as hexdump lines: offset, hex bytes and printable ASCII
///
/// ```
/// # use packetview::packet::hexdump;
/// let lines = hexdump(b"AB");
/// assert_eq!(lines[0], format!("0000  41 42{}  AB", " ".repeat(42)));
/// ```
pub fn hexdump(bytes: &[u8]) -> Vec<String> {
    bytes
        .chunks(BYTES_PER_LINE)
        .enumerate()
        .map(|(i, chunk)| {
            let hex: Vec<String> = chunk.iter().map(|b| format!("{:02X}", b)).collect();
            let ascii: String = chunk
                .iter()
                .map(|&b| if (0x20..0x7f).contains(&b) { b as char } else { '.' })
                .collect();
            format!(
                "{:04x}  {:<width$}  {}",
                i * BYTES_PER_LINE,
                hex.join(" "),
                ascii,
                width = BYTES_PER_LINE * 3 - 1
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hexdump_empty() {
        assert!(hexdump(&[]).is_empty());
    }

    #[test]
    fn test_hexdump_line_split() {
        let data: Vec<u8> = (0u8..20).collect();
        let lines = hexdump(&data);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("0000  00 01 02"));
        assert!(lines[1].starts_with("0010  10 11 12 13"));
        assert!(lines[0].ends_with("................"));
    }
}
