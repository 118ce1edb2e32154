const BYTES_PER_LINE: usize = 16;
const BYTES_PER_CHUNK: usize = 4;

/// Renders `data` as hex dump lines.
///
/// Each line holds a 4 byte address, sixteen bytes in space-separated 4 byte chunks, and the
/// printable ASCII representation of the same bytes enclosed in `|` characters:
///
/// ```text
/// 00000000:  01020304 05060708 090A0B0C 0D0E0F10  |................|
/// ```
pub fn hexdump(data: &[u8]) -> Vec<String> {
    let num_chunks = BYTES_PER_LINE.div_ceil(BYTES_PER_CHUNK);
    let chars_per_line = BYTES_PER_LINE * 2 + num_chunks - 1;

    data.chunks(BYTES_PER_LINE)
        .enumerate()
        .map(|(line_no, line)| {
            let mut raw = String::with_capacity(chars_per_line);
            let mut text = String::with_capacity(BYTES_PER_LINE);

            for (j, b) in line.iter().enumerate() {
                if j != 0 && j % BYTES_PER_CHUNK == 0 {
                    raw.push(' ');
                }
                raw.push_str(&format!("{:02X}", b));
                text.push(if (0x20..0x7f).contains(b) { *b as char } else { '.' });
            }

            format!(
                "{:08X}:  {:<width$}  |{:<text_width$}|",
                line_no * BYTES_PER_LINE,
                raw,
                text,
                width = chars_per_line,
                text_width = BYTES_PER_LINE
            )
        })
        .collect()
}

/// The hex dump as a JSON array of lines, the opaque rendering for undecodable payloads.
pub fn hexdump_json(data: &[u8]) -> serde_json::Value {
    serde_json::Value::from(hexdump(data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_full_line() {
        let data: Vec<u8> = (0x41..0x51).collect();
        assert_eq!(
            hexdump(&data),
            vec!["00000000:  41424344 45464748 494A4B4C 4D4E4F50  |ABCDEFGHIJKLMNOP|"]
        );
    }

    #[test]
    fn test_partial_last_line_is_padded() {
        let data: Vec<u8> = (0..18).collect();
        let lines = hexdump(&data);

        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[1],
            "00000010:  1011                                 |..              |"
        );
    }

    #[test]
    fn test_empty_input() {
        assert!(hexdump(&[]).is_empty());
    }
}
