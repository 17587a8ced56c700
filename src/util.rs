/// Returns at most the first `max_chars` characters of `text`.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Encodes protocol names in the length-prefixed ALPN wire format.
pub fn alpn_wire_format(protocols: &[String]) -> Vec<u8> {
    let mut wire = Vec::new();
    for proto in protocols {
        let bytes = proto.as_bytes();
        let Ok(len) = u8::try_from(bytes.len()) else {
            continue;
        };
        if len == 0 {
            continue;
        }
        wire.push(len);
        wire.extend_from_slice(bytes);
    }
    wire
}
