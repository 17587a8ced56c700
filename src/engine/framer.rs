use crate::model::RawResponse;
use std::collections::BTreeMap;

const HEAD_END: &str = "\r\n\r\n";

/// Splits a complete response into status line, headers and body.
///
/// Never fails: input without a blank line is treated as head only, and
/// header lines without a colon are skipped.
pub fn parse_response(raw: &str) -> RawResponse {
    let (head, body) = match raw.find(HEAD_END) {
        Some(pos) => (&raw[..pos], &raw[pos + HEAD_END.len()..]),
        None => (raw, ""),
    };

    let mut lines = head.split("\r\n");
    let status_line = lines.next().unwrap_or_default().to_string();

    let mut headers = BTreeMap::new();
    for line in lines {
        if let Some((name, value)) = line.split_once(':') {
            headers.insert(name.trim().to_lowercase(), value.trim().to_string());
        }
    }

    RawResponse {
        status_line,
        headers,
        body: body.to_string(),
    }
}
