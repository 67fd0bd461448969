//! Cleanup of free-form model output before a strict JSON parse.

use serde_json::{Deserializer, Value};

/// Returns the part of `raw` most likely to be the JSON document: the body of
/// the first Markdown code fence if there is one, then the first complete JSON
/// object or array in it. Prose before or after that value is dropped; text
/// with no such value comes back trimmed so the caller's parse reports it.
pub fn json_payload(raw: &str) -> &str {
    let mut text = raw.trim();

    if let Some(start) = text.find("```") {
        let after = &text[start + 3..];
        // Skip an info string such as `json`.
        let body = match after.find('\n') {
            Some(nl) if after[..nl].trim().chars().all(|c| c.is_ascii_alphanumeric()) => &after[nl + 1..],
            _ => after,
        };
        text = match body.find("```") {
            Some(end) => &body[..end],
            None => body,
        }
        .trim();
    }

    for (start, _) in text.match_indices(|c: char| c == '{' || c == '[') {
        let candidate = &text[start..];
        let mut values = Deserializer::from_str(candidate).into_iter::<Value>();
        if let Some(Ok(_)) = values.next() {
            return &candidate[..values.byte_offset()];
        }
    }
    text
}

/// Collapses runs of whitespace (line breaks included) into single spaces.
pub fn collapse_whitespace(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Caps `raw` at `max_chars`, appending an ellipsis when cut.
pub fn truncate_chars(raw: &str, max_chars: usize) -> String {
    if raw.chars().count() <= max_chars {
        return raw.to_string();
    }
    let mut out: String = raw.chars().take(max_chars).collect();
    out.push_str("...");
    out
}
