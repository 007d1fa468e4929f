//! JSON decoding helpers for controller responses.

use anyhow::Result;

/// Decode a JSON body, attaching the serde path and a marked snippet of the
/// offending line to any error, so malformed controller payloads are
/// diagnosable from logs alone.
pub fn decode_with_path<T: serde::de::DeserializeOwned>(body: &str) -> Result<T> {
    let de = &mut serde_json::Deserializer::from_str(body);
    match serde_path_to_error::deserialize(de) {
        Ok(value) => Ok(value),
        Err(err) => {
            let (line, column) = (err.inner().line(), err.inner().column());
            let detail = err.inner().to_string();
            let path = err.path().to_string();
            let snippet = snippet_at(body, line, column);

            if path.is_empty() || path == "." {
                Err(anyhow::anyhow!("{detail}\n{snippet}"))
            } else {
                Err(anyhow::anyhow!("at '{path}': {detail}\n{snippet}"))
            }
        }
    }
}

/// A short window of the offending line with a caret under the error column.
fn snippet_at(body: &str, line: usize, column: usize) -> String {
    const WINDOW: usize = 24;

    let text = body.lines().nth(line.saturating_sub(1)).unwrap_or("");
    if text.is_empty() {
        return "(empty line)".to_string();
    }

    // column is 1-based; clamp into the line and widen to char boundaries.
    let err_idx = column.saturating_sub(1).min(text.len());
    let mut start = err_idx.saturating_sub(WINDOW / 2);
    while start > 0 && !text.is_char_boundary(start) {
        start -= 1;
    }
    let mut end = (err_idx + WINDOW / 2).min(text.len());
    while end < text.len() && !text.is_char_boundary(end) {
        end += 1;
    }

    let caret = " ".repeat(err_idx - start) + "^";
    format!("...{}...\n   {caret}", &text[start..end])
}
