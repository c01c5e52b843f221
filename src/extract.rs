//! The extract module pulls the `output` field out of model responses,
//! including responses that are still streaming in and cut off mid-value.

use serde_json::Value;

use crate::constants::OUTPUT_MARKER;

/// Returns the value of the string property `output` of a JSON object.
///
/// Well-formed JSON is read strictly. Text that fails to parse is treated as a
/// truncated object and scanned instead: the value starts at the first quote
/// after the first `"output":` marker (ASCII case-insensitive) and ends at the
/// last quote in the text. Only `\n` and `\"` are decoded in the scanned value.
///
/// # Arguments
///
/// * `text` - A complete JSON object or any prefix of one
///
/// # Returns
///
/// The `output` value, or `None` when the text is blank, parses without a string
/// `output` property, or gives the scan no closing quote to stop at.
pub fn extract_output(text: &str) -> Option<String> {
    if text.trim().is_empty() {
        return None;
    }

    match serde_json::from_str::<Value>(text) {
        Ok(value) => value
            .get("output")
            .and_then(Value::as_str)
            .map(str::to_owned),
        Err(_) => scan_output(text),
    }
}

/// Scans unparsable text for the `output` value.
fn scan_output(text: &str) -> Option<String> {
    // ASCII lowercasing keeps byte offsets aligned with `text`.
    let marker_at = text.to_ascii_lowercase().find(OUTPUT_MARKER)?;
    let rest = text.get(marker_at + OUTPUT_MARKER.len()..)?;

    let open = rest.find('"')?;
    let close = rest.rfind('"')?;
    if close <= open {
        return None;
    }

    let value = rest.get(open + 1..close)?;
    Some(value.replace("\\n", "\n").replace("\\\"", "\""))
}
