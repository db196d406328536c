//! Parsers for generation output.
//!
//! Two deliberately separate paths, chosen by the calling generator:
//! - strict JSON objects (optionally wrapped in a markdown code fence)
//! - the line-oriented `product_name:` / `description:` / `features:` /
//!   `parameters:` format used by search-augmented full enrichment

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::error::EnrichError;

// ---------------------------------------------------------------------------
// Strict JSON
// ---------------------------------------------------------------------------

/// Remove a leading ```` ``` ```` / ```` ```json ```` fence line and a trailing fence.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (e.g. "json") on the fence line.
    let body = match rest.find('\n') {
        Some(nl) => &rest[nl + 1..],
        None => strip_info_tag(rest),
    };
    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
}

/// Single-line fence: the info string runs straight into the body.
fn strip_info_tag(rest: &str) -> &str {
    match rest.get(..4) {
        Some(tag) if tag.eq_ignore_ascii_case("json") => &rest[4..],
        _ => rest,
    }
}

/// Decode a JSON object, tolerating a surrounding code fence.
pub fn parse_json_object(text: &str) -> Result<Map<String, Value>, EnrichError> {
    let body = strip_code_fence(text);
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(EnrichError::Parse(format!(
            "expected a JSON object, got {}",
            json_kind(&other)
        ))),
        Err(e) => Err(EnrichError::Parse(format!("invalid JSON: {}", e))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Normalize a JSON scalar into candidate text.
///
/// `null`, empty strings, the literal `"null"` and nested objects yield `None`.
/// Arrays of scalars are comma-joined.
pub fn json_value_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::Null | Value::Object(_) => return None,
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Array(items) => items
            .iter()
            .filter(|v| !matches!(v, Value::Array(_)))
            .filter_map(json_value_text)
            .collect::<Vec<_>>()
            .join(", "),
    };
    if text.is_empty() || text.eq_ignore_ascii_case("null") {
        None
    } else {
        Some(text)
    }
}

/// Flatten a JSON object of `name -> value` into non-empty string pairs.
pub fn json_string_pairs(map: &Map<String, Value>) -> BTreeMap<String, String> {
    map.iter()
        .filter_map(|(k, v)| {
            let key = k.trim();
            if key.is_empty() {
                return None;
            }
            json_value_text(v).map(|text| (key.to_string(), text))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Line-oriented format
// ---------------------------------------------------------------------------

/// Parsed line-oriented full-enrichment response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedListing {
    pub product_name: String,
    pub description: String,
    pub features: String,
    pub parameters: BTreeMap<String, String>,
    /// Number of marker lines encountered.
    pub markers_seen: usize,
}

impl ParsedListing {
    pub fn has_markers(&self) -> bool {
        self.markers_seen > 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Marker {
    ProductName,
    Description,
    Features,
    Parameters,
}

const MARKERS: &[(&str, Marker)] = &[
    ("product_name:", Marker::ProductName),
    ("description:", Marker::Description),
    ("features:", Marker::Features),
    ("parameters:", Marker::Parameters),
];

/// Match a marker at the start of a line (case-insensitive) and return the rest.
fn match_marker(line: &str) -> Option<(Marker, &str)> {
    let line = line.trim_start();
    MARKERS.iter().find_map(|(prefix, marker)| {
        let head = line.get(..prefix.len())?;
        if head.eq_ignore_ascii_case(prefix) {
            Some((*marker, line[prefix.len()..].trim()))
        } else {
            None
        }
    })
}

/// Parse `Name:Value; Name:Value` pairs. Malformed pairs are skipped.
pub fn parse_parameter_pairs(line: &str) -> BTreeMap<String, String> {
    line.split(';')
        .filter_map(|pair| {
            let (name, value) = pair.split_once(':')?;
            let (name, value) = (name.trim(), value.trim());
            if name.is_empty() || value.is_empty() {
                None
            } else {
                Some((name.to_string(), value.to_string()))
            }
        })
        .collect()
}

/// Parse the line-oriented format. Never fails; see [`ParsedListing::markers_seen`].
pub fn parse_listing(output: &str) -> ParsedListing {
    let mut parsed = ParsedListing::default();
    let mut in_features = false;

    for raw in output.lines() {
        if let Some((marker, rest)) = match_marker(raw) {
            parsed.markers_seen += 1;
            in_features = marker == Marker::Features;
            match marker {
                Marker::ProductName => parsed.product_name = rest.to_string(),
                Marker::Description => parsed.description = rest.to_string(),
                Marker::Features => parsed.features = rest.to_string(),
                Marker::Parameters => parsed.parameters.extend(parse_parameter_pairs(rest)),
            }
        } else if in_features {
            if !parsed.features.is_empty() {
                parsed.features.push('\n');
            }
            parsed.features.push_str(raw.trim());
        }
    }

    parsed.features = parsed.features.trim().to_string();

    if !parsed.has_markers() {
        log::warn!(
            "Line-oriented response contained no field markers ({} chars)",
            output.len()
        );
    }

    parsed
}
