//! Result Normalizer
//!
//! Turns untyped model text into a [`DeckAnalysis`]. Total: every input,
//! however malformed, yields a value that satisfies every bound in
//! [`ANALYSIS_SCHEMA`]. One routine repairs all fields, driven by each
//! field's [`FieldKind`].
//!
//! Normalizing is idempotent: feeding the serialized output back in returns
//! the same value.

use serde_json::{Map, Value};
use tracing::{debug, error};

use crate::models::analysis::DEFAULT_CONFIDENCE;
use crate::models::{DeckAnalysis, FieldKind, ANALYSIS_SCHEMA};

/// Upper bound on `{` positions tried when hunting for an embedded object
const MAX_EXTRACTION_ATTEMPTS: usize = 16;

/// Normalize raw model output
///
/// `coverage_hint` is the share of cards the model saw when the prompt was
/// truncated. It is used as confidence only if the output carries neither a
/// top-level nor a `meta.confidence`.
pub fn normalize(raw: &str, coverage_hint: Option<f64>) -> DeckAnalysis {
    let object = parse_object(raw).unwrap_or_else(|| {
        debug!(raw_len = raw.len(), "Model output has no JSON object, using empty object");
        Map::new()
    });
    normalize_object(&object, coverage_hint)
}

/// Normalize an already-parsed object
pub fn normalize_object(object: &Map<String, Value>, coverage_hint: Option<f64>) -> DeckAnalysis {
    let mut repaired = Map::new();

    for field in ANALYSIS_SCHEMA {
        let value = match field.kind {
            FieldKind::Probability { default } => {
                Value::from(resolve_confidence(object, coverage_hint, default))
            }
            kind => repair(object.get(field.name), kind),
        };
        repaired.insert(field.name.to_string(), value);
    }

    match serde_json::from_value(Value::Object(repaired)) {
        Ok(analysis) => analysis,
        Err(e) => {
            // Unreachable while the schema table and struct agree
            error!(error = %e, "Repaired analysis does not match DeckAnalysis");
            DeckAnalysis::default()
        }
    }
}

/// Parse the whole text as JSON, else the first embedded `{...}` that parses
fn parse_object(raw: &str) -> Option<Map<String, Value>> {
    let trimmed = raw.trim();
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return match value {
            Value::Object(map) => Some(map),
            _ => None,
        };
    }

    trimmed
        .match_indices('{')
        .take(MAX_EXTRACTION_ATTEMPTS)
        .filter_map(|(start, _)| balanced_block(&trimmed[start..]))
        .find_map(|block| match serde_json::from_str::<Value>(block) {
            Ok(Value::Object(map)) => Some(map),
            _ => None,
        })
}

/// Prefix of `text` (which starts with `{`) up to its matching `}`
fn balanced_block(text: &str) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(&text[..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

fn repair(value: Option<&Value>, kind: FieldKind) -> Value {
    match kind {
        FieldKind::Integer { min, max, default } => {
            let n = value
                .and_then(as_number)
                .map(|n| (n.round() as i64).clamp(min, max))
                .unwrap_or(default);
            Value::from(n)
        }
        FieldKind::Choice { options, default } => {
            let chosen = value
                .and_then(Value::as_str)
                .and_then(|s| options.iter().find(|o| **o == s))
                .copied()
                .unwrap_or(default);
            Value::from(chosen)
        }
        FieldKind::Text { max_chars } => Value::from(bounded_text(value, max_chars)),
        FieldKind::TextList { max_items, max_chars } => {
            let items: Vec<Value> = match value {
                Some(Value::Array(items)) => items
                    .iter()
                    .filter(|item| item.is_string())
                    .map(|item| bounded_text(Some(item), max_chars))
                    .filter(|s| !s.is_empty())
                    .take(max_items)
                    .map(Value::from)
                    .collect(),
                _ => Vec::new(),
            };
            Value::Array(items)
        }
        FieldKind::Probability { default } => {
            Value::from(value.and_then(as_probability).unwrap_or(default))
        }
    }
}

/// First valid candidate: top-level, `meta.confidence`, coverage hint, default
fn resolve_confidence(
    object: &Map<String, Value>,
    coverage_hint: Option<f64>,
    default: f64,
) -> f64 {
    object
        .get("confidence")
        .and_then(as_probability)
        .or_else(|| {
            object
                .get("meta")
                .and_then(|meta| meta.get("confidence"))
                .and_then(as_probability)
        })
        .or_else(|| coverage_hint.filter(|h| h.is_finite()).map(|h| h.clamp(0.0, 1.0)))
        .unwrap_or(default)
}

/// Finite number from a JSON number or numeric string
fn as_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

fn as_probability(value: &Value) -> Option<f64> {
    as_number(value).map(|n| n.clamp(0.0, 1.0))
}

/// Stringify, collapse whitespace, truncate to `max_chars` characters
fn bounded_text(value: Option<&Value>, max_chars: usize) -> String {
    let text = match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => return String::new(),
    };
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let truncated: String = collapsed.chars().take(max_chars).collect();
    truncated.trim_end().to_string()
}
