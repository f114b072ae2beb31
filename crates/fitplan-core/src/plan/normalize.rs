//! Normalization of raw model output.
//!
//! Models sometimes wrap their answer in a fenced code block even when told
//! not to. [`strip_code_fence`] removes at most one leading fence (with an
//! optional language tag) and one trailing fence; nothing else is rewritten.

use serde_json::Value;

use crate::error::ParseError;

const FENCE: &str = "```";

/// Characters of raw output kept on a [`ParseError`] for diagnostics.
pub const EXCERPT_CHARS: usize = 200;

/// Remove one optional surrounding code fence and trim whitespace.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let body = match trimmed.strip_prefix(FENCE) {
        Some(rest) => rest.trim_start_matches(|c: char| c.is_ascii_alphabetic()),
        None => trimmed,
    };
    let body = body.strip_suffix(FENCE).unwrap_or(body);
    body.trim()
}

/// Normalize raw model output and parse it as a JSON object.
pub fn parse_plan_response(raw: &str) -> Result<Value, ParseError> {
    let normalized = strip_code_fence(raw);

    let value: Value =
        serde_json::from_str(normalized).map_err(|e| parse_error(raw, e.to_string()))?;

    if !value.is_object() {
        return Err(parse_error(
            raw,
            format!("expected a JSON object, got {}", kind_of(&value)),
        ));
    }

    Ok(value)
}

fn parse_error(raw: &str, reason: String) -> ParseError {
    ParseError {
        reason,
        excerpt: raw.chars().take(EXCERPT_CHARS).collect(),
        raw: raw.to_owned(),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
