//! Strict JSON parsing with readable failures.

use serde_json::Value;
use thiserror::Error;

const PREVIEW_LIMIT: usize = 200;

/// Error returned when a payload that must be JSON is not.
#[derive(Debug, Error)]
#[error("failed to parse JSON ({context}): {source}. body preview: {body_preview}")]
pub struct JsonParseError {
    context: String,
    #[source]
    source: serde_json::Error,
    body_preview: String,
}

impl JsonParseError {
    /// Access the truncated payload preview captured during parsing.
    pub fn body_preview(&self) -> &str {
        &self.body_preview
    }
}

/// Parse `text` as JSON, decorating failures with `context` and a short,
/// whitespace-collapsed preview of the payload.
pub fn parse_json_strict(text: &str, context: &str) -> Result<Value, JsonParseError> {
    serde_json::from_str::<Value>(text).map_err(|source| JsonParseError {
        context: context.to_string(),
        source,
        body_preview: truncate_preview(text, PREVIEW_LIMIT),
    })
}

fn truncate_preview(text: &str, limit: usize) -> String {
    if text.trim().is_empty() {
        return "<empty>".to_string();
    }

    let mut preview = String::new();
    for ch in text.chars() {
        if preview.len() >= limit {
            preview.push_str("...");
            break;
        }
        match ch {
            '\n' | '\r' | '\t' => {
                if !preview.ends_with(' ') {
                    preview.push(' ');
                }
            }
            _ => preview.push(ch),
        }
    }
    preview.trim().to_string()
}
