//! Tolerant view of whatever the generative service sent back.

use serde_json::{Map, Value};

/// Keys probed, in order, for directly usable text.
const TEXT_KEYS: &[&str] = &["text", "output", "content"];

#[derive(Debug, Clone, PartialEq)]
pub enum GenerationOutput {
    Text(String),
    Structured(Map<String, Value>),
    Unknown(Value),
}

impl GenerationOutput {
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::String(text) => Self::Text(text),
            Value::Object(map) => Self::Structured(map),
            other => Self::Unknown(other),
        }
    }

    /// Parse a response body. Bodies that are not JSON are kept as text.
    pub fn from_body(body: &str) -> Self {
        match serde_json::from_str::<Value>(body) {
            Ok(value) => Self::from_value(value),
            Err(_) => Self::Text(body.to_string()),
        }
    }

    /// Best available text. Never fails and never returns an empty string:
    /// when no text can be located the whole output is rendered instead.
    pub fn extract_text(&self) -> String {
        let found = match self {
            Self::Text(text) => non_blank(text),
            Self::Structured(map) => text_in_map(map),
            Self::Unknown(value) => text_in_value(value),
        };
        found.unwrap_or_else(|| self.render())
    }

    fn render(&self) -> String {
        match self {
            Self::Text(text) => format!("{:?}", text),
            Self::Structured(map) => Value::Object(map.clone()).to_string(),
            Self::Unknown(value) => value.to_string(),
        }
    }
}

fn non_blank(text: &str) -> Option<String> {
    if text.trim().is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

fn text_in_map(map: &Map<String, Value>) -> Option<String> {
    for key in TEXT_KEYS {
        if let Some(text) = map.get(*key).and_then(text_in_value) {
            return Some(text);
        }
    }
    // First candidate with text wins; later candidates are alternatives.
    if let Some(Value::Array(candidates)) = map.get("candidates") {
        if let Some(text) = candidates.iter().find_map(text_in_value) {
            return Some(text);
        }
    }
    map.get("parts").and_then(text_in_value)
}

fn text_in_value(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => non_blank(text),
        Value::Object(map) => text_in_map(map),
        // Sibling parts of one answer are concatenated.
        Value::Array(items) => {
            let joined: String = items.iter().filter_map(text_in_value).collect();
            non_blank(&joined)
        }
        _ => None,
    }
}
