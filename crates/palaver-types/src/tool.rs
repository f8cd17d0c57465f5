//! Tool output types.
//!
//! Tools hand back results in whatever shape their SDK produces: a bare
//! string, an object with a `content` field, an array of parts, or something
//! malformed. `ToolOutput::from_value` folds all of those into one sum type at
//! the adapter boundary so nothing downstream has to re-normalize.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::message::ContentPart;

/// Normalized result of a tool execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ToolOutput {
    Text(String),
    Structured(Vec<ContentPart>),
}

impl ToolOutput {
    /// Normalize a raw tool result.
    ///
    /// - `"text"` becomes `Text`
    /// - `{"content": ...}` is unwrapped and normalized recursively
    /// - an array of valid content parts becomes `Structured`
    /// - anything else is rendered as compact JSON text
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::String(text) => ToolOutput::Text(text),
            Value::Object(mut map) if map.contains_key("content") => {
                let inner = map.remove("content").unwrap_or(Value::Null);
                ToolOutput::from_value(inner)
            }
            Value::Array(items) => {
                let parsed: Result<Vec<ContentPart>, _> = items
                    .iter()
                    .cloned()
                    .map(serde_json::from_value::<ContentPart>)
                    .collect();
                match parsed {
                    Ok(parts) => ToolOutput::Structured(parts),
                    Err(_) => ToolOutput::Text(Value::Array(items).to_string()),
                }
            }
            Value::Null => ToolOutput::Text(String::new()),
            other => ToolOutput::Text(other.to_string()),
        }
    }

    /// Content parts suitable for a `toolResult` message.
    pub fn into_parts(self) -> Vec<ContentPart> {
        match self {
            ToolOutput::Text(text) => vec![ContentPart::text(text)],
            ToolOutput::Structured(parts) => parts,
        }
    }

    /// Flattened text view of the output.
    pub fn to_text(&self) -> String {
        match self {
            ToolOutput::Text(text) => text.clone(),
            ToolOutput::Structured(parts) => parts
                .iter()
                .filter_map(ContentPart::as_text)
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

impl From<String> for ToolOutput {
    fn from(text: String) -> Self {
        ToolOutput::Text(text)
    }
}

impl From<&str> for ToolOutput {
    fn from(text: &str) -> Self {
        ToolOutput::Text(text.to_string())
    }
}
