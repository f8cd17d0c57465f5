//! Conversation message types for Palaver.
//!
//! A `Message` is one turn unit exchanged with the model. Content is always an
//! ordered sequence of typed parts; scalar string content found on disk is
//! normalized into a single text part before it reaches the model layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use std::fmt;
use std::str::FromStr;

/// Role of a message in a channel conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MessageRole {
    User,
    Assistant,
    ToolResult,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
            MessageRole::ToolResult => write!(f, "toolResult"),
        }
    }
}

impl FromStr for MessageRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(MessageRole::User),
            "assistant" => Ok(MessageRole::Assistant),
            "toolResult" => Ok(MessageRole::ToolResult),
            other => Err(format!("invalid message role: '{other}'")),
        }
    }
}

/// One typed part of a message's content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ContentPart {
    Text {
        text: String,
    },

    #[serde(rename_all = "camelCase")]
    ToolCall {
        id: String,
        name: String,
        #[serde(default)]
        arguments: Value,
    },

    #[serde(rename_all = "camelCase")]
    ToolResult {
        tool_call_id: String,
        text: String,
        #[serde(default)]
        is_error: bool,
    },
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        ContentPart::Text { text: text.into() }
    }

    /// The plain text carried by this part, if any.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContentPart::Text { text } => Some(text),
            ContentPart::ToolResult { text, .. } => Some(text),
            ContentPart::ToolCall { .. } => None,
        }
    }
}

/// A single message in a channel conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: Vec<ContentPart>,
    /// Set only on synthetic compaction summaries.
    #[serde(
        default,
        rename = "isSummary",
        skip_serializing_if = "std::ops::Not::not"
    )]
    pub summary: bool,
}

impl Message {
    pub fn new(role: MessageRole, content: Vec<ContentPart>) -> Self {
        Self {
            role,
            content,
            summary: false,
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(MessageRole::User, vec![ContentPart::text(text)])
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, vec![ContentPart::text(text)])
    }

    /// A synthetic user-role message that replaces a compacted history prefix.
    pub fn compaction_summary(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: vec![ContentPart::text(text)],
            summary: true,
        }
    }

    /// Concatenated text of all text-bearing parts, newline separated.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(ContentPart::as_text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Whether this message is real user input (not a compaction summary).
    pub fn is_user_input(&self) -> bool {
        self.role == MessageRole::User && !self.summary
    }
}

/// A message as written to a channel's session log.
///
/// The timestamp is attached at write time and stripped again on load; it
/// never travels back into the model layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedRecord {
    #[serde(flatten)]
    pub message: Message,
    pub timestamp: DateTime<Utc>,
}

impl PersistedRecord {
    pub fn stamped(message: Message) -> Self {
        Self {
            message,
            timestamp: Utc::now(),
        }
    }
}
