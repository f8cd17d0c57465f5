//! Agent-facing types: model bindings and turn events.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Which hosted model a channel's agent is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Provider name (e.g., "anthropic", "openai", "ollama").
    pub provider: String,
    /// Provider-specific model identifier.
    pub id: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: "anthropic".to_string(),
            id: "claude-sonnet-4-5".to_string(),
        }
    }
}

impl std::fmt::Display for ModelConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.provider, self.id)
    }
}

/// Events an agent emits while servicing a prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    TurnStart,
    TextDelta { text: String },
    ToolCall { name: String },
    TurnEnd,
    Aborted,
}

/// Everything an agent factory needs to bind a fresh agent to a channel.
#[derive(Debug, Clone)]
pub struct AgentSpec {
    pub channel_id: String,
    pub channel_name: String,
    pub working_dir: PathBuf,
    pub model: ModelConfig,
    /// Engineered history the agent starts from.
    pub history: Vec<crate::message::Message>,
}
