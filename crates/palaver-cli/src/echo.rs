//! Offline agent and placeholder tool catalog for `palaver send`.
//!
//! `EchoAgent` answers every prompt locally, so the full dispatch path
//! (admission, queueing, persistence, compaction) can be exercised against a
//! real data directory without a model provider.

use std::sync::{Mutex, PoisonError};

use palaver_core::agent::{Agent, AgentFactory, BoxAgent};
use palaver_core::tools::{BoxTool, KeywordTable, Tool};
use palaver_types::agent::{AgentEvent, AgentSpec};
use palaver_types::error::{AgentError, ToolError};
use palaver_types::message::Message;
use palaver_types::tool::ToolOutput;
use serde_json::Value;
use tokio::sync::broadcast;

pub struct EchoAgent {
    model: String,
    messages: Mutex<Vec<Message>>,
    tools: Mutex<Vec<String>>,
    events: broadcast::Sender<AgentEvent>,
}

impl EchoAgent {
    pub fn new(spec: AgentSpec) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            model: format!("echo/{}", spec.model.id),
            messages: Mutex::new(spec.history),
            tools: Mutex::new(Vec::new()),
            events,
        }
    }

    fn reply_for(&self, text: &str) -> String {
        let tools = self.tools.lock().unwrap_or_else(PoisonError::into_inner);
        format!("echo: {text}\n(tools offered: {})", tools.join(", "))
    }
}

impl Agent for EchoAgent {
    fn model(&self) -> String {
        self.model.clone()
    }

    async fn prompt(&self, text: &str) -> Result<(), AgentError> {
        let _ = self.events.send(AgentEvent::TurnStart);
        let reply = self.reply_for(text);
        {
            let mut messages = self.messages.lock().unwrap_or_else(PoisonError::into_inner);
            messages.push(Message::user(text));
            messages.push(Message::assistant(reply.clone()));
        }
        let _ = self.events.send(AgentEvent::TextDelta { text: reply });
        let _ = self.events.send(AgentEvent::TurnEnd);
        Ok(())
    }

    fn abort(&self) {
        let _ = self.events.send(AgentEvent::Aborted);
    }

    fn subscribe(&self) -> broadcast::Receiver<AgentEvent> {
        self.events.subscribe()
    }

    fn replace_messages(&self, messages: Vec<Message>) {
        *self.messages.lock().unwrap_or_else(PoisonError::into_inner) = messages;
    }

    fn messages(&self) -> Vec<Message> {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_tools(&self, tools: Vec<BoxTool>) {
        *self.tools.lock().unwrap_or_else(PoisonError::into_inner) =
            tools.iter().map(|t| t.name().to_string()).collect();
    }
}

pub struct EchoFactory;

impl AgentFactory for EchoFactory {
    fn create(&self, spec: AgentSpec, _tools: Vec<BoxTool>) -> Result<BoxAgent, AgentError> {
        Ok(BoxAgent::new(EchoAgent::new(spec)))
    }
}

/// Catalog entry that only carries a name.
pub struct PlaceholderTool {
    name: String,
}

impl Tool for PlaceholderTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "placeholder"
    }

    async fn execute(&self, _args: Value) -> Result<ToolOutput, ToolError> {
        Err(ToolError::ExecutionFailed(format!(
            "{} is not available offline",
            self.name
        )))
    }
}

/// One placeholder tool per name in the built-in keyword table.
pub fn placeholder_catalog() -> Vec<BoxTool> {
    KeywordTable::builtin()
        .tool_names()
        .into_iter()
        .map(|name| {
            BoxTool::new(PlaceholderTool {
                name: name.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use palaver_types::agent::ModelConfig;

    use super::*;

    fn spec(history: Vec<Message>) -> AgentSpec {
        AgentSpec {
            channel_id: "c1".to_string(),
            channel_name: "c1".to_string(),
            working_dir: PathBuf::from("."),
            model: ModelConfig::default(),
            history,
        }
    }

    #[tokio::test]
    async fn test_echo_appends_turn() {
        let agent = EchoFactory
            .create(spec(vec![Message::user("earlier")]), Vec::new())
            .unwrap();
        agent.set_tools(placeholder_catalog().into_iter().take(2).collect());
        agent.prompt("hello").await.unwrap();

        let messages = agent.messages();
        assert_eq!(messages.len(), 3);
        assert!(messages[2].text().starts_with("echo: hello"));
        assert_eq!(agent.model(), "echo/claude-sonnet-4-5");
    }

    #[tokio::test]
    async fn test_placeholder_tools_fail() {
        let catalog = placeholder_catalog();
        assert!(catalog.iter().any(|t| t.name() == "bash"));
        assert!(catalog[0].execute(Value::Null).await.is_err());
    }
}
