//! In-crate test doubles for the agent, tool, and store ports.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use palaver_types::agent::{AgentEvent, AgentSpec};
use palaver_types::error::{AgentError, SessionError, ToolError};
use palaver_types::message::Message;
use palaver_types::tool::ToolOutput;
use serde_json::Value;
use tokio::sync::{broadcast, Semaphore};

use crate::agent::{Agent, AgentFactory, BoxAgent};
use crate::session::store::{LoadMode, MemorySessionStore, SessionStore};
use crate::tools::{BoxTool, Tool};

/// Tool that answers with its own name.
pub(crate) struct NamedTool {
    name: String,
}

impl NamedTool {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

impl Tool for NamedTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "test tool"
    }

    async fn execute(&self, _args: Value) -> Result<ToolOutput, ToolError> {
        Ok(ToolOutput::Text(self.name.clone()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Behavior {
    /// Append "echo: {text}" as the assistant reply.
    Echo,
    /// Record the user message, then fail.
    Fail,
    /// Record the user message, then never finish.
    Hang,
    /// Panic when prompted with this exact text, echo otherwise.
    PanicOn(&'static str),
}

/// Agent double that echoes prompts back.
///
/// With a gate set, each prompt takes one permit before replying, so tests
/// can hold a turn in flight.
pub(crate) struct ScriptedAgent {
    messages: Mutex<Vec<Message>>,
    tools: Mutex<Vec<String>>,
    behavior: Behavior,
    gate: Option<Arc<Semaphore>>,
    prompts: Arc<Mutex<Vec<String>>>,
    aborts: Arc<AtomicUsize>,
    events: broadcast::Sender<AgentEvent>,
}

impl ScriptedAgent {
    pub(crate) fn new(history: Vec<Message>) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            messages: Mutex::new(history),
            tools: Mutex::new(Vec::new()),
            behavior: Behavior::Echo,
            gate: None,
            prompts: Arc::new(Mutex::new(Vec::new())),
            aborts: Arc::new(AtomicUsize::new(0)),
            events,
        }
    }

    pub(crate) fn boxed() -> BoxAgent {
        BoxAgent::new(Self::new(Vec::new()))
    }
}

impl Agent for ScriptedAgent {
    fn model(&self) -> String {
        "scripted/echo".to_string()
    }

    async fn prompt(&self, text: &str) -> Result<(), AgentError> {
        let _ = self.events.send(AgentEvent::TurnStart);
        self.messages.lock().unwrap().push(Message::user(text));
        self.prompts.lock().unwrap().push(text.to_string());

        if let Some(gate) = &self.gate {
            let permit = gate
                .acquire()
                .await
                .map_err(|e| AgentError::Other(e.to_string()))?;
            permit.forget();
        }

        match self.behavior {
            Behavior::PanicOn(trigger) if trigger == text => {
                panic!("scripted agent panicked on {text:?}")
            }
            Behavior::Echo | Behavior::PanicOn(_) => {
                let reply = format!("echo: {text}");
                let _ = self.events.send(AgentEvent::TextDelta { text: reply.clone() });
                self.messages.lock().unwrap().push(Message::assistant(reply));
                let _ = self.events.send(AgentEvent::TurnEnd);
                Ok(())
            }
            Behavior::Fail => Err(AgentError::Provider("scripted failure".to_string())),
            Behavior::Hang => std::future::pending().await,
        }
    }

    fn abort(&self) {
        self.aborts.fetch_add(1, Ordering::SeqCst);
        let _ = self.events.send(AgentEvent::Aborted);
    }

    fn subscribe(&self) -> broadcast::Receiver<AgentEvent> {
        self.events.subscribe()
    }

    fn replace_messages(&self, messages: Vec<Message>) {
        *self.messages.lock().unwrap() = messages;
    }

    fn messages(&self) -> Vec<Message> {
        self.messages.lock().unwrap().clone()
    }

    fn set_tools(&self, tools: Vec<BoxTool>) {
        *self.tools.lock().unwrap() = tools.iter().map(|t| t.name().to_string()).collect();
    }
}

/// Factory producing [`ScriptedAgent`]s that share one prompt log and gate.
#[derive(Clone)]
pub(crate) struct ScriptedFactory {
    pub(crate) behavior: Behavior,
    pub(crate) gate: Option<Arc<Semaphore>>,
    pub(crate) prompts: Arc<Mutex<Vec<String>>>,
    pub(crate) aborts: Arc<AtomicUsize>,
    pub(crate) created: Arc<AtomicUsize>,
    pub(crate) histories: Arc<Mutex<Vec<usize>>>,
}

impl ScriptedFactory {
    pub(crate) fn new(behavior: Behavior) -> Self {
        Self {
            behavior,
            gate: None,
            prompts: Arc::new(Mutex::new(Vec::new())),
            aborts: Arc::new(AtomicUsize::new(0)),
            created: Arc::new(AtomicUsize::new(0)),
            histories: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub(crate) fn gated(behavior: Behavior, gate: Arc<Semaphore>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::new(behavior)
        }
    }

    pub(crate) fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl AgentFactory for ScriptedFactory {
    fn create(&self, spec: AgentSpec, tools: Vec<BoxTool>) -> Result<BoxAgent, AgentError> {
        self.created.fetch_add(1, Ordering::SeqCst);
        self.histories.lock().unwrap().push(spec.history.len());

        let mut agent = ScriptedAgent::new(spec.history);
        agent.behavior = self.behavior;
        agent.gate = self.gate.clone();
        agent.prompts = Arc::clone(&self.prompts);
        agent.aborts = Arc::clone(&self.aborts);
        agent.set_tools(tools);
        Ok(BoxAgent::new(agent))
    }
}

/// Memory store with switchable failures.
#[derive(Default)]
pub(crate) struct FaultyStore {
    pub(crate) inner: MemorySessionStore,
    fail_reads: bool,
    fail_rewrite: bool,
}

impl FaultyStore {
    /// `load` and `count` fail.
    pub(crate) fn unreadable() -> Self {
        Self {
            fail_reads: true,
            ..Self::default()
        }
    }

    /// `rewrite` fails.
    pub(crate) fn failing_rewrite() -> Self {
        Self {
            fail_rewrite: true,
            ..Self::default()
        }
    }
}

fn disk_error(what: &str) -> SessionError {
    SessionError::Io(std::io::Error::other(what.to_string()))
}

impl SessionStore for FaultyStore {
    async fn prepare(&self) -> Result<(), SessionError> {
        self.inner.prepare().await
    }

    async fn append(&self, channel_id: &str, message: &Message) -> Result<(), SessionError> {
        self.inner.append(channel_id, message).await
    }

    async fn append_batch(&self, channel_id: &str, messages: &[Message]) -> Result<(), SessionError> {
        self.inner.append_batch(channel_id, messages).await
    }

    async fn load(&self, channel_id: &str, mode: LoadMode) -> Result<Vec<Message>, SessionError> {
        if self.fail_reads {
            return Err(disk_error("permission denied"));
        }
        self.inner.load(channel_id, mode).await
    }

    async fn count(&self, channel_id: &str) -> Result<usize, SessionError> {
        if self.fail_reads {
            return Err(disk_error("permission denied"));
        }
        self.inner.count(channel_id).await
    }

    async fn rewrite(&self, channel_id: &str, messages: &[Message]) -> Result<(), SessionError> {
        if self.fail_rewrite {
            return Err(disk_error("disk full"));
        }
        self.inner.rewrite(channel_id, messages).await
    }

    async fn clear(&self, channel_id: &str) -> Result<(), SessionError> {
        self.inner.clear(channel_id).await
    }

    async fn list_channels(&self) -> Result<Vec<String>, SessionError> {
        self.inner.list_channels().await
    }
}
