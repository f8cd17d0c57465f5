//! Agent trait and its object-safe wrapper.
//!
//! Follows the same blanket-impl pattern as the tool port:
//! 1. `Agent` uses RPITIT for `prompt`
//! 2. `AgentDyn` is the object-safe twin with a boxed future
//! 3. `BoxAgent` wraps `Arc<dyn AgentDyn>` and delegates

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use palaver_types::agent::{AgentEvent, AgentSpec};
use palaver_types::error::AgentError;
use palaver_types::message::Message;
use tokio::sync::broadcast;

use crate::tools::BoxTool;

/// A conversational model driver bound to one channel's history.
///
/// All methods take `&self`: `abort` must be callable while a `prompt` is in
/// flight, so implementations keep their own interior synchronization.
pub trait Agent: Send + Sync {
    /// Identifier of the model the agent is currently bound to.
    fn model(&self) -> String;

    /// Send a user prompt and resolve once the agent's turn is complete.
    ///
    /// The user message and everything the agent produces (assistant text,
    /// tool calls, tool results) are appended to its message history.
    fn prompt(&self, text: &str) -> impl Future<Output = Result<(), AgentError>> + Send;

    /// Abort an in-flight prompt. No-op when idle.
    fn abort(&self);

    /// Stream of turn events (text deltas, tool calls, completion).
    fn subscribe(&self) -> broadcast::Receiver<AgentEvent>;

    /// Replace the entire message history atomically.
    fn replace_messages(&self, messages: Vec<Message>);

    /// Snapshot of the current message history.
    fn messages(&self) -> Vec<Message>;

    /// Tools offered to the model on the next prompt.
    fn set_tools(&self, tools: Vec<BoxTool>);
}

/// Object-safe version of [`Agent`] with a boxed prompt future.
pub trait AgentDyn: Send + Sync {
    fn model(&self) -> String;

    fn prompt_boxed<'a>(
        &'a self,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), AgentError>> + Send + 'a>>;

    fn abort(&self);

    fn subscribe(&self) -> broadcast::Receiver<AgentEvent>;

    fn replace_messages(&self, messages: Vec<Message>);

    fn messages(&self) -> Vec<Message>;

    fn set_tools(&self, tools: Vec<BoxTool>);
}

impl<T: Agent> AgentDyn for T {
    fn model(&self) -> String {
        Agent::model(self)
    }

    fn prompt_boxed<'a>(
        &'a self,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), AgentError>> + Send + 'a>> {
        Box::pin(self.prompt(text))
    }

    fn abort(&self) {
        Agent::abort(self)
    }

    fn subscribe(&self) -> broadcast::Receiver<AgentEvent> {
        Agent::subscribe(self)
    }

    fn replace_messages(&self, messages: Vec<Message>) {
        Agent::replace_messages(self, messages)
    }

    fn messages(&self) -> Vec<Message> {
        Agent::messages(self)
    }

    fn set_tools(&self, tools: Vec<BoxTool>) {
        Agent::set_tools(self, tools)
    }
}

/// Type-erased, cheaply clonable agent handle.
#[derive(Clone)]
pub struct BoxAgent {
    inner: Arc<dyn AgentDyn>,
}

impl BoxAgent {
    pub fn new<T: Agent + 'static>(agent: T) -> Self {
        Self {
            inner: Arc::new(agent),
        }
    }

    pub fn model(&self) -> String {
        self.inner.model()
    }

    pub async fn prompt(&self, text: &str) -> Result<(), AgentError> {
        self.inner.prompt_boxed(text).await
    }

    pub fn abort(&self) {
        self.inner.abort()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AgentEvent> {
        self.inner.subscribe()
    }

    pub fn replace_messages(&self, messages: Vec<Message>) {
        self.inner.replace_messages(messages)
    }

    pub fn messages(&self) -> Vec<Message> {
        self.inner.messages()
    }

    pub fn set_tools(&self, tools: Vec<BoxTool>) {
        self.inner.set_tools(tools)
    }
}

impl std::fmt::Debug for BoxAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoxAgent")
            .field("model", &self.inner.model())
            .finish()
    }
}

/// Builds the agent for a newly created channel session.
pub trait AgentFactory: Send + Sync {
    /// Bind a fresh agent to `spec.history` with the full tool set.
    fn create(&self, spec: AgentSpec, tools: Vec<BoxTool>) -> Result<BoxAgent, AgentError>;
}
