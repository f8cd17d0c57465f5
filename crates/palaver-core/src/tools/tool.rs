//! Tool trait and BoxTool wrapper.
//!
//! Tools are named callables exposed to the model. Their raw results are
//! normalized into [`ToolOutput`] by the implementation, so callers only ever
//! see one result shape.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use palaver_types::error::ToolError;
use palaver_types::tool::ToolOutput;
use serde_json::Value;

/// A named capability the model may invoke.
pub trait Tool: Send + Sync {
    /// Unique tool name (e.g., "bash", "web_search").
    fn name(&self) -> &str;

    /// One-line description shown to the model.
    fn description(&self) -> &str;

    /// Run the tool with JSON arguments.
    fn execute(&self, args: Value) -> impl Future<Output = Result<ToolOutput, ToolError>> + Send;
}

/// Object-safe version of [`Tool`] with a boxed future.
pub trait ToolDyn: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn execute_boxed(
        &self,
        args: Value,
    ) -> Pin<Box<dyn Future<Output = Result<ToolOutput, ToolError>> + Send + '_>>;
}

impl<T: Tool> ToolDyn for T {
    fn name(&self) -> &str {
        Tool::name(self)
    }

    fn description(&self) -> &str {
        Tool::description(self)
    }

    fn execute_boxed(
        &self,
        args: Value,
    ) -> Pin<Box<dyn Future<Output = Result<ToolOutput, ToolError>> + Send + '_>> {
        Box::pin(self.execute(args))
    }
}

/// Type-erased, cheaply clonable tool.
#[derive(Clone)]
pub struct BoxTool {
    inner: Arc<dyn ToolDyn>,
}

impl BoxTool {
    pub fn new<T: Tool + 'static>(tool: T) -> Self {
        Self {
            inner: Arc::new(tool),
        }
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    pub fn description(&self) -> &str {
        self.inner.description()
    }

    pub async fn execute(&self, args: Value) -> Result<ToolOutput, ToolError> {
        self.inner.execute_boxed(args).await
    }
}

impl std::fmt::Debug for BoxTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoxTool").field("name", &self.name()).finish()
    }
}
