//! Model-invocable tools.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::error::Result;

/// Per-call information handed to a tool.
pub trait ToolContext: Send + Sync {
    /// Identifier of the function call being served.
    fn function_call_id(&self) -> &str;

    /// The conversation (memory id) the call belongs to.
    fn memory_id(&self) -> &str;
}

/// A plain [`ToolContext`] implementation.
#[derive(Debug, Clone)]
pub struct CallContext {
    function_call_id: String,
    memory_id: String,
}

impl CallContext {
    pub fn new(function_call_id: impl Into<String>, memory_id: impl Into<String>) -> Self {
        Self { function_call_id: function_call_id.into(), memory_id: memory_id.into() }
    }
}

impl ToolContext for CallContext {
    fn function_call_id(&self) -> &str {
        &self.function_call_id
    }

    fn memory_id(&self) -> &str {
        &self.memory_id
    }
}

/// A named function the model may decide to call.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    /// Natural-language usage description shown to the model.
    fn description(&self) -> &str;

    /// JSON Schema of the arguments object.
    fn parameters_schema(&self) -> Option<Value> {
        None
    }

    fn response_schema(&self) -> Option<Value> {
        None
    }

    async fn execute(&self, ctx: Arc<dyn ToolContext>, args: Value) -> Result<Value>;

    /// The declaration sent to the model, keyed by [`name`](Tool::name).
    fn declaration(&self) -> Value {
        let mut decl = json!({ "description": self.description() });
        if let Some(params) = self.parameters_schema() {
            decl["parameters"] = params;
        }
        decl
    }
}

/// A dynamic group of tools, such as the tools exposed by a remote server.
#[async_trait]
pub trait Toolset: Send + Sync {
    fn name(&self) -> &str;

    async fn tools(&self) -> Result<Vec<Arc<dyn Tool>>>;
}
