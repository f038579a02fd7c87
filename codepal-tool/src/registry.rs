//! Name-indexed collection of the tools offered to the model.

use std::collections::HashMap;
use std::sync::Arc;

use codepal_core::{CoreError, Result, Tool, Toolset};
use serde_json::{Map, Value};
use tracing::{debug, info};

/// Tools available to a conversation, keyed by name, in registration order.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    index: HashMap<String, usize>,
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry").field("tools", &self.names()).finish()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tool.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Tool`] if a tool with the same name is already registered.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<()> {
        let name = tool.name().to_string();
        if self.index.contains_key(&name) {
            return Err(CoreError::Tool(format!("tool '{name}' is already registered")));
        }
        debug!(tool = %name, "registered tool");
        self.index.insert(name, self.tools.len());
        self.tools.push(tool);
        Ok(())
    }

    /// Builder-style [`register`](Self::register).
    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Result<Self> {
        self.register(tool)?;
        Ok(self)
    }

    /// Add every tool a toolset currently exposes.
    ///
    /// # Errors
    ///
    /// Fails if the toolset cannot list its tools or a name collides.
    pub async fn register_toolset(&mut self, toolset: &dyn Toolset) -> Result<usize> {
        let tools = toolset.tools().await?;
        let count = tools.len();
        for tool in tools {
            self.register(tool)?;
        }
        info!(toolset = toolset.name(), tool_count = count, "registered toolset");
        Ok(count)
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.index.get(name).map(|&i| self.tools[i].clone())
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Declarations for the model request, keyed by tool name.
    pub fn declarations(&self) -> Map<String, Value> {
        self.tools.iter().map(|t| (t.name().to_string(), t.declaration())).collect()
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use codepal_core::ToolContext;
    use serde_json::json;

    use super::*;

    struct Named(&'static str);

    #[async_trait]
    impl Tool for Named {
        fn name(&self) -> &str {
            self.0
        }

        fn description(&self) -> &str {
            "test tool"
        }

        async fn execute(&self, _ctx: Arc<dyn ToolContext>, _args: Value) -> Result<Value> {
            Ok(json!({ "output": self.0 }))
        }
    }

    struct Pair;

    #[async_trait]
    impl Toolset for Pair {
        fn name(&self) -> &str {
            "pair"
        }

        async fn tools(&self) -> Result<Vec<Arc<dyn Tool>>> {
            Ok(vec![Arc::new(Named("left")), Arc::new(Named("right"))])
        }
    }

    #[test]
    fn duplicate_names_rejected() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(Named("a"))).unwrap();
        assert!(registry.register(Arc::new(Named("a"))).is_err());
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn toolset_tools_are_registered_in_order() {
        let mut registry = ToolRegistry::new().with_tool(Arc::new(Named("first"))).unwrap();
        assert_eq!(registry.register_toolset(&Pair).await.unwrap(), 2);
        assert_eq!(registry.names(), vec!["first", "left", "right"]);
        assert!(registry.get("right").is_some());
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn declarations_keyed_by_name() {
        let registry = ToolRegistry::new().with_tool(Arc::new(Named("a"))).unwrap();
        let decls = registry.declarations();
        assert_eq!(decls["a"], json!({ "description": "test tool" }));
    }
}
