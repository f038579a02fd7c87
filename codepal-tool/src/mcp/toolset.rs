// MCP (Model Context Protocol) toolset.
//
// Connects to an MCP server, lists its tools and exposes each one as a
// codepal `Tool` whose calls are proxied to the server.

use std::ops::Deref;
use std::sync::Arc;

use async_trait::async_trait;
use codepal_core::{CoreError, Result, Tool, ToolContext, Toolset};
use rmcp::{
    RoleClient,
    model::{CallToolRequestParams, RawContent, ResourceContents},
    service::RunningService,
};
use serde_json::{Value, json};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Predicate selecting which server tools are exposed.
pub type ToolFilter = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Strip schema keywords that OpenAI-compatible function declarations reject.
fn sanitize_schema(value: &mut Value) {
    if let Value::Object(map) = value {
        map.remove("$schema");
        map.remove("definitions");
        map.remove("$ref");
        map.remove("additionalProperties");

        for (_, v) in map.iter_mut() {
            sanitize_schema(v);
        }
    } else if let Value::Array(arr) = value {
        for v in arr.iter_mut() {
            sanitize_schema(v);
        }
    }
}

/// Tools of a remote MCP server.
///
/// ```rust,ignore
/// use codepal_tool::McpToolset;
///
/// let toolset = McpToolset::connect_http(&config.mcp_url).await?
///     .with_name("web_search")
///     .with_tools(&["webSearchPro"]);
/// let tools = toolset.tools().await?;
/// ```
pub struct McpToolset<S = ()>
where
    S: rmcp::service::Service<RoleClient> + Send + Sync + 'static,
{
    client: Arc<Mutex<RunningService<RoleClient, S>>>,
    tool_filter: Option<ToolFilter>,
    name: String,
}

#[cfg(feature = "http-transport")]
impl McpToolset<()> {
    /// Connect to a streamable-HTTP MCP endpoint and complete the handshake.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Tool`] if the connection or initialisation fails.
    pub async fn connect_http(url: &str) -> Result<Self> {
        use rmcp::ServiceExt;
        use rmcp::transport::StreamableHttpClientTransport;

        let transport = StreamableHttpClientTransport::from_uri(url.to_string());
        let client = ().serve(transport).await.map_err(|e| {
            CoreError::Tool(format!("Failed to connect to MCP server: {e}"))
        })?;
        info!(endpoint = %redact_query(url), "connected to MCP server");
        Ok(Self::new(client))
    }
}

/// Drop the query string, which may carry credentials.
fn redact_query(url: &str) -> &str {
    url.split('?').next().unwrap_or(url)
}

impl<S> McpToolset<S>
where
    S: rmcp::service::Service<RoleClient> + Send + Sync + 'static,
{
    /// Wrap an already initialised MCP client.
    pub fn new(client: RunningService<RoleClient, S>) -> Self {
        Self { client: Arc::new(Mutex::new(client)), tool_filter: None, name: "mcp_toolset".to_string() }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Only expose tools for which `filter` returns true.
    pub fn with_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.tool_filter = Some(Arc::new(filter));
        self
    }

    /// Only expose the named tools.
    pub fn with_tools(self, tool_names: &[&str]) -> Self {
        let names: Vec<String> = tool_names.iter().map(|s| s.to_string()).collect();
        self.with_filter(move |name| names.iter().any(|n| n == name))
    }

    /// Token that shuts the client down when cancelled.
    pub async fn cancellation_token(&self) -> rmcp::service::RunningServiceCancellationToken {
        self.client.lock().await.cancellation_token()
    }
}

#[async_trait]
impl<S> Toolset for McpToolset<S>
where
    S: rmcp::service::Service<RoleClient> + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn tools(&self) -> Result<Vec<Arc<dyn Tool>>> {
        let client = self.client.lock().await;

        let mcp_tools = client
            .list_all_tools()
            .await
            .map_err(|e| CoreError::Tool(format!("Failed to list MCP tools: {e}")))?;

        let mut tools: Vec<Arc<dyn Tool>> = Vec::new();
        for mcp_tool in mcp_tools {
            let tool_name = mcp_tool.name.to_string();
            if let Some(filter) = &self.tool_filter {
                if !filter(&tool_name) {
                    continue;
                }
            }

            let mut input_schema = Value::Object(mcp_tool.input_schema.as_ref().clone());
            sanitize_schema(&mut input_schema);

            tools.push(Arc::new(McpTool {
                name: tool_name,
                description: mcp_tool.description.map(|d| d.to_string()).unwrap_or_default(),
                input_schema,
                client: self.client.clone(),
            }));
        }

        debug!(toolset = %self.name, tool_count = tools.len(), "listed MCP tools");
        Ok(tools)
    }
}

/// One server tool; calls are proxied through the shared client.
struct McpTool<S>
where
    S: rmcp::service::Service<RoleClient> + Send + Sync + 'static,
{
    name: String,
    description: String,
    input_schema: Value,
    client: Arc<Mutex<RunningService<RoleClient, S>>>,
}

/// Render tool result content blocks as text lines.
fn render_content(content: &[rmcp::model::Content]) -> Vec<String> {
    content
        .iter()
        .map(|block| match block.deref() {
            RawContent::Text(text) => text.text.clone(),
            RawContent::Image(image) => {
                format!("[Image: {} bytes, mime: {}]", image.data.len(), image.mime_type)
            }
            RawContent::Resource(resource) => {
                let uri = match &resource.resource {
                    ResourceContents::TextResourceContents { uri, .. } => uri,
                    ResourceContents::BlobResourceContents { uri, .. } => uri,
                };
                format!("[Resource: {uri}]")
            }
            RawContent::Audio(_) => "[Audio content]".to_string(),
            RawContent::ResourceLink(link) => format!("[ResourceLink: {}]", link.uri),
        })
        .collect()
}

#[async_trait]
impl<S> Tool for McpTool<S>
where
    S: rmcp::service::Service<RoleClient> + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters_schema(&self) -> Option<Value> {
        Some(self.input_schema.clone())
    }

    async fn execute(&self, _ctx: Arc<dyn ToolContext>, args: Value) -> Result<Value> {
        let arguments = match args {
            Value::Null => None,
            Value::Object(map) if map.is_empty() => None,
            Value::Object(map) => Some(map),
            _ => return Err(CoreError::Tool("Tool arguments must be an object".to_string())),
        };

        let client = self.client.lock().await;
        let result = client
            .call_tool(CallToolRequestParams {
                name: self.name.clone().into(),
                arguments,
                task: None,
                meta: None,
            })
            .await
            .map_err(|e| CoreError::Tool(format!("Failed to call MCP tool '{}': {e}", self.name)))?;

        let lines = render_content(&result.content);

        if result.is_error.unwrap_or(false) {
            let detail = lines.first().map(|l| format!(": {l}")).unwrap_or_default();
            return Err(CoreError::Tool(format!("MCP tool '{}' execution failed{detail}", self.name)));
        }

        if let Some(structured) = result.structured_content {
            return Ok(json!({ "output": structured }));
        }
        if lines.is_empty() {
            return Err(CoreError::Tool(format!("MCP tool '{}' returned no content", self.name)));
        }
        Ok(json!({ "output": lines.join("\n") }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_removes_unsupported_keywords_recursively() {
        let mut schema = json!({
            "$schema": "http://json-schema.org/draft-07/schema#",
            "type": "object",
            "additionalProperties": false,
            "properties": {
                "query": { "type": "string", "additionalProperties": false },
                "filters": { "anyOf": [{ "$ref": "#/definitions/x" }] }
            },
            "definitions": { "x": {} }
        });
        sanitize_schema(&mut schema);
        assert_eq!(
            schema,
            json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string" },
                    "filters": { "anyOf": [{}] }
                }
            })
        );
    }

    #[test]
    fn credentials_in_query_are_not_logged() {
        assert_eq!(
            redact_query("https://open.bigmodel.cn/api/mcp/web_search/mcp?Authorization=secret"),
            "https://open.bigmodel.cn/api/mcp/web_search/mcp"
        );
        assert_eq!(redact_query("http://localhost:8080/mcp"), "http://localhost:8080/mcp");
    }
}
