//! Assemble a [`CodepalService`] from an [`AppConfig`].

use std::sync::Arc;

use anyhow::Context;
use codepal_agent::{AppConfig, CodepalService, Orchestrator, OrchestratorConfig};
use codepal_core::Llm;
use codepal_guardrail::{GuardrailSet, SensitiveWordGuardrail};
use codepal_model::{ListenedLlm, LoggingListener, OpenAiCompatibleClient, OpenAiConfig};
use codepal_rag::{
    ContentRetriever, FileSystemDocumentLoader, InMemoryVectorStore, OpenAiEmbeddingProvider, RagPipeline,
};
use codepal_session::ChatMemoryStore;
use codepal_tool::{McpToolset, ToolRegistry, WebSearchTool};
use tracing::{info, warn};

/// Collection holding the knowledge-base segments.
pub const KNOWLEDGE_COLLECTION: &str = "codepal-docs";

/// Build the service with the OpenAI-compatible chat and embedding clients.
///
/// A missing docs directory disables retrieval and an unreachable MCP
/// server disables its tools; every other failure aborts startup.
pub async fn build_service(config: &AppConfig) -> anyhow::Result<CodepalService> {
    let client = OpenAiCompatibleClient::new(
        OpenAiConfig::dashscope(&config.api_key, &config.chat_model).with_base_url(&config.base_url),
    )
    .context("invalid chat model configuration")?;
    let llm: Arc<dyn Llm> =
        Arc::new(ListenedLlm::new(Arc::new(client)).with_listener(Arc::new(LoggingListener)));

    let retriever = build_retriever(config).await?;
    let tools = build_tools(config.mcp_url.as_deref()).await?;
    let memory = Arc::new(ChatMemoryStore::new(config.max_messages)?);

    let mut builder = Orchestrator::builder()
        .llm(llm)
        .guardrails(GuardrailSet::new().with(SensitiveWordGuardrail::default()))
        .tools(tools)
        .memory(memory)
        .config(OrchestratorConfig { model: config.chat_model.clone(), ..OrchestratorConfig::default() });
    if let Some(retriever) = retriever {
        builder = builder.retriever(retriever);
    }
    Ok(CodepalService::new(builder.build()?))
}

async fn build_retriever(config: &AppConfig) -> anyhow::Result<Option<Arc<ContentRetriever>>> {
    if !config.docs_dir.is_dir() {
        warn!(docs_dir = %config.docs_dir.display(), "docs directory not found, retrieval disabled");
        return Ok(None);
    }

    let embeddings = OpenAiEmbeddingProvider::new(&config.api_key)?
        .with_base_url(&config.base_url)
        .with_model(&config.embedding_model);
    let pipeline = Arc::new(
        RagPipeline::builder()
            .embedding_provider(Arc::new(embeddings))
            .vector_store(Arc::new(InMemoryVectorStore::new()))
            .build()?,
    );
    pipeline.create_collection(KNOWLEDGE_COLLECTION).await?;

    let documents = FileSystemDocumentLoader::new()
        .load_documents(&config.docs_dir)
        .await
        .with_context(|| format!("failed to load documents from {}", config.docs_dir.display()))?;
    let chunks = pipeline.ingest_batch(KNOWLEDGE_COLLECTION, &documents).await?;
    info!(document_count = documents.len(), chunk_count = chunks.len(), "knowledge base ready");

    Ok(Some(Arc::new(ContentRetriever::new(pipeline, KNOWLEDGE_COLLECTION))))
}

/// The two web-search presets plus, when configured, the MCP server's tools.
pub async fn build_tools(mcp_url: Option<&str>) -> anyhow::Result<ToolRegistry> {
    let mut tools = ToolRegistry::new();
    tools.register(Arc::new(WebSearchTool::interview_questions()?))?;
    tools.register(Arc::new(WebSearchTool::code_questions()?))?;

    if let Some(url) = mcp_url {
        match McpToolset::connect_http(url).await {
            Ok(toolset) => {
                let toolset = toolset.with_name("mcp");
                if let Err(e) = tools.register_toolset(&toolset).await {
                    warn!(error = %e, "failed to register MCP tools");
                }
            }
            Err(e) => warn!(error = %e, "MCP server unavailable, continuing without it"),
        }
    }

    info!(tools = ?tools.names(), "tools registered");
    Ok(tools)
}
