//! The chat model abstraction.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::content::Content;
use crate::error::Result;

/// Sampling parameters forwarded to the model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerateContentConfig {
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub max_output_tokens: Option<i32>,
}

/// A request to a chat model.
///
/// `tools` maps a tool name to its declaration
/// (`{"description": ..., "parameters": ...}`).
#[derive(Debug, Clone, Default)]
pub struct LlmRequest {
    pub model: String,
    pub contents: Vec<Content>,
    pub tools: Map<String, Value>,
    pub config: Option<GenerateContentConfig>,
}

impl LlmRequest {
    pub fn new(model: impl Into<String>, contents: Vec<Content>) -> Self {
        Self { model: model.into(), contents, tools: Map::new(), config: None }
    }

    pub fn with_tools(mut self, tools: Map<String, Value>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_config(mut self, config: GenerateContentConfig) -> Self {
        self.config = Some(config);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FinishReason {
    Stop,
    MaxTokens,
    ToolCalls,
    Other,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageMetadata {
    pub prompt_token_count: u32,
    pub candidates_token_count: u32,
    pub total_token_count: u32,
}

/// One item of a model response stream.
///
/// Streaming providers yield `partial` text deltas followed by one final item
/// with `turn_complete` set, carrying the whole message including any
/// function calls.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LlmResponse {
    pub content: Option<Content>,
    pub partial: bool,
    pub turn_complete: bool,
    pub finish_reason: Option<FinishReason>,
    pub usage_metadata: Option<UsageMetadata>,
}

impl LlmResponse {
    /// A complete, non-streamed response.
    pub fn complete(content: Content) -> Self {
        Self {
            content: Some(content),
            partial: false,
            turn_complete: true,
            finish_reason: Some(FinishReason::Stop),
            usage_metadata: None,
        }
    }

    /// A streamed text delta.
    pub fn delta(text: impl Into<String>) -> Self {
        Self {
            content: Some(Content::model(text)),
            partial: true,
            turn_complete: false,
            finish_reason: None,
            usage_metadata: None,
        }
    }
}

pub type LlmResponseStream = Pin<Box<dyn Stream<Item = Result<LlmResponse>> + Send>>;

/// A chat model.
#[async_trait]
pub trait Llm: Send + Sync {
    /// Model identifier, used in logs and requests.
    fn name(&self) -> &str;

    /// Generate a response. With `stream` set, implementations should yield
    /// text deltas as they arrive; otherwise a single complete response.
    async fn generate_content(&self, request: LlmRequest, stream: bool)
    -> Result<LlmResponseStream>;
}
