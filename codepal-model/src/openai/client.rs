//! Client for OpenAI-compatible chat completion APIs.

use async_openai::{
    Client,
    config::OpenAIConfig as AsyncOpenAIConfig,
    types::{ChatCompletionStreamOptions, CreateChatCompletionRequestArgs},
};
use async_stream::try_stream;
use async_trait::async_trait;
use codepal_core::{CoreError, Llm, LlmRequest, LlmResponseStream, Result};
use futures::StreamExt;
use tracing::{debug, error};

use super::config::OpenAiConfig;
use super::convert::{self, StreamAggregator};

/// Chat model served over the OpenAI wire protocol (OpenAI, DashScope, vLLM...).
///
/// Requests are always streamed from the server. With `stream = false` the
/// deltas are folded and only the final response is yielded.
pub struct OpenAiCompatibleClient {
    client: Client<AsyncOpenAIConfig>,
    model: String,
    include_usage: bool,
}

impl OpenAiCompatibleClient {
    /// # Errors
    ///
    /// Returns [`CoreError::Config`] if the config is incomplete.
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        config.validate()?;
        let mut openai_config = AsyncOpenAIConfig::new().with_api_key(&config.api_key);
        if let Some(base_url) = &config.base_url {
            openai_config = openai_config.with_api_base(base_url);
        }

        Ok(Self {
            client: Client::with_config(openai_config),
            model: config.model,
            include_usage: config.include_usage,
        })
    }

    /// Create a client for an OpenAI-compatible API.
    pub fn compatible(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self> {
        Self::new(OpenAiConfig::compatible(api_key, base_url, model))
    }
}

#[async_trait]
impl Llm for OpenAiCompatibleClient {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate_content(&self, request: LlmRequest, stream: bool) -> Result<LlmResponseStream> {
        let model = if request.model.is_empty() { self.model.clone() } else { request.model.clone() };
        let client = self.client.clone();
        let include_usage = self.include_usage;

        let stream = try_stream! {
            let mut messages = Vec::with_capacity(request.contents.len());
            for content in &request.contents {
                messages.extend(convert::content_to_messages(content)?);
            }

            let mut request_builder = CreateChatCompletionRequestArgs::default();
            request_builder.model(&model).messages(messages);

            if !request.tools.is_empty() {
                request_builder.tools(convert::convert_tools(&request.tools));
            }
            if include_usage {
                request_builder.stream_options(ChatCompletionStreamOptions { include_usage: true });
            }

            if let Some(config) = &request.config {
                if let Some(temp) = config.temperature {
                    request_builder.temperature(temp);
                }
                if let Some(top_p) = config.top_p {
                    request_builder.top_p(top_p);
                }
                if let Some(max_tokens) = config.max_output_tokens {
                    request_builder.max_completion_tokens(max_tokens.max(0) as u32);
                }
            }

            let openai_request = request_builder
                .build()
                .map_err(|e| CoreError::Model(format!("Failed to build request: {e}")))?;

            debug!(model = %model, messages = request.contents.len(), tools = request.tools.len(), "sending chat request");
            let mut chunks = client.chat().create_stream(openai_request).await.map_err(|e| {
                error!(model = %model, error = %e, "chat request failed");
                CoreError::Model(format!("OpenAI API error: {e}"))
            })?;

            let mut aggregator = StreamAggregator::default();
            while let Some(chunk) = chunks.next().await {
                let chunk = chunk.map_err(|e| {
                    error!(model = %model, error = %e, "chat stream failed");
                    CoreError::Model(format!("Stream error: {e}"))
                })?;
                if let Some(delta) = aggregator.push(&chunk) {
                    if stream {
                        yield delta;
                    }
                }
            }

            yield aggregator.finish();
        };

        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_key() {
        let err = OpenAiCompatibleClient::compatible("", "http://localhost:8000/v1", "qwen-max")
            .err()
            .unwrap();
        assert!(matches!(err, CoreError::Config(_)));
    }

    #[test]
    fn name_is_model() {
        let client = OpenAiCompatibleClient::new(OpenAiConfig::dashscope("sk-test", "qwen-max")).unwrap();
        assert_eq!(client.name(), "qwen-max");
    }
}
