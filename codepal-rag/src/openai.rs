//! Embedding provider for OpenAI-compatible `/embeddings` endpoints.
//!
//! Only available with the `openai` feature. Defaults target DashScope's
//! compatible mode and `text-embedding-v4`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};

/// Default OpenAI-compatible base URL.
pub const DEFAULT_BASE_URL: &str = "https://dashscope.aliyuncs.com/compatible-mode/v1";

/// Default embedding model.
pub const DEFAULT_MODEL: &str = "text-embedding-v4";

/// Default dimensionality of `text-embedding-v4`.
pub const DEFAULT_DIMENSIONS: usize = 1024;

/// Most compatible endpoints cap a single request at ten inputs.
const MAX_BATCH: usize = 10;

const PROVIDER: &str = "OpenAiCompatible";

/// An [`EmbeddingProvider`] calling `{base_url}/embeddings` with `reqwest`.
///
/// # Example
///
/// ```rust,ignore
/// use codepal_rag::openai::OpenAiEmbeddingProvider;
///
/// let provider = OpenAiEmbeddingProvider::new("sk-...")?
///     .with_base_url("https://api.openai.com/v1")
///     .with_model("text-embedding-3-small")
///     .with_dimensions(1536);
/// ```
pub struct OpenAiEmbeddingProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    dimensions: usize,
    request_dimensions: Option<usize>,
}

impl std::fmt::Debug for OpenAiEmbeddingProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiEmbeddingProvider")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("dimensions", &self.dimensions)
            .finish_non_exhaustive()
    }
}

impl OpenAiEmbeddingProvider {
    /// Create a provider with the given API key and default endpoint/model.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(RagError::embedding(PROVIDER, "API key must not be empty"));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: DEFAULT_BASE_URL.into(),
            model: DEFAULT_MODEL.into(),
            dimensions: DEFAULT_DIMENSIONS,
            request_dimensions: None,
        })
    }

    /// Create a provider using the `DASHSCOPE_API_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("DASHSCOPE_API_KEY")
            .map_err(|_| RagError::embedding(PROVIDER, "DASHSCOPE_API_KEY is not set"))?;
        Self::new(api_key)
    }

    /// Set the base URL (without the trailing `/embeddings`).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the model name.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Request embeddings of a specific size.
    ///
    /// Also updates the value returned by
    /// [`dimensions()`](EmbeddingProvider::dimensions).
    pub fn with_dimensions(mut self, dims: usize) -> Self {
        self.dimensions = dims;
        self.request_dimensions = Some(dims);
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/embeddings", self.base_url)
    }

    /// One `/embeddings` call for at most [`MAX_BATCH`] texts.
    async fn embed_request(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let body = EmbeddingRequest { model: &self.model, input: texts, dimensions: self.request_dimensions };
        let fail = |message: String| {
            error!(provider = PROVIDER, model = %self.model, %message, "embedding call failed");
            RagError::embedding(PROVIDER, message)
        };

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| fail(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let raw = response.text().await.unwrap_or_default();
            let detail = match serde_json::from_str::<ErrorResponse>(&raw) {
                Ok(parsed) => parsed.error.message,
                Err(_) => raw,
            };
            return Err(fail(format!("{status}: {detail}")));
        }

        let mut parsed: EmbeddingResponse =
            response.json().await.map_err(|e| fail(format!("unreadable response: {e}")))?;
        if parsed.data.len() != texts.len() {
            return Err(fail(format!("asked for {} vectors, got {}", texts.len(), parsed.data.len())));
        }
        // `index` is authoritative; DashScope does not promise input order.
        parsed.data.sort_by_key(|item| item.index);
        Ok(parsed.data.into_iter().map(|item| item.embedding).collect())
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddingProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(provider = PROVIDER, text_len = text.len(), "embedding single text");

        let results = self.embed_request(&[text]).await?;
        results.into_iter().next().ok_or_else(|| RagError::embedding(PROVIDER, "empty response"))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut all = Vec::with_capacity(texts.len());
        for batch in texts.chunks(MAX_BATCH) {
            debug!(provider = PROVIDER, batch_size = batch.len(), model = %self.model, "embedding batch");
            all.extend(self.embed_request(batch).await?);
        }
        Ok(all)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_key_rejected() {
        assert!(OpenAiEmbeddingProvider::new("").is_err());
    }

    #[test]
    fn base_url_trailing_slash_trimmed() {
        let provider = OpenAiEmbeddingProvider::new("k").unwrap().with_base_url("http://x/v1/");
        assert_eq!(provider.endpoint(), "http://x/v1/embeddings");
        assert_eq!(provider.dimensions(), DEFAULT_DIMENSIONS);
    }

    #[tokio::test]
    async fn empty_batch_makes_no_request() {
        let provider =
            OpenAiEmbeddingProvider::new("k").unwrap().with_base_url("http://127.0.0.1:1");
        assert!(provider.embed_batch(&[]).await.unwrap().is_empty());
    }
}
