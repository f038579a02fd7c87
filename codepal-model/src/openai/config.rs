//! Connection settings for OpenAI-compatible chat endpoints.

use codepal_core::{CoreError, Result};

/// DashScope's OpenAI-compatible endpoint.
pub const DASHSCOPE_API_BASE: &str = "https://dashscope.aliyuncs.com/compatible-mode/v1";

/// Default chat model on DashScope.
pub const DEFAULT_CHAT_MODEL: &str = "qwen-max";

/// Settings for [`OpenAiCompatibleClient`](super::OpenAiCompatibleClient).
#[derive(Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub model: String,
    /// `None` uses the official OpenAI endpoint.
    pub base_url: Option<String>,
    /// Ask the server to append token usage to the stream.
    pub include_usage: bool,
}

impl std::fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("include_usage", &self.include_usage)
            .finish_non_exhaustive()
    }
}

impl OpenAiConfig {
    /// Official OpenAI endpoint.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self { api_key: api_key.into(), model: model.into(), base_url: None, include_usage: true }
    }

    /// Any OpenAI-compatible endpoint.
    pub fn compatible(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self::new(api_key, model).with_base_url(base_url)
    }

    /// DashScope compatible mode (Qwen models).
    pub fn dashscope(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self::compatible(api_key, DASHSCOPE_API_BASE, model)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into().trim_end_matches('/').to_string());
        self
    }

    pub fn with_include_usage(mut self, include_usage: bool) -> Self {
        self.include_usage = include_usage;
        self
    }

    /// # Errors
    ///
    /// Returns [`CoreError::Config`] if the API key or model is empty.
    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(CoreError::Config("API key must not be empty".into()));
        }
        if self.model.trim().is_empty() {
            return Err(CoreError::Config("model must not be empty".into()));
        }
        Ok(())
    }
}
