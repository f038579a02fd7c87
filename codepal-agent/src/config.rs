//! Process configuration read from the environment.

use std::path::PathBuf;
use std::time::Duration;

use tracing::debug;

use crate::error::{AgentError, Result};

pub const DEFAULT_BASE_URL: &str = "https://dashscope.aliyuncs.com/compatible-mode/v1";
pub const DEFAULT_CHAT_MODEL: &str = "qwen-max";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-v4";
pub const DEFAULT_DOCS_DIR: &str = "docs";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8081";
pub const DEFAULT_MAX_MESSAGES: usize = 10;
pub const DEFAULT_SESSION_IDLE_SECS: u64 = 3600;

/// BigModel's hosted web-search MCP endpoint; the key is appended as the
/// `Authorization` query parameter.
pub const BIGMODEL_MCP_URL: &str = "https://open.bigmodel.cn/api/mcp/web_search/mcp";

/// Settings for the whole application.
///
/// | Variable | Default |
/// |----------|---------|
/// | `DASHSCOPE_API_KEY` | required |
/// | `CODEPAL_BASE_URL` | DashScope compatible mode |
/// | `CODEPAL_CHAT_MODEL` | `qwen-max` |
/// | `CODEPAL_EMBEDDING_MODEL` | `text-embedding-v4` |
/// | `CODEPAL_DOCS_DIR` | `docs` |
/// | `CODEPAL_MCP_URL` | derived from `BIGMODEL_API_KEY`, else none |
/// | `CODEPAL_BIND_ADDR` | `0.0.0.0:8081` |
/// | `CODEPAL_MAX_MESSAGES` | `10` |
/// | `CODEPAL_SESSION_IDLE_SECS` | `3600`; `0` keeps sessions forever |
/// | `CODEPAL_LOG_FORMAT` | `text`; read by `codepal-telemetry` |
#[derive(Clone)]
pub struct AppConfig {
    pub api_key: String,
    pub base_url: String,
    pub chat_model: String,
    pub embedding_model: String,
    pub docs_dir: PathBuf,
    pub mcp_url: Option<String>,
    pub bind_addr: String,
    pub max_messages: usize,
    /// Sessions unchanged for this long are forgotten.
    pub session_idle_timeout: Option<Duration>,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("base_url", &self.base_url)
            .field("chat_model", &self.chat_model)
            .field("embedding_model", &self.embedding_model)
            .field("docs_dir", &self.docs_dir)
            .field("mcp_enabled", &self.mcp_url.is_some())
            .field("bind_addr", &self.bind_addr)
            .field("max_messages", &self.max_messages)
            .field("session_idle_timeout", &self.session_idle_timeout)
            .finish_non_exhaustive()
    }
}

impl AppConfig {
    /// Load `.env` (if present), then read the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Config`] if `DASHSCOPE_API_KEY` is missing or a
    /// value cannot be parsed.
    pub fn from_env() -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            debug!(path = %path.display(), "loaded .env");
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let api_key = var("DASHSCOPE_API_KEY")
            .ok_or_else(|| AgentError::Config("DASHSCOPE_API_KEY is not set".into()))?;

        let max_messages = match var("CODEPAL_MAX_MESSAGES") {
            Some(raw) => raw.parse::<usize>().ok().filter(|n| *n > 0).ok_or_else(|| {
                AgentError::Config(format!("CODEPAL_MAX_MESSAGES must be a positive integer, got '{raw}'"))
            })?,
            None => DEFAULT_MAX_MESSAGES,
        };

        let idle_secs = match var("CODEPAL_SESSION_IDLE_SECS") {
            Some(raw) => raw.parse::<u64>().map_err(|_| {
                AgentError::Config(format!("CODEPAL_SESSION_IDLE_SECS must be a whole number of seconds, got '{raw}'"))
            })?,
            None => DEFAULT_SESSION_IDLE_SECS,
        };

        let mcp_url = var("CODEPAL_MCP_URL").or_else(|| {
            var("BIGMODEL_API_KEY").map(|key| format!("{BIGMODEL_MCP_URL}?Authorization={key}"))
        });

        Ok(Self {
            api_key,
            base_url: var("CODEPAL_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            chat_model: var("CODEPAL_CHAT_MODEL").unwrap_or_else(|| DEFAULT_CHAT_MODEL.to_string()),
            embedding_model: var("CODEPAL_EMBEDDING_MODEL")
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
            docs_dir: var("CODEPAL_DOCS_DIR").unwrap_or_else(|| DEFAULT_DOCS_DIR.to_string()).into(),
            mcp_url,
            bind_addr: var("CODEPAL_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            max_messages,
            session_idle_timeout: (idle_secs > 0).then(|| Duration::from_secs(idle_secs)),
        })
    }
}
