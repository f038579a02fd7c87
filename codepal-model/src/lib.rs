//! # codepal-model
//!
//! Chat model implementations of [`codepal_core::Llm`]:
//!
//! - [`OpenAiCompatibleClient`]: any OpenAI-compatible chat completions API,
//!   DashScope (`qwen-max`) by default
//! - [`MockLlm`]: scripted responses for tests
//! - [`ListenedLlm`]: wraps a model and reports each call to
//!   [`ChatModelListener`]s such as [`LoggingListener`]
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use codepal_model::{ListenedLlm, LoggingListener, OpenAiCompatibleClient, OpenAiConfig};
//!
//! let client = OpenAiCompatibleClient::new(OpenAiConfig::dashscope(api_key, "qwen-max"))?;
//! let model = ListenedLlm::new(Arc::new(client)).with_listener(Arc::new(LoggingListener));
//! ```

pub mod listener;
pub mod mock;
#[cfg(feature = "openai")]
pub mod openai;

pub use listener::{
    ChatModelErrorContext, ChatModelListener, ChatModelRequestContext, ChatModelResponseContext,
    ListenedLlm, LoggingListener,
};
pub use mock::MockLlm;
#[cfg(feature = "openai")]
pub use openai::{DASHSCOPE_API_BASE, DEFAULT_CHAT_MODEL, OpenAiCompatibleClient, OpenAiConfig};
