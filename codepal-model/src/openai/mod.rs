//! OpenAI-compatible chat models (OpenAI, DashScope/Qwen and others).

mod client;
mod config;
mod convert;

pub use client::OpenAiCompatibleClient;
pub use config::{DASHSCOPE_API_BASE, DEFAULT_CHAT_MODEL, OpenAiConfig};
