//! # codepal-core
//!
//! Core types shared by every codepal crate:
//!
//! - [`Content`] / [`Part`]: role-tagged messages exchanged with a model
//! - [`Llm`]: the chat model abstraction ([`LlmRequest`] in, [`LlmResponseStream`] out)
//! - [`Tool`] / [`Toolset`]: model-invocable functions
//! - [`CoreError`]: the shared error type

pub mod content;
pub mod error;
pub mod model;
pub mod tool;

pub use content::{Content, Part};
pub use error::{CoreError, Result};
pub use model::{
    FinishReason, GenerateContentConfig, Llm, LlmRequest, LlmResponse, LlmResponseStream,
    UsageMetadata,
};
pub use tool::{CallContext, Tool, ToolContext, Toolset};
