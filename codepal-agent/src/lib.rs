//! # codepal-agent
//!
//! The conversation layer of codepal. An [`Orchestrator`] runs each turn as
//! an explicit state machine:
//!
//! 1. input guardrails (a critical failure rejects the message)
//! 2. retrieval of knowledge-base segments into the system prompt
//! 3. model invocation, looping through concurrent tool calls
//! 4. the answer, appended to the session's memory window
//!
//! [`CodepalService`] exposes plain, report, RAG and streaming variants of a
//! turn. [`AppConfig`] reads the process configuration.

pub mod config;
pub mod error;
pub mod orchestrator;
pub mod prompts;
pub mod report;
pub mod service;
pub mod stream;

pub use config::AppConfig;
pub use error::{AgentError, Result};
pub use orchestrator::{
    AnswerValidator, DEFAULT_MAX_TOOL_ROUNDS, Orchestrator, OrchestratorBuilder, OrchestratorConfig, REJECTION_PREFIX,
    ToolCallRequest, TurnOptions, TurnOutcome, TurnState,
};
pub use report::{Report, parse_report, report_schema};
pub use service::{CodepalService, RagAnswer};
pub use stream::{ChatStream, STREAM_CAPACITY};
