//! # codepal-tool
//!
//! Tools the model can call during a conversation.
//!
//! - [`WebSearchTool`]: keyword search on a web page scraped with a CSS
//!   selector; [`WebSearchTool::code_questions`] and
//!   [`WebSearchTool::interview_questions`] are the built-in presets.
//! - [`McpToolset`]: the tools of a remote MCP server.
//! - [`ToolRegistry`]: the name-indexed set handed to the orchestrator.

pub mod mcp;
pub mod registry;
pub mod web_search;

pub use mcp::{McpToolset, ToolFilter};
pub use registry::ToolRegistry;
pub use web_search::{FETCH_TIMEOUT, USER_AGENT, WebSearchTool, WebSearchToolBuilder};
