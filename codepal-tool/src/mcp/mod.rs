mod toolset;

pub use toolset::{McpToolset, ToolFilter};
