//! Error types shared across codepal crates.

use thiserror::Error;

/// Errors raised by models, tools and the other core abstractions.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The chat model failed or returned something unusable.
    #[error("Model error: {0}")]
    Model(String),

    /// A tool could not be executed.
    #[error("Tool error: {0}")]
    Tool(String),

    /// Invalid or missing configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Session or memory bookkeeping failed.
    #[error("Session error: {0}")]
    Session(String),
}

/// A convenience result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
