use codepal_core::CoreError;
use codepal_guardrail::GuardrailError;
use codepal_rag::RagError;
use thiserror::Error;

/// Errors that fail a conversation turn.
///
/// A guardrail rejection is not an error; it is reported as
/// [`TurnOutcome::Rejected`](crate::TurnOutcome::Rejected).
#[derive(Debug, Error)]
pub enum AgentError {
    /// Missing or invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The chat model failed.
    #[error("Model error: {0}")]
    Model(String),

    /// Retrieval (embedding or vector search) failed.
    #[error(transparent)]
    Rag(#[from] RagError),

    #[error(transparent)]
    Guardrail(#[from] GuardrailError),

    /// The model's answer could not be turned into the requested structure.
    #[error("Structured output error: {0}")]
    StructuredOutput(String),

    /// The consumer went away before the turn finished.
    #[error("Turn cancelled")]
    Cancelled,

    #[error(transparent)]
    Core(CoreError),
}

impl From<CoreError> for AgentError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::Model(message) => Self::Model(message),
            CoreError::Config(message) => Self::Config(message),
            other => Self::Core(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, AgentError>;
