use thiserror::Error;

use crate::Severity;

/// Errors raised by guardrail evaluation.
#[derive(Debug, Error)]
pub enum GuardrailError {
    /// A guardrail rejected the content.
    #[error("Guardrail '{name}' rejected content: {reason}")]
    ValidationFailed { name: String, reason: String, severity: Severity },

    /// A JSON Schema could not be compiled.
    #[error("Schema error: {0}")]
    Schema(String),
}

impl GuardrailError {
    /// The human-readable rejection reason, without the guardrail name.
    pub fn reason(&self) -> &str {
        match self {
            Self::ValidationFailed { reason, .. } => reason,
            Self::Schema(message) => message,
        }
    }
}

pub type Result<T> = std::result::Result<T, GuardrailError>;
