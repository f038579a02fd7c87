use async_trait::async_trait;
use codepal_core::Content;
use serde::{Deserialize, Serialize};

/// How serious a guardrail failure is.
///
/// Only [`Severity::Critical`] failures reject content; lower severities are
/// logged and let through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// Verdict of a single guardrail.
#[derive(Debug, Clone, PartialEq)]
pub enum GuardrailResult {
    /// Content is acceptable as is.
    Pass,
    /// Content violates the guardrail.
    Fail { reason: String, severity: Severity },
    /// Content is acceptable after being rewritten.
    Transform { new_content: Content, reason: String },
}

impl GuardrailResult {
    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass)
    }

    pub fn is_fail(&self) -> bool {
        matches!(self, Self::Fail { .. })
    }

    /// A failure that must reject the content.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fail { severity: Severity::Critical, .. })
    }
}

/// A validation step applied to model input or output.
#[async_trait]
pub trait Guardrail: Send + Sync {
    /// Name used in logs and rejection errors.
    fn name(&self) -> &str;

    /// Inspect `content` and return a verdict.
    async fn validate(&self, content: &Content) -> GuardrailResult;
}
