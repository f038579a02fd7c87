use std::sync::Arc;

use codepal_core::Content;
use tracing::{debug, warn};

use crate::{Guardrail, GuardrailError, GuardrailResult, Result, Severity};

/// An ordered collection of guardrails evaluated together.
#[derive(Clone, Default)]
pub struct GuardrailSet {
    guardrails: Vec<Arc<dyn Guardrail>>,
}

impl std::fmt::Debug for GuardrailSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.guardrails.iter().map(|g| g.name()).collect();
        f.debug_struct("GuardrailSet").field("guardrails", &names).finish()
    }
}

impl GuardrailSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a guardrail.
    pub fn with(mut self, guardrail: impl Guardrail + 'static) -> Self {
        self.guardrails.push(Arc::new(guardrail));
        self
    }

    /// Append a shared guardrail.
    pub fn with_arc(mut self, guardrail: Arc<dyn Guardrail>) -> Self {
        self.guardrails.push(guardrail);
        self
    }

    pub fn guardrails(&self) -> &[Arc<dyn Guardrail>] {
        &self.guardrails
    }

    pub fn is_empty(&self) -> bool {
        self.guardrails.is_empty()
    }

    pub fn len(&self) -> usize {
        self.guardrails.len()
    }
}

/// Run every guardrail in `set` against `content`, in order.
///
/// Each guardrail sees the output of the previous one, so transforms chain.
/// The first critical failure stops evaluation and returns
/// [`GuardrailError::ValidationFailed`]; non-critical failures are logged and
/// ignored. On success the (possibly transformed) content is returned.
pub async fn run_guardrails(set: &GuardrailSet, content: &Content) -> Result<Content> {
    let mut current = content.clone();
    for guardrail in set.guardrails() {
        match guardrail.validate(&current).await {
            GuardrailResult::Pass => {
                debug!(guardrail = guardrail.name(), "guardrail passed");
            }
            GuardrailResult::Fail { reason, severity } if severity == Severity::Critical => {
                warn!(guardrail = guardrail.name(), %reason, ?severity, "guardrail rejected content");
                return Err(GuardrailError::ValidationFailed {
                    name: guardrail.name().to_string(),
                    reason,
                    severity,
                });
            }
            GuardrailResult::Fail { reason, severity } => {
                warn!(guardrail = guardrail.name(), %reason, ?severity, "guardrail flagged content");
            }
            GuardrailResult::Transform { new_content, reason } => {
                debug!(guardrail = guardrail.name(), %reason, "guardrail transformed content");
                current = new_content;
            }
        }
    }
    Ok(current)
}
