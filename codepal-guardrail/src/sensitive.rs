use std::collections::HashSet;
use std::sync::LazyLock;

use async_trait::async_trait;
use codepal_core::Content;
use regex::Regex;

use crate::{Guardrail, GuardrailResult, Severity};

/// Words rejected by [`SensitiveWordGuardrail::default`].
pub const DEFAULT_SENSITIVE_WORDS: &[&str] = &["fuck", "fucker", "motherfucker"];

// ASCII word characters only, so CJK text next to a word still splits it off.
static NON_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^0-9A-Za-z_]+").expect("valid token regex"));

/// Rejects input containing a denylisted word.
///
/// Text is lower-cased and split on runs of non-word characters; a token
/// matches only if it equals a denylisted word exactly, so `"scunthorpe"`
/// passes a denylist containing `"cunt"`.
#[derive(Debug, Clone)]
pub struct SensitiveWordGuardrail {
    name: String,
    words: HashSet<String>,
    severity: Severity,
}

impl Default for SensitiveWordGuardrail {
    fn default() -> Self {
        Self::new(DEFAULT_SENSITIVE_WORDS.iter().copied())
    }
}

impl SensitiveWordGuardrail {
    /// Create a guardrail with a custom denylist.
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            name: "sensitive_words".to_string(),
            words: words.into_iter().map(|w| w.as_ref().to_lowercase()).collect(),
            severity: Severity::Critical,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// The first denylisted token in `text`, if any.
    pub fn find_sensitive_word(&self, text: &str) -> Option<String> {
        let lowered = text.to_lowercase();
        NON_WORD
            .split(&lowered)
            .find(|token| !token.is_empty() && self.words.contains(*token))
            .map(str::to_string)
    }
}

#[async_trait]
impl Guardrail for SensitiveWordGuardrail {
    fn name(&self) -> &str {
        &self.name
    }

    async fn validate(&self, content: &Content) -> GuardrailResult {
        match self.find_sensitive_word(&content.text()) {
            Some(word) => GuardrailResult::Fail {
                reason: format!("Sensitive word detected: {word}"),
                severity: self.severity,
            },
            None => GuardrailResult::Pass,
        }
    }
}
