use std::sync::LazyLock;

use async_trait::async_trait;
use codepal_core::{Content, Part};
use jsonschema::Validator;
use regex::Regex;
use serde_json::Value;

use crate::{Guardrail, GuardrailError, GuardrailResult, Severity};

static JSON_OBJECT_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{[\s\S]*\}").expect("valid object span regex"));

/// Pull a JSON value out of model output.
///
/// Tries, in order: the whole text, the first fenced markdown block, and the
/// span from the first `{` to the last `}`.
pub fn extract_json(text: &str) -> Option<Value> {
    if let Ok(json) = serde_json::from_str(text.trim()) {
        return Some(json);
    }
    if let Some(json) = extract_json_from_markdown(text).and_then(|s| serde_json::from_str(&s).ok())
    {
        return Some(json);
    }
    JSON_OBJECT_SPAN.find(text).and_then(|m| serde_json::from_str(m.as_str()).ok())
}

fn extract_json_from_markdown(text: &str) -> Option<String> {
    let start_markers = ["```json\n", "```json\r\n", "```\n", "```\r\n"];
    let end_marker = "```";

    for start in start_markers {
        if let Some(start_idx) = text.find(start) {
            let content_start = start_idx + start.len();
            if let Some(end_idx) = text[content_start..].find(end_marker) {
                return Some(text[content_start..content_start + end_idx].trim().to_string());
            }
        }
    }
    None
}

/// Checks that model output contains JSON matching a schema.
pub struct SchemaValidator {
    name: String,
    validator: Validator,
    severity: Severity,
}

impl std::fmt::Debug for SchemaValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaValidator")
            .field("name", &self.name)
            .field("severity", &self.severity)
            .finish_non_exhaustive()
    }
}

impl SchemaValidator {
    /// Compile a validator from a JSON Schema value.
    pub fn new(schema: &Value) -> Result<Self, GuardrailError> {
        let validator = Validator::new(schema)
            .map_err(|e| GuardrailError::Schema(format!("Invalid schema: {e}")))?;

        Ok(Self { name: "schema_validator".to_string(), validator, severity: Severity::High })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Validate an already extracted value.
    pub fn check(&self, json: &Value) -> Result<(), String> {
        self.validator.validate(json).map_err(|error| format!("Schema validation failed: {error}"))
    }

    fn find_json(content: &Content) -> Option<Value> {
        content.parts.iter().find_map(|part| match part {
            Part::Text { text } => extract_json(text),
            _ => None,
        })
    }
}

#[async_trait]
impl Guardrail for SchemaValidator {
    fn name(&self) -> &str {
        &self.name
    }

    async fn validate(&self, content: &Content) -> GuardrailResult {
        let Some(json) = Self::find_json(content) else {
            return GuardrailResult::Fail {
                reason: "Content does not contain valid JSON".to_string(),
                severity: self.severity,
            };
        };

        match self.check(&json) {
            Ok(()) => GuardrailResult::Pass,
            Err(reason) => GuardrailResult::Fail { reason, severity: self.severity },
        }
    }
}
