//! Structured learning reports.

use std::sync::OnceLock;

use codepal_guardrail::{SchemaValidator, extract_json};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::{AgentError, Result};

/// Report name used when the input was rejected.
pub const REJECTED_REPORT_NAME: &str = "Validation failed";

/// A learning report: a title and ordered suggestions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub name: String,
    pub suggestion_list: Vec<String>,
}

impl Report {
    /// The report returned for input rejected by the guardrail.
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self { name: REJECTED_REPORT_NAME.to_string(), suggestion_list: vec![reason.into()] }
    }
}

/// JSON Schema the model's report must satisfy.
pub fn report_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "name": { "type": "string" },
            "suggestionList": { "type": "array", "items": { "type": "string" } }
        },
        "required": ["name", "suggestionList"]
    })
}

fn validator() -> Result<&'static SchemaValidator> {
    static VALIDATOR: OnceLock<std::result::Result<SchemaValidator, String>> = OnceLock::new();
    VALIDATOR
        .get_or_init(|| SchemaValidator::new(&report_schema()).map_err(|e| e.to_string()))
        .as_ref()
        .map_err(|e| AgentError::StructuredOutput(e.clone()))
}

/// Parse a report out of free-form model output.
///
/// Accepts bare JSON, a fenced code block or the outermost `{...}` span.
///
/// # Errors
///
/// Returns [`AgentError::StructuredOutput`] if no JSON object is found or it
/// does not match [`report_schema`].
pub fn parse_report(text: &str) -> Result<Report> {
    let value = extract_json(text)
        .ok_or_else(|| AgentError::StructuredOutput("no JSON found in model output".into()))?;
    validator()?.check(&value).map_err(AgentError::StructuredOutput)?;
    serde_json::from_value(value).map_err(|e| AgentError::StructuredOutput(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fenced_report() {
        let text = "Here you go:\n```json\n{\"name\": \"Rust plan\", \"suggestionList\": [\"read the book\", \"write a CLI\"]}\n```";
        let report = parse_report(text).unwrap();
        assert_eq!(report.name, "Rust plan");
        assert_eq!(report.suggestion_list, vec!["read the book", "write a CLI"]);
    }

    #[test]
    fn serializes_camel_case() {
        let value = serde_json::to_value(Report::rejected("Sensitive word detected: fuck")).unwrap();
        assert_eq!(value, json!({ "name": "Validation failed", "suggestionList": ["Sensitive word detected: fuck"] }));
    }

    #[test]
    fn schema_mismatch_is_structured_output_error() {
        let err = parse_report(r#"{"name": "x", "suggestionList": "not a list"}"#).unwrap_err();
        assert!(matches!(err, AgentError::StructuredOutput(_)));
        assert!(matches!(parse_report("no json here"), Err(AgentError::StructuredOutput(_))));
    }
}
