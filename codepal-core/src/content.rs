//! Role-tagged message content.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single message: a role (`system`, `user`, `model`, `tool`) and its parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    pub role: String,
    pub parts: Vec<Part>,
}

/// One piece of a [`Content`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Part {
    /// Plain text.
    Text { text: String },
    /// A tool call requested by the model.
    FunctionCall {
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        name: String,
        args: Value,
    },
    /// The result of a tool call, fed back to the model.
    FunctionResponse {
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        name: String,
        response: Value,
    },
}

impl Content {
    /// Create empty content with the given role.
    pub fn new(role: impl Into<String>) -> Self {
        Self { role: role.into(), parts: Vec::new() }
    }

    /// Append a text part.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.parts.push(Part::Text { text: text.into() });
        self
    }

    /// Append an arbitrary part.
    pub fn with_part(mut self, part: Part) -> Self {
        self.parts.push(part);
        self
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::new("system").with_text(text)
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new("user").with_text(text)
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self::new("model").with_text(text)
    }

    /// Concatenate all text parts.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|part| match part {
                Part::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Whether this content asks for at least one tool call.
    pub fn has_function_calls(&self) -> bool {
        self.parts.iter().any(|p| matches!(p, Part::FunctionCall { .. }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn text_joins_only_text_parts() {
        let content = Content::new("model").with_text("Hello, ").with_part(Part::FunctionCall {
            id: Some("call_1".into()),
            name: "lookup".into(),
            args: json!({}),
        });
        let content = content.with_text("world");

        assert_eq!(content.text(), "Hello, world");
        assert!(content.has_function_calls());
    }

    #[test]
    fn part_serializes_snake_case() {
        let part = Part::Text { text: "hi".into() };
        let value = serde_json::to_value(&part).unwrap();
        assert_eq!(value, json!({ "text": { "text": "hi" } }));
    }
}
