//! Conversion between codepal content and OpenAI chat completion types.

use std::collections::BTreeMap;

use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessageArgs,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestToolMessageArgs, ChatCompletionRequestUserMessageArgs,
    ChatCompletionTool, ChatCompletionToolType, CreateChatCompletionStreamResponse,
    FinishReason as OpenAiFinishReason, FunctionCall, FunctionObject,
};
use codepal_core::{Content, CoreError, FinishReason, LlmResponse, Part, Result, UsageMetadata};
use serde_json::{Map, Value};
use tracing::warn;

fn build_error(e: impl std::fmt::Display) -> CoreError {
    CoreError::Model(format!("Failed to build message: {e}"))
}

/// Text sent back to the model for a tool result.
fn tool_output_text(response: &Value) -> String {
    match response.get("output") {
        Some(Value::String(text)) => text.clone(),
        _ => response.to_string(),
    }
}

fn tool_messages(content: &Content) -> Result<Vec<ChatCompletionRequestMessage>> {
    content
        .parts
        .iter()
        .filter_map(|part| match part {
            Part::FunctionResponse { id, name, response } => Some(
                ChatCompletionRequestToolMessageArgs::default()
                    .tool_call_id(id.clone().unwrap_or_else(|| name.clone()))
                    .content(tool_output_text(response))
                    .build()
                    .map(Into::into)
                    .map_err(build_error),
            ),
            _ => None,
        })
        .collect()
}

/// Convert one message into the OpenAI messages it expands to.
///
/// Function responses become one `tool` message each; function calls are
/// attached to the assistant message.
pub(crate) fn content_to_messages(content: &Content) -> Result<Vec<ChatCompletionRequestMessage>> {
    let text = content.text();
    match content.role.as_str() {
        "system" => Ok(vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(text)
                .build()
                .map_err(build_error)?
                .into(),
        ]),
        "model" | "assistant" => {
            let tool_calls: Vec<ChatCompletionMessageToolCall> = content
                .parts
                .iter()
                .filter_map(|part| match part {
                    Part::FunctionCall { id, name, args } => Some(ChatCompletionMessageToolCall {
                        id: id.clone().unwrap_or_else(|| name.clone()),
                        r#type: ChatCompletionToolType::Function,
                        function: FunctionCall { name: name.clone(), arguments: args.to_string() },
                    }),
                    _ => None,
                })
                .collect();

            let mut builder = ChatCompletionRequestAssistantMessageArgs::default();
            if !text.is_empty() {
                builder.content(text);
            }
            if !tool_calls.is_empty() {
                builder.tool_calls(tool_calls);
            }
            Ok(vec![builder.build().map_err(build_error)?.into()])
        }
        "tool" | "function" => tool_messages(content),
        _ => {
            let mut messages = tool_messages(content)?;
            if !text.is_empty() {
                messages.push(
                    ChatCompletionRequestUserMessageArgs::default()
                        .content(text)
                        .build()
                        .map_err(build_error)?
                        .into(),
                );
            }
            Ok(messages)
        }
    }
}

/// Convert tool declarations (`name -> {description, parameters}`).
pub(crate) fn convert_tools(tools: &Map<String, Value>) -> Vec<ChatCompletionTool> {
    tools
        .iter()
        .map(|(name, decl)| ChatCompletionTool {
            r#type: ChatCompletionToolType::Function,
            function: FunctionObject {
                name: name.clone(),
                description: decl.get("description").and_then(Value::as_str).map(str::to_string),
                parameters: decl.get("parameters").cloned(),
                strict: None,
            },
        })
        .collect()
}

#[derive(Debug, Default)]
struct PartialToolCall {
    id: Option<String>,
    name: String,
    arguments: String,
}

/// Folds stream chunks into text deltas and one final message.
///
/// Tool-call fragments arrive spread over many chunks, keyed by index; they
/// are only emitted, as complete [`Part::FunctionCall`]s, by
/// [`finish`](StreamAggregator::finish).
#[derive(Debug, Default)]
pub(crate) struct StreamAggregator {
    text: String,
    tool_calls: BTreeMap<u32, PartialToolCall>,
    finish_reason: Option<FinishReason>,
    usage: Option<UsageMetadata>,
}

impl StreamAggregator {
    /// Absorb a chunk, returning the text delta it carried, if any.
    pub(crate) fn push(&mut self, chunk: &CreateChatCompletionStreamResponse) -> Option<LlmResponse> {
        if let Some(usage) = &chunk.usage {
            self.usage = Some(UsageMetadata {
                prompt_token_count: usage.prompt_tokens,
                candidates_token_count: usage.completion_tokens,
                total_token_count: usage.total_tokens,
            });
        }

        let mut delta_text = String::new();
        for choice in &chunk.choices {
            if let Some(reason) = choice.finish_reason {
                self.finish_reason = Some(match reason {
                    OpenAiFinishReason::Stop => FinishReason::Stop,
                    OpenAiFinishReason::Length => FinishReason::MaxTokens,
                    OpenAiFinishReason::ToolCalls | OpenAiFinishReason::FunctionCall => {
                        FinishReason::ToolCalls
                    }
                    OpenAiFinishReason::ContentFilter => FinishReason::Other,
                });
            }
            if let Some(content) = &choice.delta.content {
                delta_text.push_str(content);
            }
            for fragment in choice.delta.tool_calls.iter().flatten() {
                let call = self.tool_calls.entry(fragment.index).or_default();
                if let Some(id) = &fragment.id {
                    call.id = Some(id.clone());
                }
                if let Some(function) = &fragment.function {
                    if let Some(name) = &function.name {
                        call.name.push_str(name);
                    }
                    if let Some(arguments) = &function.arguments {
                        call.arguments.push_str(arguments);
                    }
                }
            }
        }

        if delta_text.is_empty() {
            return None;
        }
        self.text.push_str(&delta_text);
        Some(LlmResponse::delta(delta_text))
    }

    /// The complete message with text and function calls, in index order.
    pub(crate) fn finish(self) -> LlmResponse {
        let mut content = Content::new("model");
        if !self.text.is_empty() {
            content = content.with_text(self.text);
        }
        let has_calls = !self.tool_calls.is_empty();
        for (_, call) in self.tool_calls {
            let args = if call.arguments.trim().is_empty() {
                Value::Object(Map::new())
            } else {
                serde_json::from_str(&call.arguments).unwrap_or_else(|e| {
                    warn!(tool = %call.name, error = %e, "tool call arguments are not valid JSON");
                    Value::String(call.arguments.clone())
                })
            };
            content = content.with_part(Part::FunctionCall { id: call.id, name: call.name, args });
        }

        let finish_reason = match self.finish_reason {
            Some(reason) => Some(reason),
            None if has_calls => Some(FinishReason::ToolCalls),
            None => Some(FinishReason::Stop),
        };

        LlmResponse {
            content: Some(content),
            partial: false,
            turn_complete: true,
            finish_reason,
            usage_metadata: self.usage,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn chunk(choices: Value) -> CreateChatCompletionStreamResponse {
        serde_json::from_value(json!({
            "id": "chatcmpl-1",
            "object": "chat.completion.chunk",
            "created": 1,
            "model": "qwen-max",
            "choices": choices,
        }))
        .unwrap()
    }

    #[test]
    fn text_deltas_accumulate() {
        let mut agg = StreamAggregator::default();
        let d1 = agg.push(&chunk(json!([{ "index": 0, "delta": { "role": "assistant", "content": "Hel" } }])));
        let d2 = agg.push(&chunk(json!([{ "index": 0, "delta": { "content": "lo" }, "finish_reason": "stop" }])));
        assert_eq!(d1.unwrap().content.unwrap().text(), "Hel");
        assert!(d2.unwrap().partial);

        let done = agg.finish();
        assert!(done.turn_complete);
        assert_eq!(done.content.unwrap().text(), "Hello");
        assert_eq!(done.finish_reason, Some(FinishReason::Stop));
    }

    #[test]
    fn tool_call_fragments_are_joined_per_index() {
        let mut agg = StreamAggregator::default();
        agg.push(&chunk(json!([{ "index": 0, "delta": { "tool_calls": [
            { "index": 0, "id": "call_a", "type": "function", "function": { "name": "CodeQuestionTool", "arguments": "{\"key" } },
            { "index": 1, "id": "call_b", "type": "function", "function": { "name": "InterviewQuestionTool", "arguments": "" } }
        ] } }])));
        let none = agg.push(&chunk(json!([{ "index": 0, "delta": { "tool_calls": [
            { "index": 0, "function": { "arguments": "word\": \"dp\"}" } },
            { "index": 1, "function": { "arguments": "{\"keyword\": \"tcp\"}" } }
        ] }, "finish_reason": "tool_calls" }])));
        assert!(none.is_none());

        let done = agg.finish();
        assert_eq!(done.finish_reason, Some(FinishReason::ToolCalls));
        let parts = done.content.unwrap().parts;
        assert_eq!(
            parts,
            vec![
                Part::FunctionCall {
                    id: Some("call_a".into()),
                    name: "CodeQuestionTool".into(),
                    args: json!({ "keyword": "dp" }),
                },
                Part::FunctionCall {
                    id: Some("call_b".into()),
                    name: "InterviewQuestionTool".into(),
                    args: json!({ "keyword": "tcp" }),
                },
            ]
        );
    }

    #[test]
    fn tools_convert_to_function_declarations() {
        let mut tools = Map::new();
        tools.insert(
            "CodeQuestionTool".into(),
            json!({ "description": "find questions", "parameters": { "type": "object" } }),
        );
        let converted = convert_tools(&tools);
        assert_eq!(converted.len(), 1);
        assert_eq!(converted[0].function.name, "CodeQuestionTool");
        assert_eq!(converted[0].function.description.as_deref(), Some("find questions"));
    }

    #[test]
    fn function_responses_become_tool_messages() {
        let content = Content::new("user")
            .with_part(Part::FunctionResponse {
                id: Some("call_a".into()),
                name: "CodeQuestionTool".into(),
                response: json!({ "output": "Two Sum" }),
            })
            .with_part(Part::FunctionResponse {
                id: Some("call_b".into()),
                name: "InterviewQuestionTool".into(),
                response: json!({ "output": "TCP handshake" }),
            });
        let messages = content_to_messages(&content).unwrap();
        assert_eq!(messages.len(), 2);
        assert!(matches!(messages[0], ChatCompletionRequestMessage::Tool(_)));
    }

    #[test]
    fn assistant_function_calls_are_preserved() {
        let content = Content::model("").with_part(Part::FunctionCall {
            id: Some("call_a".into()),
            name: "CodeQuestionTool".into(),
            args: json!({ "keyword": "dp" }),
        });
        let messages = content_to_messages(&content).unwrap();
        match &messages[0] {
            ChatCompletionRequestMessage::Assistant(assistant) => {
                let calls = assistant.tool_calls.as_ref().unwrap();
                assert_eq!(calls[0].id, "call_a");
                assert_eq!(calls[0].function.arguments, r#"{"keyword":"dp"}"#);
            }
            other => panic!("expected assistant message, got {other:?}"),
        }
    }
}
