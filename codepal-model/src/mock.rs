//! Scripted chat model for tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_stream::try_stream;
use async_trait::async_trait;
use codepal_core::{
    Content, CoreError, FinishReason, Llm, LlmRequest, LlmResponse, LlmResponseStream, Part, Result,
};
use serde_json::Value;

#[derive(Debug, Clone)]
enum Turn {
    Respond(Content),
    Fail(String),
}

/// A [`Llm`] that replays queued turns, one per `generate_content` call.
///
/// Streaming splits text into word deltas before the final response.
/// Every request is recorded and can be inspected with
/// [`requests`](MockLlm::requests).
///
/// ```rust,ignore
/// let llm = MockLlm::new("mock")
///     .with_function_call("CodeQuestionTool", json!({ "keyword": "dp" }))
///     .with_text("Here are some questions.");
/// ```
#[derive(Debug)]
pub struct MockLlm {
    name: String,
    turns: Mutex<VecDeque<Turn>>,
    requests: Mutex<Vec<LlmRequest>>,
    chunk_delay: Option<Duration>,
}

impl MockLlm {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            turns: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            chunk_delay: None,
        }
    }

    /// Queue a plain text answer.
    pub fn with_text(self, text: impl Into<String>) -> Self {
        self.with_response(Content::model(text))
    }

    /// Queue a turn that asks for a single tool call.
    pub fn with_function_call(self, name: impl Into<String>, args: Value) -> Self {
        let name = name.into();
        let id = format!("call_{name}");
        self.with_response(Content::new("model").with_part(Part::FunctionCall { id: Some(id), name, args }))
    }

    /// Queue an arbitrary model message.
    pub fn with_response(self, content: Content) -> Self {
        self.push(Turn::Respond(content));
        self
    }

    /// Queue a failing turn.
    pub fn with_error(self, message: impl Into<String>) -> Self {
        self.push(Turn::Fail(message.into()));
        self
    }

    /// Sleep between streamed items.
    pub fn with_chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = Some(delay);
        self
    }

    /// Requests received so far, oldest first.
    pub fn requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// Turns not yet consumed.
    pub fn remaining(&self) -> usize {
        self.turns.lock().map(|t| t.len()).unwrap_or(0)
    }

    fn push(&self, turn: Turn) {
        if let Ok(mut turns) = self.turns.lock() {
            turns.push_back(turn);
        }
    }

    fn next_turn(&self) -> Result<Turn> {
        self.turns
            .lock()
            .map_err(|_| CoreError::Model("mock state poisoned".into()))?
            .pop_front()
            .ok_or_else(|| CoreError::Model(format!("{}: no scripted response left", self.name)))
    }
}

/// Split `text` into deltas that concatenate back to it.
fn word_deltas(text: &str) -> Vec<String> {
    text.split_inclusive(' ').map(str::to_string).collect()
}

#[async_trait]
impl Llm for MockLlm {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate_content(&self, request: LlmRequest, stream: bool) -> Result<LlmResponseStream> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }
        let content = match self.next_turn()? {
            Turn::Respond(content) => content,
            Turn::Fail(message) => return Err(CoreError::Model(message)),
        };
        let delay = self.chunk_delay;

        let stream = try_stream! {
            if stream {
                for delta in word_deltas(&content.text()) {
                    if let Some(delay) = delay {
                        tokio::time::sleep(delay).await;
                    }
                    yield LlmResponse::delta(delta);
                }
            }
            let finish_reason =
                if content.has_function_calls() { FinishReason::ToolCalls } else { FinishReason::Stop };
            yield LlmResponse { finish_reason: Some(finish_reason), ..LlmResponse::complete(content) };
        };

        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn streams_words_then_final() {
        let llm = MockLlm::new("mock").with_text("hello rust world");
        let items: Vec<_> = llm
            .generate_content(LlmRequest::new("mock", vec![Content::user("hi")]), true)
            .await
            .unwrap()
            .collect()
            .await;
        let items: Vec<LlmResponse> = items.into_iter().map(|r| r.unwrap()).collect();

        assert_eq!(items.len(), 4);
        let streamed: String =
            items[..3].iter().map(|r| r.content.as_ref().unwrap().text()).collect();
        assert_eq!(streamed, "hello rust world");
        assert!(items[3].turn_complete);
        assert_eq!(items[3].content.as_ref().unwrap().text(), "hello rust world");
    }

    #[tokio::test]
    async fn function_call_turn_reports_tool_calls() {
        let llm = MockLlm::new("mock").with_function_call("CodeQuestionTool", json!({ "keyword": "dp" }));
        let mut stream = llm.generate_content(LlmRequest::default(), false).await.unwrap();
        let response = stream.next().await.unwrap().unwrap();
        assert_eq!(response.finish_reason, Some(FinishReason::ToolCalls));
        assert!(response.content.unwrap().has_function_calls());
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn exhausted_script_is_a_model_error() {
        let llm = MockLlm::new("mock").with_error("boom");
        assert!(matches!(llm.generate_content(LlmRequest::default(), false).await, Err(CoreError::Model(m)) if m == "boom"));
        assert!(matches!(llm.generate_content(LlmRequest::default(), false).await, Err(CoreError::Model(_))));
        assert_eq!(llm.requests().len(), 2);
    }
}
