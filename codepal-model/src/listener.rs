//! Observers of chat model calls.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_stream::stream;
use async_trait::async_trait;
use codepal_core::{CoreError, Llm, LlmRequest, LlmResponse, LlmResponseStream, Result};
use futures::StreamExt;
use tracing::{error, info};

/// What was sent to the model.
#[derive(Debug, Clone)]
pub struct ChatModelRequestContext {
    pub model: String,
    pub request: LlmRequest,
    pub stream: bool,
}

/// The final response of a call.
#[derive(Debug, Clone)]
pub struct ChatModelResponseContext {
    pub model: String,
    pub response: LlmResponse,
    pub latency: Duration,
}

#[derive(Debug, Clone)]
pub struct ChatModelErrorContext {
    pub model: String,
    pub error: String,
    pub latency: Duration,
}

/// Callbacks around each model call. All methods default to no-ops.
pub trait ChatModelListener: Send + Sync {
    fn on_request(&self, _ctx: &ChatModelRequestContext) {}

    fn on_response(&self, _ctx: &ChatModelResponseContext) {}

    fn on_error(&self, _ctx: &ChatModelErrorContext) {}
}

/// Logs every call with `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingListener;

impl ChatModelListener for LoggingListener {
    fn on_request(&self, ctx: &ChatModelRequestContext) {
        info!(
            model = %ctx.model,
            messages = ctx.request.contents.len(),
            tools = ctx.request.tools.len(),
            stream = ctx.stream,
            "chat model request"
        );
    }

    fn on_response(&self, ctx: &ChatModelResponseContext) {
        let usage = ctx.response.usage_metadata.unwrap_or_default();
        info!(
            model = %ctx.model,
            latency_ms = ctx.latency.as_millis() as u64,
            finish_reason = ?ctx.response.finish_reason,
            prompt_tokens = usage.prompt_token_count,
            completion_tokens = usage.candidates_token_count,
            "chat model response"
        );
    }

    fn on_error(&self, ctx: &ChatModelErrorContext) {
        error!(
            model = %ctx.model,
            latency_ms = ctx.latency.as_millis() as u64,
            error = %ctx.error,
            "chat model error"
        );
    }
}

/// Wraps a model and notifies listeners of each call.
///
/// `on_response` fires once, for the item with `turn_complete` set;
/// `on_error` fires for a failed call or the first failed stream item.
pub struct ListenedLlm {
    inner: Arc<dyn Llm>,
    listeners: Vec<Arc<dyn ChatModelListener>>,
}

impl ListenedLlm {
    pub fn new(inner: Arc<dyn Llm>) -> Self {
        Self { inner, listeners: Vec::new() }
    }

    pub fn with_listener(mut self, listener: Arc<dyn ChatModelListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    fn notify_error(listeners: &[Arc<dyn ChatModelListener>], model: &str, error: &CoreError, started: Instant) {
        let ctx = ChatModelErrorContext {
            model: model.to_string(),
            error: error.to_string(),
            latency: started.elapsed(),
        };
        for listener in listeners {
            listener.on_error(&ctx);
        }
    }
}

#[async_trait]
impl Llm for ListenedLlm {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn generate_content(&self, request: LlmRequest, stream: bool) -> Result<LlmResponseStream> {
        let model = self.inner.name().to_string();
        let request_ctx = ChatModelRequestContext { model: model.clone(), request: request.clone(), stream };
        for listener in &self.listeners {
            listener.on_request(&request_ctx);
        }

        let started = Instant::now();
        let mut inner = match self.inner.generate_content(request, stream).await {
            Ok(inner) => inner,
            Err(e) => {
                Self::notify_error(&self.listeners, &model, &e, started);
                return Err(e);
            }
        };

        let listeners = self.listeners.clone();
        let observed = stream! {
            while let Some(item) = inner.next().await {
                match &item {
                    Ok(response) if response.turn_complete => {
                        let ctx = ChatModelResponseContext {
                            model: model.clone(),
                            response: response.clone(),
                            latency: started.elapsed(),
                        };
                        for listener in &listeners {
                            listener.on_response(&ctx);
                        }
                    }
                    Ok(_) => {}
                    Err(e) => Self::notify_error(&listeners, &model, e, started),
                }
                let failed = item.is_err();
                yield item;
                if failed {
                    break;
                }
            }
        };

        Ok(Box::pin(observed))
    }
}
