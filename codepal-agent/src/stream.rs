//! Cancellable token streams.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::error::{AgentError, Result};
use crate::orchestrator::{Orchestrator, TurnOptions, TurnOutcome, rejection_message};

/// Capacity of the token channel between producer and consumer.
pub const STREAM_CAPACITY: usize = 64;

/// Ordered tokens of one streamed turn.
///
/// A spawned task runs the turn and feeds a bounded channel. Dropping the
/// stream, or calling [`cancel`](ChatStream::cancel), stops that task and
/// drops the model stream; the session memory is then left unchanged.
/// A failed turn ends with one `Err` item.
pub struct ChatStream {
    receiver: mpsc::Receiver<Result<String>>,
    token: CancellationToken,
}

impl ChatStream {
    pub(crate) fn spawn(
        orchestrator: Arc<Orchestrator>,
        memory_id: String,
        message: String,
        options: TurnOptions,
    ) -> Result<Self> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| AgentError::Config(format!("streaming requires a tokio runtime: {e}")))?;
        let (sender, receiver) = mpsc::channel(STREAM_CAPACITY);
        let token = CancellationToken::new();
        let cancelled = token.clone();

        runtime.spawn(async move {
            tokio::select! {
                _ = cancelled.cancelled() => {
                    debug!(memory_id = %memory_id, "stream cancelled");
                }
                result = orchestrator.run_turn_streaming(&memory_id, &message, &options, &sender) => {
                    match result {
                        Ok(TurnOutcome::Completed { .. }) => {}
                        Ok(TurnOutcome::Rejected { reason }) => {
                            let _ = sender.send(Ok(rejection_message(&reason))).await;
                        }
                        Err(AgentError::Cancelled) => {
                            debug!(memory_id = %memory_id, "stream consumer went away");
                        }
                        Err(e) => {
                            error!(memory_id = %memory_id, error = %e, "streamed turn failed");
                            let _ = sender.send(Err(e)).await;
                        }
                    }
                }
            }
        });

        Ok(Self { receiver, token })
    }

    /// Stop producing tokens. Items already buffered are discarded.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Receive the next token, or `None` at the end of the turn.
    pub async fn next_token(&mut self) -> Option<Result<String>> {
        if self.token.is_cancelled() {
            return None;
        }
        self.receiver.recv().await
    }
}

impl Stream for ChatStream {
    type Item = Result<String>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.token.is_cancelled() {
            return Poll::Ready(None);
        }
        self.receiver.poll_recv(cx)
    }
}

impl Drop for ChatStream {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
