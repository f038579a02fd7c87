//! The public conversation surface.

use std::sync::Arc;

use codepal_session::DEFAULT_MEMORY_ID;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::Result;
use crate::orchestrator::{Orchestrator, TurnOptions, TurnOutcome, rejection_message};
use crate::prompts;
use crate::report::{Report, parse_report};
use crate::stream::ChatStream;

/// An answer together with the knowledge-base files it drew on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RagAnswer {
    pub content: String,
    pub sources: Vec<String>,
}

/// Chat, report, RAG and streaming entry points over one [`Orchestrator`].
///
/// All calls share the same guardrails and memory semantics. Calls without
/// a memory id use the `"default"` session.
#[derive(Debug, Clone)]
pub struct CodepalService {
    orchestrator: Arc<Orchestrator>,
}

impl CodepalService {
    pub fn new(orchestrator: Orchestrator) -> Self {
        Self { orchestrator: Arc::new(orchestrator) }
    }

    pub fn orchestrator(&self) -> &Arc<Orchestrator> {
        &self.orchestrator
    }

    /// Answer `message` in the default session.
    ///
    /// Rejected input is answered with `"Input validation failed: {reason}"`.
    pub async fn chat(&self, message: &str) -> Result<String> {
        self.chat_with_memory(DEFAULT_MEMORY_ID, message).await
    }

    #[instrument(skip_all, fields(memory_id = %memory_id))]
    pub async fn chat_with_memory(&self, memory_id: &str, message: &str) -> Result<String> {
        let outcome = self.orchestrator.run_turn(memory_id, message, &TurnOptions::default()).await?;
        Ok(outcome.into_text())
    }

    /// Ask for a structured learning report. Tools are not offered.
    ///
    /// Only an answer holding a valid report is remembered.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::StructuredOutput`](crate::AgentError::StructuredOutput)
    /// if the answer holds no report matching the schema.
    #[instrument(skip_all)]
    pub async fn chat_for_report(&self, message: &str) -> Result<Report> {
        let options = TurnOptions::default()
            .with_system_prompt(prompts::report_prompt(&self.orchestrator.config().system_prompt))
            .without_tools()
            .with_validator(check_report);
        match self.orchestrator.run_turn(DEFAULT_MEMORY_ID, message, &options).await? {
            TurnOutcome::Completed { text, .. } => parse_report(&text),
            TurnOutcome::Rejected { reason } => Ok(Report::rejected(reason)),
        }
    }

    /// Answer `message` and report which knowledge-base files were used.
    #[instrument(skip_all)]
    pub async fn chat_with_rag(&self, message: &str) -> Result<RagAnswer> {
        let outcome = self.orchestrator.run_turn(DEFAULT_MEMORY_ID, message, &TurnOptions::default()).await?;
        Ok(match outcome {
            TurnOutcome::Completed { text, sources } => RagAnswer { content: text, sources },
            TurnOutcome::Rejected { reason } => RagAnswer { content: rejection_message(&reason), sources: Vec::new() },
        })
    }

    /// Stream the answer token by token.
    ///
    /// # Errors
    ///
    /// Fails only when called outside a tokio runtime; turn failures arrive
    /// as the stream's last item.
    pub fn chat_stream(&self, memory_id: impl Into<String>, message: impl Into<String>) -> Result<ChatStream> {
        ChatStream::spawn(self.orchestrator.clone(), memory_id.into(), message.into(), TurnOptions::default())
    }
}

fn check_report(text: &str) -> Result<()> {
    parse_report(text).map(|_| ())
}
