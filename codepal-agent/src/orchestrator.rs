//! One conversation turn as an explicit state machine.
//!
//! ```text
//! GuardrailCheck ──fatal──▶ Rejected ──▶ Done
//!       │
//!       ▼
//! ContextAugmentation ──▶ ModelInvocation ◀──▶ ToolCall
//!                               │
//!                               ▼
//!                            Respond ──▶ Done
//! ```

use std::sync::Arc;

use codepal_core::{
    CallContext, Content, GenerateContentConfig, Llm, LlmRequest, Part, ToolContext,
};
use codepal_guardrail::{GuardrailError, GuardrailSet, run_guardrails};
use codepal_rag::ContentRetriever;
use codepal_session::{ChatMemory, ChatMemoryStore};
use codepal_tool::ToolRegistry;
use futures::StreamExt;
use futures::future::join_all;
use serde_json::{Value, json};
use tokio::sync::{MutexGuard, mpsc};
use tracing::{debug, info, warn};

use crate::error::{AgentError, Result};
use crate::prompts;

/// Default bound on model/tool round trips in one turn.
pub const DEFAULT_MAX_TOOL_ROUNDS: usize = 5;

/// Prefix of the text shown to a user whose input was rejected.
pub const REJECTION_PREFIX: &str = "Input validation failed: ";

/// Sender half used to forward streamed tokens.
pub(crate) type TokenSender = mpsc::Sender<Result<String>>;

/// Static settings of an [`Orchestrator`].
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Model name sent with each request; empty uses the model's own name.
    pub model: String,
    pub system_prompt: String,
    /// After this many tool rounds the model is called without tools.
    pub max_tool_rounds: usize,
    pub generate_config: Option<GenerateContentConfig>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            model: String::new(),
            system_prompt: prompts::SYSTEM_PROMPT.to_string(),
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
            generate_config: None,
        }
    }
}

/// Check run on the final answer before it is remembered.
pub type AnswerValidator = fn(&str) -> Result<()>;

/// Per-call variations of a turn.
#[derive(Debug, Clone)]
pub struct TurnOptions {
    /// Replaces the configured system prompt.
    pub system_prompt: Option<String>,
    /// Offer registered tools to the model.
    pub use_tools: bool,
    /// An answer it refuses fails the turn and is not remembered.
    pub validate: Option<AnswerValidator>,
}

impl Default for TurnOptions {
    fn default() -> Self {
        Self { system_prompt: None, use_tools: true, validate: None }
    }
}

impl TurnOptions {
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn without_tools(mut self) -> Self {
        self.use_tools = false;
        self
    }

    pub fn with_validator(mut self, validate: AnswerValidator) -> Self {
        self.validate = Some(validate);
        self
    }
}

/// A tool call requested by the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallRequest {
    pub id: Option<String>,
    pub name: String,
    pub args: Value,
}

/// States of a turn.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnState {
    GuardrailCheck,
    ContextAugmentation,
    ModelInvocation { round: usize },
    ToolCall { round: usize, calls: Vec<ToolCallRequest> },
    Respond { text: String },
    Rejected { reason: String },
    Done,
}

/// How a turn ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The model answered. `sources` are the file names of the retrieved
    /// segments, deduplicated, in retrieval order.
    Completed { text: String, sources: Vec<String> },
    /// The input guardrail refused the message; nothing was remembered.
    Rejected { reason: String },
}

impl TurnOutcome {
    /// The user-facing text: the answer, or the rejection message.
    pub fn into_text(self) -> String {
        match self {
            Self::Completed { text, .. } => text,
            Self::Rejected { reason } => rejection_message(&reason),
        }
    }
}

pub fn rejection_message(reason: &str) -> String {
    format!("{REJECTION_PREFIX}{reason}")
}

/// Working data of one turn.
struct Turn<'a> {
    memory_id: &'a str,
    options: &'a TurnOptions,
    tokens: Option<&'a TokenSender>,
    memory: MutexGuard<'a, ChatMemory>,
    user: Content,
    system_prompt: String,
    /// Model and tool messages produced during this turn.
    working: Vec<Content>,
    /// Text of every model round so far, as the client saw it.
    transcript: String,
    sources: Vec<String>,
    outcome: Option<TurnOutcome>,
}

/// Runs conversation turns against a model with guardrails, retrieval,
/// tools and per-session memory.
///
/// ```rust,ignore
/// let orchestrator = Orchestrator::builder()
///     .llm(Arc::new(model))
///     .retriever(Arc::new(retriever))
///     .guardrails(GuardrailSet::new().with(SensitiveWordGuardrail::default()))
///     .tools(registry)
///     .build()?;
/// let outcome = orchestrator.run_turn("user-1", "How do I learn Rust?", &TurnOptions::default()).await?;
/// ```
pub struct Orchestrator {
    llm: Arc<dyn Llm>,
    retriever: Option<Arc<ContentRetriever>>,
    guardrails: GuardrailSet,
    tools: ToolRegistry,
    memory: Arc<ChatMemoryStore>,
    config: OrchestratorConfig,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("llm", &self.llm.name())
            .field("retriever", &self.retriever)
            .field("guardrails", &self.guardrails)
            .field("tools", &self.tools)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::default()
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn memory(&self) -> &Arc<ChatMemoryStore> {
        &self.memory
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Run one turn for `memory_id`.
    ///
    /// Turns on the same memory id are serialized; other sessions are not
    /// blocked. Memory is only updated when the turn completes.
    ///
    /// # Errors
    ///
    /// Model, retrieval and tool-lookup failures abort the turn and leave
    /// the session memory untouched. So do an empty answer, a model still
    /// asking for tools after `max_tool_rounds`, and an answer refused by
    /// [`TurnOptions::validate`].
    pub async fn run_turn(&self, memory_id: &str, message: &str, options: &TurnOptions) -> Result<TurnOutcome> {
        self.run(memory_id, message, options, None).await
    }

    /// Like [`run_turn`](Self::run_turn), forwarding text deltas to `tokens`.
    ///
    /// Fails with [`AgentError::Cancelled`] once the receiver is gone.
    pub(crate) async fn run_turn_streaming(
        &self,
        memory_id: &str,
        message: &str,
        options: &TurnOptions,
        tokens: &TokenSender,
    ) -> Result<TurnOutcome> {
        self.run(memory_id, message, options, Some(tokens)).await
    }

    async fn run(
        &self,
        memory_id: &str,
        message: &str,
        options: &TurnOptions,
        tokens: Option<&TokenSender>,
    ) -> Result<TurnOutcome> {
        let session = self.memory.session(memory_id).await;
        let mut turn = Turn {
            memory_id,
            options,
            tokens,
            memory: session.lock().await,
            user: Content::user(message),
            system_prompt: options.system_prompt.clone().unwrap_or_else(|| self.config.system_prompt.clone()),
            working: Vec::new(),
            transcript: String::new(),
            sources: Vec::new(),
            outcome: None,
        };
        debug!(memory_id, history = turn.memory.len(), "turn started");

        let mut state = TurnState::GuardrailCheck;
        while state != TurnState::Done {
            state = self.step(&mut turn, state).await?;
        }

        turn.outcome.ok_or_else(|| AgentError::Model("turn finished without an outcome".into()))
    }

    /// Perform `state` and return the next one.
    async fn step(&self, turn: &mut Turn<'_>, state: TurnState) -> Result<TurnState> {
        match state {
            TurnState::GuardrailCheck => match run_guardrails(&self.guardrails, &turn.user).await {
                Ok(content) => {
                    turn.user = content;
                    Ok(TurnState::ContextAugmentation)
                }
                Err(GuardrailError::ValidationFailed { reason, .. }) => Ok(TurnState::Rejected { reason }),
                Err(e) => Err(e.into()),
            },

            TurnState::ContextAugmentation => {
                let Some(retriever) = &self.retriever else {
                    return Ok(TurnState::ModelInvocation { round: 0 });
                };
                let results = retriever.retrieve(&turn.user.text()).await?;
                let mut segments = Vec::with_capacity(results.len());
                for result in &results {
                    let source = result.chunk.file_name().unwrap_or(&result.chunk.document_id).to_string();
                    if !turn.sources.contains(&source) {
                        turn.sources.push(source);
                    }
                    segments.push(result.chunk.text.clone());
                }
                debug!(memory_id = turn.memory_id, segments = segments.len(), "augmented context");
                turn.system_prompt = prompts::augment(&turn.system_prompt, &segments);
                Ok(TurnState::ModelInvocation { round: 0 })
            }

            TurnState::ModelInvocation { round } => self.invoke_model(turn, round).await,

            TurnState::ToolCall { round, calls } => {
                let responses = self.call_tools(turn.memory_id, &calls).await;
                turn.working.push(responses);
                Ok(TurnState::ModelInvocation { round: round + 1 })
            }

            TurnState::Respond { text } => {
                if text.trim().is_empty() {
                    return Err(AgentError::Model("model returned an empty answer".into()));
                }
                if let Some(validate) = turn.options.validate {
                    validate(&text)?;
                }
                let user = turn.user.clone();
                turn.memory.add_exchange(user, Content::model(text.clone()));
                info!(memory_id = turn.memory_id, chars = text.chars().count(), "turn completed");
                turn.outcome = Some(TurnOutcome::Completed { text, sources: std::mem::take(&mut turn.sources) });
                Ok(TurnState::Done)
            }

            TurnState::Rejected { reason } => {
                info!(memory_id = turn.memory_id, %reason, "input rejected");
                turn.outcome = Some(TurnOutcome::Rejected { reason });
                Ok(TurnState::Done)
            }

            TurnState::Done => Ok(TurnState::Done),
        }
    }

    async fn invoke_model(&self, turn: &mut Turn<'_>, round: usize) -> Result<TurnState> {
        let offer_tools = turn.options.use_tools && !self.tools.is_empty() && round < self.config.max_tool_rounds;

        let mut contents = Vec::with_capacity(turn.memory.len() + turn.working.len() + 2);
        contents.push(Content::system(turn.system_prompt.clone()));
        contents.extend(turn.memory.messages());
        contents.push(turn.user.clone());
        contents.extend(turn.working.iter().cloned());

        let model = if self.config.model.is_empty() { self.llm.name() } else { self.config.model.as_str() };
        let mut request = LlmRequest::new(model, contents);
        if offer_tools {
            request = request.with_tools(self.tools.declarations());
        }
        if let Some(config) = &self.config.generate_config {
            request = request.with_config(config.clone());
        }

        let mut responses = self.llm.generate_content(request, turn.tokens.is_some()).await?;
        let mut streamed = String::new();
        let mut final_content = None;
        while let Some(item) = responses.next().await {
            let response = item?;
            if response.turn_complete {
                final_content = response.content;
                break;
            }
            if let Some(delta) = response.content.map(|c| c.text()).filter(|t| !t.is_empty()) {
                if let Some(tokens) = turn.tokens {
                    tokens.send(Ok(delta.clone())).await.map_err(|_| AgentError::Cancelled)?;
                }
                streamed.push_str(&delta);
            }
        }
        let content = final_content.unwrap_or_else(|| Content::model(streamed.clone()));

        let text = if streamed.is_empty() {
            let text = content.text();
            if !text.is_empty() {
                if let Some(tokens) = turn.tokens {
                    tokens.send(Ok(text.clone())).await.map_err(|_| AgentError::Cancelled)?;
                }
            }
            text
        } else {
            streamed
        };
        turn.transcript.push_str(&text);

        let calls: Vec<ToolCallRequest> = content
            .parts
            .iter()
            .filter_map(|part| match part {
                Part::FunctionCall { id, name, args } => {
                    Some(ToolCallRequest { id: id.clone(), name: name.clone(), args: args.clone() })
                }
                _ => None,
            })
            .collect();

        if !calls.is_empty() {
            if offer_tools {
                debug!(
                    memory_id = turn.memory_id,
                    round,
                    tools = ?calls.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
                    "model requested tools"
                );
                turn.working.push(content);
                return Ok(TurnState::ToolCall { round, calls });
            }
            warn!(memory_id = turn.memory_id, round, "ignoring tool calls made without tools offered");
            if text.trim().is_empty() {
                let reason = if turn.options.use_tools && !self.tools.is_empty() {
                    format!("tool round limit ({}) reached without an answer", self.config.max_tool_rounds)
                } else {
                    "model asked for tools instead of answering".to_string()
                };
                return Err(AgentError::Model(reason));
            }
        }

        Ok(TurnState::Respond { text: std::mem::take(&mut turn.transcript) })
    }

    /// Run `calls` concurrently; responses keep the request order.
    ///
    /// A failing or unknown tool answers with its error text.
    async fn call_tools(&self, memory_id: &str, calls: &[ToolCallRequest]) -> Content {
        let futures = calls.iter().map(|call| async move {
            let response = match self.tools.get(&call.name) {
                Some(tool) => {
                    let call_id = call.id.clone().unwrap_or_else(|| call.name.clone());
                    let ctx: Arc<dyn ToolContext> = Arc::new(CallContext::new(call_id, memory_id));
                    match tool.execute(ctx, call.args.clone()).await {
                        Ok(value) => value,
                        Err(e) => {
                            warn!(tool = %call.name, error = %e, "tool failed");
                            json!({ "output": e.to_string() })
                        }
                    }
                }
                None => {
                    warn!(tool = %call.name, "model requested an unknown tool");
                    json!({ "output": format!("Tool '{}' is not available", call.name) })
                }
            };
            Part::FunctionResponse { id: call.id.clone(), name: call.name.clone(), response }
        });

        join_all(futures).await.into_iter().fold(Content::new("tool"), Content::with_part)
    }
}

/// Builder for [`Orchestrator`].
#[derive(Default)]
pub struct OrchestratorBuilder {
    llm: Option<Arc<dyn Llm>>,
    retriever: Option<Arc<ContentRetriever>>,
    guardrails: GuardrailSet,
    tools: ToolRegistry,
    memory: Option<Arc<ChatMemoryStore>>,
    config: OrchestratorConfig,
}

impl OrchestratorBuilder {
    pub fn llm(mut self, llm: Arc<dyn Llm>) -> Self {
        self.llm = Some(llm);
        self
    }

    /// Augment every turn with knowledge-base segments.
    pub fn retriever(mut self, retriever: Arc<ContentRetriever>) -> Self {
        self.retriever = Some(retriever);
        self
    }

    /// Guardrails applied to user input.
    pub fn guardrails(mut self, guardrails: GuardrailSet) -> Self {
        self.guardrails = guardrails;
        self
    }

    pub fn tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = tools;
        self
    }

    /// Defaults to a store of 10-message windows.
    pub fn memory(mut self, memory: Arc<ChatMemoryStore>) -> Self {
        self.memory = Some(memory);
        self
    }

    pub fn config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    /// # Errors
    ///
    /// Returns [`AgentError::Config`] if no model was set or the system
    /// prompt is empty.
    pub fn build(self) -> Result<Orchestrator> {
        let llm = self.llm.ok_or_else(|| AgentError::Config("orchestrator requires a chat model".into()))?;
        if self.config.system_prompt.trim().is_empty() {
            return Err(AgentError::Config("system prompt must not be empty".into()));
        }
        Ok(Orchestrator {
            llm,
            retriever: self.retriever,
            guardrails: self.guardrails,
            tools: self.tools,
            memory: self.memory.unwrap_or_default(),
            config: self.config,
        })
    }
}
