use std::convert::Infallible;
use std::net::SocketAddr;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
    routing::get,
};
use codepal_agent::{AgentError, CodepalService, RagAnswer, Report};
use codepal_session::DEFAULT_MEMORY_ID;
use futures::{Stream, StreamExt};
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub service: CodepalService,
}

impl AppState {
    pub fn new(service: CodepalService) -> Self {
        Self { service }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind_addr: codepal_agent::config::DEFAULT_BIND_ADDR.to_string() }
    }
}

#[derive(Debug, Deserialize)]
pub struct ChatQuery {
    #[serde(rename = "memoryId")]
    pub memory_id: Option<String>,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    pub message: String,
}

/// An [`AgentError`] rendered as a JSON error body.
#[derive(Debug)]
pub struct ApiError(AgentError);

impl From<AgentError> for ApiError {
    fn from(err: AgentError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            AgentError::Model(_) | AgentError::StructuredOutput(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        warn!(status = status.as_u16(), error = %self.0, "request failed");
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

pub fn app_router(state: AppState) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/ai/chat", get(chat_stream))
        .route("/ai/chat/sync", get(chat_sync))
        .route("/ai/chat/report", get(chat_report))
        .route("/ai/chat/rag", get(chat_rag))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Bind `config.bind_addr` and serve until ctrl-c.
pub async fn run_server(config: ServerConfig, state: AppState) -> anyhow::Result<()> {
    let addr: SocketAddr = config.bind_addr.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "codepal server listening");

    axum::serve(listener, app_router(state)).with_graceful_shutdown(shutdown_signal()).await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

async fn health() -> &'static str {
    "ok"
}

/// Tokens as SSE `data` events; a failed turn ends with an `error` event.
async fn chat_stream(
    State(state): State<AppState>,
    Query(query): Query<ChatQuery>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let memory_id = query.memory_id.unwrap_or_else(|| DEFAULT_MEMORY_ID.to_string());
    let tokens = state.service.chat_stream(memory_id, query.message)?;

    let events = tokens.map(|item| {
        Ok::<_, Infallible>(match item {
            Ok(token) => Event::default().data(token),
            Err(e) => Event::default().event("error").data(e.to_string()),
        })
    });
    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

async fn chat_sync(
    State(state): State<AppState>,
    Query(query): Query<MessageQuery>,
) -> Result<String, ApiError> {
    Ok(state.service.chat(&query.message).await?)
}

async fn chat_report(
    State(state): State<AppState>,
    Query(query): Query<MessageQuery>,
) -> Result<Json<Report>, ApiError> {
    Ok(Json(state.service.chat_for_report(&query.message).await?))
}

async fn chat_rag(
    State(state): State<AppState>,
    Query(query): Query<MessageQuery>,
) -> Result<Json<RagAnswer>, ApiError> {
    Ok(Json(state.service.chat_with_rag(&query.message).await?))
}
