//! Route behaviour against a scripted model.

use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use codepal_agent::{CodepalService, Orchestrator};
use codepal_guardrail::{GuardrailSet, SensitiveWordGuardrail};
use codepal_model::MockLlm;
use codepal_rag::{ContentRetriever, Document, HashEmbeddingProvider, InMemoryVectorStore, RagPipeline};
use codepal_server::{AppState, app_router};
use serde_json::Value;
use tower::ServiceExt;

fn router_with(llm: MockLlm, retriever: Option<Arc<ContentRetriever>>) -> (Router, CodepalService) {
    let mut builder = Orchestrator::builder()
        .llm(Arc::new(llm))
        .guardrails(GuardrailSet::new().with(SensitiveWordGuardrail::default()));
    if let Some(retriever) = retriever {
        builder = builder.retriever(retriever);
    }
    let service = CodepalService::new(builder.build().unwrap());
    (app_router(AppState::new(service.clone())), service)
}

fn router(llm: MockLlm) -> Router {
    router_with(llm, None).0
}

async fn get(router: Router, uri: &str) -> (StatusCode, String) {
    let response = router.oneshot(Request::get(uri).body(Body::empty()).unwrap()).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

#[tokio::test]
async fn health_is_ok() {
    let (status, body) = get(router(MockLlm::new("mock")), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ok");
}

#[tokio::test]
async fn sync_chat_returns_plain_text() {
    let (status, body) =
        get(router(MockLlm::new("mock").with_text("Start with the book.")), "/ai/chat/sync?message=how+to+learn+rust")
            .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Start with the book.");
}

#[tokio::test]
async fn rejected_input_is_answered_not_failed() {
    let (status, body) = get(router(MockLlm::new("mock")), "/ai/chat/sync?message=fuck").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Input validation failed: Sensitive word detected: fuck");
}

#[tokio::test]
async fn missing_message_is_a_bad_request() {
    let (status, _) = get(router(MockLlm::new("mock")), "/ai/chat/sync").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn model_failure_maps_to_bad_gateway() {
    let (status, body) = get(router(MockLlm::new("mock").with_error("quota exceeded")), "/ai/chat/sync?message=hi").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert!(body["error"].as_str().unwrap().contains("quota exceeded"));
}

#[tokio::test]
async fn report_is_json_in_camel_case() {
    let llm = MockLlm::new("mock").with_text(r#"{"name": "Rust plan", "suggestionList": ["Read the book"]}"#);
    let (status, body) = get(router(llm), "/ai/chat/report?message=plan").await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["name"], "Rust plan");
    assert_eq!(body["suggestionList"][0], "Read the book");
}

#[tokio::test]
async fn malformed_report_maps_to_bad_gateway() {
    let (status, _) = get(router(MockLlm::new("mock").with_text("no json here")), "/ai/chat/report?message=plan").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn rag_answer_lists_sources() {
    let pipeline = Arc::new(
        RagPipeline::builder()
            .embedding_provider(Arc::new(HashEmbeddingProvider::default()))
            .vector_store(Arc::new(InMemoryVectorStore::new()))
            .build()
            .unwrap(),
    );
    pipeline.create_collection("kb").await.unwrap();
    pipeline
        .ingest_batch(
            "kb",
            &[
                Document::from_file_name("foo.md", "Java learning path"),
                Document::from_file_name("bar.md", "Rust ownership rules"),
            ],
        )
        .await
        .unwrap();
    let retriever = Arc::new(ContentRetriever::new(pipeline, "kb"));

    let (router, _) = router_with(MockLlm::new("mock").with_text("Learn Java basics first."), Some(retriever));
    let (status, body) = get(router, "/ai/chat/rag?message=foo.md+Java+learning+path").await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["content"], "Learn Java basics first.");
    assert_eq!(body["sources"], serde_json::json!(["foo.md"]));
}

#[tokio::test]
async fn chat_streams_tokens_as_events() {
    let (router, service) = router_with(MockLlm::new("mock").with_text("ownership borrowing traits"), None);
    let response = router
        .oneshot(Request::get("/ai/chat?memoryId=7&message=what+next").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/event-stream");

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = String::from_utf8(body.to_vec()).unwrap();
    let data: Vec<&str> = body.lines().filter_map(|line| line.strip_prefix("data: ")).collect();
    assert_eq!(data, vec!["ownership ", "borrowing ", "traits"]);

    let memory = service.orchestrator().memory().messages("7").await;
    assert_eq!(memory.len(), 2);
    assert_eq!(memory[0].text(), "what next");
}

#[tokio::test]
async fn failed_stream_ends_with_error_event() {
    let (status, body) = get(router(MockLlm::new("mock").with_error("quota exceeded")), "/ai/chat?message=hi").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("event: error"));
    assert!(body.contains("quota exceeded"));
}
