//! Streaming turns: ordering, rejection, failure and cancellation.

use std::sync::Arc;
use std::time::Duration;

use codepal_agent::{AgentError, CodepalService, Orchestrator};
use codepal_guardrail::{GuardrailSet, SensitiveWordGuardrail};
use codepal_model::MockLlm;
use futures::StreamExt;

fn service(llm: MockLlm) -> CodepalService {
    CodepalService::new(
        Orchestrator::builder()
            .llm(Arc::new(llm))
            .guardrails(GuardrailSet::new().with(SensitiveWordGuardrail::default()))
            .build()
            .unwrap(),
    )
}

#[tokio::test]
async fn tokens_arrive_in_order_and_memory_follows_completion() {
    let service = service(MockLlm::new("mock").with_text("ownership borrowing lifetimes traits"));

    let tokens: Vec<String> =
        service.chat_stream("42", "what should I learn?").unwrap().map(Result::unwrap).collect().await;
    assert_eq!(tokens, vec!["ownership ", "borrowing ", "lifetimes ", "traits"]);

    let memory = service.orchestrator().memory().messages("42").await;
    assert_eq!(memory.len(), 2);
    assert_eq!(memory[1].text(), "ownership borrowing lifetimes traits");
}

#[tokio::test]
async fn rejection_is_a_single_item() {
    let service = service(MockLlm::new("mock").with_text("unused"));

    let items: Vec<_> = service.chat_stream("42", "fuck this").unwrap().collect().await;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].as_ref().unwrap(), "Input validation failed: Sensitive word detected: fuck");
    assert!(service.orchestrator().memory().messages("42").await.is_empty());
}

#[tokio::test]
async fn failure_ends_with_error_item() {
    let service = service(MockLlm::new("mock").with_error("quota exceeded"));

    let items: Vec<_> = service.chat_stream("42", "hello").unwrap().collect().await;
    assert_eq!(items.len(), 1);
    assert!(matches!(items[0], Err(AgentError::Model(_))));
    assert!(service.orchestrator().memory().messages("42").await.is_empty());
}

#[tokio::test]
async fn dropping_the_stream_stops_the_turn() {
    let words = vec!["word"; 50].join(" ");
    let service = service(MockLlm::new("mock").with_text(words).with_chunk_delay(Duration::from_millis(20)));

    let mut stream = service.chat_stream("42", "long answer please").unwrap();
    assert_eq!(stream.next().await.unwrap().unwrap(), "word ");
    drop(stream);

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(service.orchestrator().memory().messages("42").await.is_empty());
}

#[tokio::test]
async fn cancel_ends_the_stream() {
    let words = vec!["word"; 50].join(" ");
    let service = service(MockLlm::new("mock").with_text(words).with_chunk_delay(Duration::from_millis(20)));

    let mut stream = service.chat_stream("42", "long answer please").unwrap();
    stream.next().await.unwrap().unwrap();
    stream.cancel();
    assert!(stream.is_cancelled());
    assert!(stream.next().await.is_none());

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(service.orchestrator().memory().messages("42").await.is_empty());
}

#[tokio::test]
async fn turns_on_one_session_are_serialized() {
    let service = service(
        MockLlm::new("mock")
            .with_text("first answer")
            .with_text("second answer")
            .with_chunk_delay(Duration::from_millis(20)),
    );

    let mut first = service.chat_stream("42", "one").unwrap();
    // The first turn is mid-stream and holds the session.
    let head = first.next().await.unwrap().unwrap();
    let second_service = service.clone();
    let second = tokio::spawn(async move { second_service.chat_with_memory("42", "two").await });

    let rest: Vec<String> = first.map(Result::unwrap).collect().await;
    let second = second.await.unwrap().unwrap();
    assert_eq!(format!("{head}{}", rest.concat()), "first answer");
    assert_eq!(second, "second answer");

    let memory = service.orchestrator().memory().messages("42").await;
    let texts: Vec<String> = memory.iter().map(|m| m.text()).collect();
    assert_eq!(texts, vec!["one", "first answer", "two", "second answer"]);
}
