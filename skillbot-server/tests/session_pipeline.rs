//! Behavior tests for the session pipeline.
//!
//! Drives the pipeline directly against the in-memory backend double and a
//! wiremock callback receiver.

mod common;

use common::{InMemoryBackend, RunBehavior};
use skillbot_agent::{AssistantBackend, MessageRole};
use skillbot_server::{CallbackSender, SessionPipeline};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn pipeline_with(backend: &Arc<InMemoryBackend>, limit: usize) -> SessionPipeline {
    SessionPipeline::new(
        Arc::clone(backend) as Arc<dyn AssistantBackend>,
        limit,
    )
    .with_delivery(CallbackSender::new().with_timeout(Duration::from_millis(500)))
}

async fn callback_receiver() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/callback"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    server
}

fn callback_url(server: &MockServer) -> String {
    format!("{}/callback", server.uri())
}

// ─────────────────────────────────────────────────────────────────────────────
// Context Window
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn repeated_turns_trim_to_a_fresh_thread() {
    let backend = Arc::new(InMemoryBackend::new(RunBehavior::Echo));
    let pipeline = pipeline_with(&backend, 10);
    let receiver = callback_receiver().await;
    let url = callback_url(&receiver);

    for i in 1..=7 {
        pipeline.process("u-1", &format!("msg {i}"), &url).await;
    }

    // Each turn adds a user and an assistant message, so the thread
    // overgrows on the way to turn 7 and the session migrates.
    let first_handle = "thread_0".to_string();
    let current = pipeline.store().get("u-1").unwrap();
    assert_ne!(current, first_handle);

    let messages = backend.messages(&current);
    // Oldest turn dropped, newest turns intact and ordered.
    assert_eq!(messages.len(), 12);
    assert_eq!(messages[0].text, "msg 2");
    assert_eq!(messages[0].role, MessageRole::User);
    assert_eq!(messages.last().unwrap().text, "re: msg 7");
    assert_eq!(messages.last().unwrap().role, MessageRole::Assistant);
    assert!(!messages.iter().any(|m| m.text == "msg 1"));
}

#[tokio::test]
async fn single_turn_keeps_the_original_thread() {
    let backend = Arc::new(InMemoryBackend::new(RunBehavior::Echo));
    let pipeline = pipeline_with(&backend, 10);
    let receiver = callback_receiver().await;

    pipeline
        .process("u-1", "안녕", &callback_url(&receiver))
        .await;

    let handle = pipeline.store().get("u-1").unwrap();
    let messages = backend.messages(&handle);
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].text, "안녕");
    assert_eq!(messages[1].text, "re: 안녕");
}

// ─────────────────────────────────────────────────────────────────────────────
// User Isolation and Serialization
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn users_get_independent_threads() {
    let backend = Arc::new(InMemoryBackend::new(RunBehavior::Echo));
    let pipeline = Arc::new(pipeline_with(&backend, 10));
    let receiver = callback_receiver().await;
    let url = callback_url(&receiver);

    let a = {
        let pipeline = pipeline.clone();
        let url = url.clone();
        tokio::spawn(async move { pipeline.process("u-a", "from a", &url).await })
    };
    let b = {
        let pipeline = pipeline.clone();
        let url = url.clone();
        tokio::spawn(async move { pipeline.process("u-b", "from b", &url).await })
    };
    a.await.unwrap();
    b.await.unwrap();

    let thread_a = pipeline.store().get("u-a").unwrap();
    let thread_b = pipeline.store().get("u-b").unwrap();
    assert_ne!(thread_a, thread_b);

    // No cross-user leakage in either direction.
    assert!(backend.messages(&thread_a).iter().all(|m| !m.text.contains("from b")));
    assert!(backend.messages(&thread_b).iter().all(|m| !m.text.contains("from a")));
}

#[tokio::test]
async fn same_user_units_are_mutually_exclusive() {
    let backend = Arc::new(
        InMemoryBackend::new(RunBehavior::Echo).with_run_delay(Duration::from_millis(50)),
    );
    let pipeline = Arc::new(pipeline_with(&backend, 10));
    let receiver = callback_receiver().await;
    let url = callback_url(&receiver);

    let handles: Vec<_> = (0..3)
        .map(|i| {
            let pipeline = pipeline.clone();
            let url = url.clone();
            tokio::spawn(async move {
                pipeline.process("u-1", &format!("burst {i}"), &url).await;
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap();
    }

    // All three turns landed on one serialized session.
    assert_eq!(backend.max_observed_concurrency(), 1);
    let thread = pipeline.store().get("u-1").unwrap();
    assert_eq!(backend.messages(&thread).len(), 6);
}

#[tokio::test]
async fn different_users_run_in_parallel() {
    let backend = Arc::new(
        InMemoryBackend::new(RunBehavior::Echo).with_run_delay(Duration::from_millis(100)),
    );
    let pipeline = Arc::new(pipeline_with(&backend, 10));
    let receiver = callback_receiver().await;
    let url = callback_url(&receiver);

    let handles: Vec<_> = ["u-a", "u-b"]
        .iter()
        .map(|user| {
            let pipeline = pipeline.clone();
            let url = url.clone();
            let user = user.to_string();
            tokio::spawn(async move {
                pipeline.process(&user, "hello", &url).await;
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(backend.max_observed_concurrency(), 2);
}

// ─────────────────────────────────────────────────────────────────────────────
// Failure Paths
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn failed_run_delivers_status_text_instead_of_crashing() {
    let backend = Arc::new(InMemoryBackend::new(RunBehavior::Fail("rate_limited".into())));
    let pipeline = pipeline_with(&backend, 10);
    let receiver = callback_receiver().await;

    pipeline
        .process("u-1", "hello", &callback_url(&receiver))
        .await;

    let requests = receiver.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);

    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    let text = body["template"]["outputs"][0]["simpleText"]["text"]
        .as_str()
        .unwrap();
    assert!(text.contains("rate_limited"));
}

#[tokio::test]
async fn silent_run_delivers_no_reply_text() {
    let backend = Arc::new(InMemoryBackend::new(RunBehavior::Silent));
    let pipeline = pipeline_with(&backend, 10);
    let receiver = callback_receiver().await;

    pipeline
        .process("u-1", "hello", &callback_url(&receiver))
        .await;

    let requests = receiver.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    let text = body["template"]["outputs"][0]["simpleText"]["text"]
        .as_str()
        .unwrap();
    assert_eq!(text, "어시스턴트 응답을 찾지 못했습니다.");
}

#[tokio::test]
async fn delivery_failure_leaves_the_session_intact() {
    let backend = Arc::new(InMemoryBackend::new(RunBehavior::Echo));
    let pipeline = pipeline_with(&backend, 10);

    // Nothing listens here; delivery fails after the answer is finished.
    pipeline
        .process("u-1", "hello", "http://127.0.0.1:9/callback")
        .await;

    let handle = pipeline.store().get("u-1").unwrap();
    let messages = backend.messages(&handle);
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].text, "re: hello");
}

// ─────────────────────────────────────────────────────────────────────────────
// One-Shot Mode
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn one_shot_requests_never_share_threads() {
    let backend = Arc::new(InMemoryBackend::new(RunBehavior::Echo));
    let pipeline = pipeline_with(&backend, 10);
    let receiver = callback_receiver().await;
    let url = callback_url(&receiver);

    pipeline.process_single("first", &url).await;
    pipeline.process_single("second", &url).await;

    assert_eq!(backend.thread_count(), 2);
    assert_eq!(pipeline.store().session_count(), 0);

    let requests = receiver.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
}
