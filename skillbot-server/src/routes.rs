//! HTTP routes for the skill webhook server.
//!
//! The webhook handlers answer synchronously with the fixed "processing"
//! acknowledgement and spawn the pipeline as an independent background
//! task. The platform's response-time budget is therefore never exposed to
//! inference latency.

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use crate::payload::{self, SkillEvent};
use crate::pipeline::SessionPipeline;

// ============================================================================
// State
// ============================================================================

/// Shared state for the skill HTTP server.
pub struct AppState {
    /// The session pipeline behind every webhook event
    pub pipeline: Arc<SessionPipeline>,
    /// Text for the immediate acknowledgement
    pub ack_text: String,
}

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
}

// ============================================================================
// Health Routes
// ============================================================================

async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        service: "skillbot-server",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn ready() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ready",
            service: "skillbot-server",
            version: env!("CARGO_PKG_VERSION"),
        }),
    )
}

// ============================================================================
// Skill Webhooks
// ============================================================================

/// POST /skill: session-backed (multi-turn) skill endpoint.
async fn skill_webhook(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    let event = SkillEvent::from_value(&body);
    let request_id = uuid::Uuid::new_v4().to_string();

    tracing::info!(
        request_id = %request_id,
        user_id = ?event.user_id,
        utterance = %event.utterance.chars().take(50).collect::<String>(),
        "Skill event received"
    );

    // The background answer needs both a destination and a session key.
    // Anything less still gets the acknowledgement (graceful degradation).
    match (event.callback_url, event.user_id) {
        (Some(callback_url), Some(user_id)) => {
            let pipeline = state.pipeline.clone();
            let utterance = event.utterance;
            tokio::spawn(async move {
                pipeline.process(&user_id, &utterance, &callback_url).await;
                tracing::debug!(request_id = %request_id, "Background unit finished");
            });
        }
        (callback_url, user_id) => {
            tracing::warn!(
                request_id = %request_id,
                has_callback_url = callback_url.is_some(),
                has_user_id = user_id.is_some(),
                "Event is missing required fields; answer not scheduled"
            );
        }
    }

    Json(payload::ack(&state.ack_text))
}

/// POST /skill/single: stateless one-shot skill endpoint.
///
/// Every request runs on a fresh thread; no session is kept.
async fn skill_single_webhook(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    let event = SkillEvent::from_value(&body);
    let request_id = uuid::Uuid::new_v4().to_string();

    tracing::info!(
        request_id = %request_id,
        utterance = %event.utterance.chars().take(50).collect::<String>(),
        "One-shot skill event received"
    );

    match event.callback_url {
        Some(callback_url) => {
            let pipeline = state.pipeline.clone();
            let utterance = event.utterance;
            tokio::spawn(async move {
                pipeline.process_single(&utterance, &callback_url).await;
                tracing::debug!(request_id = %request_id, "Background unit finished");
            });
        }
        None => {
            tracing::warn!(
                request_id = %request_id,
                "Event is missing callbackUrl; answer not scheduled"
            );
        }
    }

    Json(payload::ack(&state.ack_text))
}

// ============================================================================
// Router Builder
// ============================================================================

/// Build the skill HTTP router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health endpoints
        .route("/health", get(health))
        .route("/ready", get(ready))
        // Skill webhooks
        .route("/skill", post(skill_webhook))
        .route("/skill/single", post(skill_single_webhook))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use skillbot_agent::{AgentResult, AssistantBackend, MessageRole, RunOutcome, ThreadMessage};
    use tower::ServiceExt;

    struct IdleBackend;

    #[async_trait]
    impl AssistantBackend for IdleBackend {
        async fn create_thread(&self) -> AgentResult<String> {
            Ok("thread_test".into())
        }

        async fn add_message(
            &self,
            _thread_id: &str,
            _role: MessageRole,
            _text: &str,
        ) -> AgentResult<()> {
            Ok(())
        }

        async fn list_messages(&self, _thread_id: &str) -> AgentResult<Vec<ThreadMessage>> {
            Ok(Vec::new())
        }

        async fn run(&self, _thread_id: &str) -> AgentResult<RunOutcome> {
            Ok(RunOutcome::Completed)
        }
    }

    fn test_app() -> Router {
        let pipeline = Arc::new(SessionPipeline::new(Arc::new(IdleBackend), 10));
        build_router(Arc::new(AppState {
            pipeline,
            ack_text: "생각 중".into(),
        }))
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_skill_ack_shape() {
        let body = serde_json::json!({
            "userRequest": {
                "utterance": "hello",
                "callbackUrl": "http://127.0.0.1:9/cb",
                "user": {"id": "u-1"}
            }
        });

        let response = test_app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/skill")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024).await.unwrap();
        let json: Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(json["version"], "2.0");
        assert_eq!(json["useCallback"], true);
        assert_eq!(json["data"]["text"], "생각 중");
    }

    #[tokio::test]
    async fn test_skill_ack_even_when_fields_missing() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/skill")
                    .header("content-type", "application/json")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024).await.unwrap();
        let json: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["useCallback"], true);
    }
}
