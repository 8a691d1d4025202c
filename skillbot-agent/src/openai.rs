//! OpenAI Assistants API backend.
//!
//! Implements [`AssistantBackend`] against the `/threads`, `/messages`, and
//! `/runs` endpoints (Assistants v2). Runs are executed by creating a run
//! and polling its status until a terminal state, bounded by a configurable
//! ceiling.

use crate::backend::{
    AgentError, AgentResult, AssistantBackend, MessageRole, RunOutcome, ThreadMessage,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use skillbot_common::config::AssistantConfig;
use std::time::Duration;
use tokio::time::Instant;

/// Run states that still need polling.
const ACTIVE_RUN_STATUSES: &[&str] = &["queued", "in_progress", "cancelling"];

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct ThreadObject {
    id: String,
}

#[derive(Debug, Serialize)]
struct CreateMessageRequest<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessageObject {
    role: String,
    created_at: i64,
    #[serde(default)]
    content: Vec<ContentPart>,
}

#[derive(Debug, Deserialize)]
struct ContentPart {
    #[serde(rename = "type")]
    kind: String,
    text: Option<TextContent>,
}

#[derive(Debug, Deserialize)]
struct TextContent {
    value: String,
}

#[derive(Debug, Deserialize)]
struct MessageListResponse {
    #[serde(default)]
    data: Vec<MessageObject>,
}

#[derive(Debug, Serialize)]
struct CreateRunRequest<'a> {
    assistant_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct RunObject {
    id: String,
    status: String,
    last_error: Option<RunLastError>,
}

#[derive(Debug, Deserialize)]
struct RunLastError {
    code: String,
    #[allow(dead_code)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

impl MessageObject {
    /// Concatenated text of all text-typed content parts.
    fn text(&self) -> String {
        self.content
            .iter()
            .filter(|part| part.kind == "text")
            .filter_map(|part| part.text.as_ref())
            .map(|t| t.value.as_str())
            .collect::<Vec<_>>()
            .join("")
    }
}

// ============================================================================
// Client
// ============================================================================

/// Assistants API client.
pub struct OpenAiAssistant {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    assistant_id: String,
    poll_interval: Duration,
    max_wait: Duration,
}

impl OpenAiAssistant {
    /// Create a client for the given API endpoint and credentials.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        assistant_id: impl Into<String>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            assistant_id: assistant_id.into(),
            poll_interval: Duration::from_millis(1_000),
            max_wait: Duration::from_secs(120),
        }
    }

    /// Build a client from configuration.
    pub fn from_config(config: &AssistantConfig) -> Self {
        Self::new(&config.base_url, &config.api_key, &config.assistant_id)
            .with_poll_interval(Duration::from_millis(config.poll_interval_ms))
            .with_max_wait(Duration::from_secs(config.max_wait_secs))
    }

    /// Set the interval between run-status polls.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the hard ceiling on how long a run may be polled.
    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .bearer_auth(&self.api_key)
            .header("OpenAI-Beta", "assistants=v2")
    }

    /// Check the response status and deserialize the body.
    ///
    /// 404 on a thread-scoped endpoint means the handle is gone upstream;
    /// other non-success statuses carry the API's error message.
    async fn read_json<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> AgentResult<T> {
        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorEnvelope>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(AgentError::InvalidThread(message));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorEnvelope>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(AgentError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| AgentError::BadResponse(e.to_string()))
    }

    async fn fetch_run(&self, thread_id: &str, run_id: &str) -> AgentResult<RunObject> {
        let response = self
            .request(self.client.get(self.url(&format!(
                "/threads/{thread_id}/runs/{run_id}"
            ))))
            .send()
            .await
            .map_err(|e| AgentError::Upstream(e.to_string()))?;

        Self::read_json(response).await
    }
}

#[async_trait]
impl AssistantBackend for OpenAiAssistant {
    async fn create_thread(&self) -> AgentResult<String> {
        let response = self
            .request(self.client.post(self.url("/threads")))
            .json(&serde_json::json!({}))
            .send()
            .await
            .map_err(|e| AgentError::Upstream(e.to_string()))?;

        let thread: ThreadObject = Self::read_json(response).await?;

        tracing::debug!(thread_id = %thread.id, "Created assistant thread");
        Ok(thread.id)
    }

    async fn add_message(
        &self,
        thread_id: &str,
        role: MessageRole,
        text: &str,
    ) -> AgentResult<()> {
        let request = CreateMessageRequest {
            role: role.as_str(),
            content: text,
        };

        let response = self
            .request(
                self.client
                    .post(self.url(&format!("/threads/{thread_id}/messages"))),
            )
            .json(&request)
            .send()
            .await
            .map_err(|e| AgentError::Upstream(e.to_string()))?;

        let _: serde_json::Value = Self::read_json(response).await?;
        Ok(())
    }

    async fn list_messages(&self, thread_id: &str) -> AgentResult<Vec<ThreadMessage>> {
        let response = self
            .request(
                self.client
                    .get(self.url(&format!("/threads/{thread_id}/messages")))
                    .query(&[("order", "asc"), ("limit", "100")]),
            )
            .send()
            .await
            .map_err(|e| AgentError::Upstream(e.to_string()))?;

        let list: MessageListResponse = Self::read_json(response).await?;

        Ok(list
            .data
            .into_iter()
            .map(|m| ThreadMessage {
                role: MessageRole::parse(&m.role),
                text: m.text(),
                created_at: m.created_at,
            })
            .collect())
    }

    async fn run(&self, thread_id: &str) -> AgentResult<RunOutcome> {
        let request = CreateRunRequest {
            assistant_id: &self.assistant_id,
        };

        let response = self
            .request(
                self.client
                    .post(self.url(&format!("/threads/{thread_id}/runs"))),
            )
            .json(&request)
            .send()
            .await
            .map_err(|e| AgentError::Upstream(e.to_string()))?;

        let mut run: RunObject = Self::read_json(response).await?;
        let started = Instant::now();

        // Poll until the run leaves its active states. The ceiling keeps a
        // stuck upstream from pinning a worker indefinitely.
        while ACTIVE_RUN_STATUSES.contains(&run.status.as_str()) {
            if started.elapsed() >= self.max_wait {
                tracing::warn!(
                    thread_id = %thread_id,
                    run_id = %run.id,
                    waited_secs = started.elapsed().as_secs(),
                    "Run poll ceiling reached"
                );
                return Err(AgentError::RunTimeout {
                    waited_secs: started.elapsed().as_secs(),
                });
            }

            tokio::time::sleep(self.poll_interval).await;
            run = self.fetch_run(thread_id, &run.id).await?;
        }

        tracing::debug!(
            thread_id = %thread_id,
            run_id = %run.id,
            status = %run.status,
            "Run reached terminal state"
        );

        match run.status.as_str() {
            "completed" => Ok(RunOutcome::Completed),
            status => {
                // Prefer the upstream error code when one is attached
                // (e.g. rate_limit_exceeded); fall back to the raw status.
                let description = run
                    .last_error
                    .map(|e| e.code)
                    .unwrap_or_else(|| status.to_string());
                Ok(RunOutcome::Failed(description))
            }
        }
    }
}
