//! Backend trait for assistant conversation APIs.
//!
//! Defines the interface the session pipeline programs against.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Result type for backend operations.
pub type AgentResult<T> = Result<T, AgentError>;

/// Backend error type.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// Transport-level failure reaching the assistant API.
    #[error("Assistant API unavailable: {0}")]
    Upstream(String),

    /// The API answered with a non-success status.
    #[error("Assistant API returned {status}: {message}")]
    Api { status: u16, message: String },

    /// The thread handle is no longer valid upstream.
    #[error("Thread not found: {0}")]
    InvalidThread(String),

    /// The run did not reach a terminal state within the poll ceiling.
    #[error("Run did not finish within {waited_secs}s")]
    RunTimeout { waited_secs: u64 },

    /// The API returned a body we could not interpret.
    #[error("Unexpected response: {0}")]
    BadResponse(String),
}

/// Message role in an assistant thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// User message
    User,
    /// Assistant (AI) response
    Assistant,
}

impl MessageRole {
    /// Wire representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }

    /// Parse from the wire representation. Unknown roles fall back to user.
    pub fn parse(s: &str) -> Self {
        match s {
            "assistant" => Self::Assistant,
            _ => Self::User,
        }
    }
}

/// A single message within a thread, in the backend's creation order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadMessage {
    /// Message role
    pub role: MessageRole,
    /// Plain-text content
    pub text: String,
    /// Creation timestamp (unix seconds) reported by the backend
    pub created_at: i64,
}

/// Terminal state of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The run finished and produced a new assistant message. The reply
    /// text is retrieved with [`AssistantBackend::latest_reply`].
    Completed,
    /// The run ended in a non-success terminal state; carries the upstream
    /// status description.
    Failed(String),
}

/// Assistant conversation backend.
///
/// Implementations handle authentication, request formatting, and response
/// parsing for a specific assistant API.
#[async_trait]
pub trait AssistantBackend: Send + Sync {
    /// Create a new, empty thread and return its handle.
    async fn create_thread(&self) -> AgentResult<String>;

    /// Append a message to a thread.
    async fn add_message(&self, thread_id: &str, role: MessageRole, text: &str)
        -> AgentResult<()>;

    /// List all messages of a thread in ascending creation order.
    async fn list_messages(&self, thread_id: &str) -> AgentResult<Vec<ThreadMessage>>;

    /// Execute a run against the thread, blocking until the upstream
    /// reaches a terminal state. The wait is bounded; an overlong run is
    /// reported as [`AgentError::RunTimeout`].
    async fn run(&self, thread_id: &str) -> AgentResult<RunOutcome>;

    /// The most recently created assistant message, if any.
    async fn latest_reply(&self, thread_id: &str) -> AgentResult<Option<String>> {
        let messages = self.list_messages(thread_id).await?;
        Ok(messages
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::Assistant)
            .map(|m| m.text.clone()))
    }
}
