//! Rolling context window management.
//!
//! Threads grow without bound upstream; the window keeps per-user context
//! at a fixed ceiling by migrating an overgrown thread to a fresh one that
//! holds only the most recent messages.

use skillbot_agent::{AgentError, AssistantBackend};
use thiserror::Error;

/// Context migration failed; the caller must keep the original handle.
#[derive(Debug, Error)]
#[error("Context trim failed: {0}")]
pub struct TrimError(#[from] AgentError);

/// Migrates an overgrown thread to a fresh one.
pub struct ContextWindow {
    limit: usize,
}

impl ContextWindow {
    /// Create a window with the given message ceiling.
    pub fn new(limit: usize) -> Self {
        Self { limit }
    }

    /// The configured message ceiling.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Returns the handle the session should use from here on.
    ///
    /// A thread at or under the ceiling (or an empty one) is returned
    /// unchanged. An overgrown thread is replaced: a fresh thread is
    /// created and the last `limit` messages are replayed into it in their
    /// original order, preserving roles.
    ///
    /// The migration is all-or-nothing from the caller's point of view: on
    /// any failure the original handle stays the session's truth and the
    /// partially-populated replacement is abandoned upstream.
    pub async fn maybe_trim(
        &self,
        backend: &dyn AssistantBackend,
        thread_id: &str,
    ) -> Result<String, TrimError> {
        let messages = backend.list_messages(thread_id).await?;

        if messages.is_empty() || messages.len() <= self.limit {
            return Ok(thread_id.to_string());
        }

        let fresh = backend.create_thread().await?;
        let keep = &messages[messages.len() - self.limit..];

        for message in keep {
            backend.add_message(&fresh, message.role, &message.text).await?;
        }

        tracing::info!(
            old_thread = %thread_id,
            new_thread = %fresh,
            dropped = messages.len() - keep.len(),
            kept = keep.len(),
            "Migrated conversation to a fresh thread"
        );

        Ok(fresh)
    }
}
