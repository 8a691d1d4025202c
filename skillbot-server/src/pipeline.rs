//! Session pipeline: the background unit of work behind each webhook event.
//!
//! Handles the complete answer flow:
//! 1. Resolve (or create) the user's session thread
//! 2. Trim the context window if the thread has overgrown
//! 3. Append the incoming utterance
//! 4. Run the assistant and extract the reply
//! 5. Deliver the result to the callback URL
//!
//! Steps 1–4 run under the user's work lock; delivery runs after the lock
//! is released, since the session handle is already final by then. Every
//! failure on the way is recovered locally into a user-visible status
//! string. Nothing in this pipeline may take the worker down.

use crate::delivery::CallbackSender;
use crate::payload;
use crate::session::SessionStore;
use crate::window::ContextWindow;
use skillbot_agent::{AssistantBackend, MessageRole, RunOutcome};
use std::sync::Arc;

/// Shown when generation failed outright (backend unreachable, append
/// rejected, run errored).
const GENERIC_FAILURE_TEXT: &str =
    "죄송해요, 지금은 답변을 만들 수 없어요. 잠시 후 다시 시도해 주세요.";

/// Shown when a run completed but produced no assistant message.
const NO_REPLY_TEXT: &str = "어시스턴트 응답을 찾지 못했습니다.";

/// Orchestrates sessions, context trimming, inference, and delivery.
pub struct SessionPipeline {
    store: SessionStore,
    backend: Arc<dyn AssistantBackend>,
    window: ContextWindow,
    delivery: CallbackSender,
}

impl SessionPipeline {
    /// Create a pipeline around the given backend.
    pub fn new(backend: Arc<dyn AssistantBackend>, max_context_messages: usize) -> Self {
        Self {
            store: SessionStore::new(),
            backend,
            window: ContextWindow::new(max_context_messages),
            delivery: CallbackSender::new(),
        }
    }

    /// Replace the delivery sender (tests use a short timeout).
    pub fn with_delivery(mut self, delivery: CallbackSender) -> Self {
        self.delivery = delivery;
        self
    }

    /// The session store (exposed for inspection).
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Background unit for a session-backed (multi-turn) event.
    ///
    /// Units for different users run fully in parallel; units for the same
    /// user queue on the per-user lock and execute one at a time.
    pub async fn process(&self, user_id: &str, utterance: &str, callback_url: &str) {
        let reply = {
            let lock = self.store.user_lock(user_id);
            let _guard = lock.lock().await;
            self.answer(user_id, utterance).await
        };

        self.delivery
            .deliver(callback_url, &payload::simple_text(reply))
            .await;
    }

    /// Background unit for a stateless one-shot event: a fresh thread per
    /// request, no session entry, no lock.
    pub async fn process_single(&self, utterance: &str, callback_url: &str) {
        let reply = match self.backend.create_thread().await {
            Ok(thread_id) => self.ask(&thread_id, utterance).await,
            Err(e) => {
                tracing::error!(error = %e, "Failed to create one-shot thread");
                GENERIC_FAILURE_TEXT.to_string()
            }
        };

        self.delivery
            .deliver(callback_url, &payload::simple_text(reply))
            .await;
    }

    /// Produce the reply text for one utterance on the user's session.
    ///
    /// Must be called with the user's work lock held.
    async fn answer(&self, user_id: &str, utterance: &str) -> String {
        // Resolve or create the session thread.
        let thread_id = match self.store.get(user_id) {
            Some(id) => {
                tracing::debug!(user_id = %user_id, thread_id = %id, "Reusing session thread");
                id
            }
            None => match self.backend.create_thread().await {
                Ok(id) => {
                    self.store.set(user_id, id.clone());
                    tracing::info!(user_id = %user_id, thread_id = %id, "Created session thread");
                    id
                }
                Err(e) => {
                    tracing::error!(user_id = %user_id, error = %e, "Failed to create session thread");
                    return GENERIC_FAILURE_TEXT.to_string();
                }
            },
        };

        // Trim the window. A failed migration is not fatal to the request:
        // the store keeps the original handle and we answer untrimmed.
        let thread_id = match self.window.maybe_trim(self.backend.as_ref(), &thread_id).await {
            Ok(fresh) => {
                if fresh != thread_id {
                    self.store.set(user_id, fresh.clone());
                }
                fresh
            }
            Err(e) => {
                tracing::warn!(
                    user_id = %user_id,
                    thread_id = %thread_id,
                    error = %e,
                    "Context trim failed; continuing with the current thread"
                );
                thread_id
            }
        };

        self.ask(&thread_id, utterance).await
    }

    /// Append the utterance, run the assistant, extract the reply.
    async fn ask(&self, thread_id: &str, utterance: &str) -> String {
        if let Err(e) = self
            .backend
            .add_message(thread_id, MessageRole::User, utterance)
            .await
        {
            tracing::error!(thread_id = %thread_id, error = %e, "Failed to append utterance");
            return GENERIC_FAILURE_TEXT.to_string();
        }

        match self.backend.run(thread_id).await {
            Ok(RunOutcome::Completed) => match self.backend.latest_reply(thread_id).await {
                Ok(Some(text)) => text,
                Ok(None) => {
                    tracing::warn!(thread_id = %thread_id, "Run completed without an assistant message");
                    NO_REPLY_TEXT.to_string()
                }
                Err(e) => {
                    tracing::error!(thread_id = %thread_id, error = %e, "Failed to fetch the reply");
                    GENERIC_FAILURE_TEXT.to_string()
                }
            },
            Ok(RunOutcome::Failed(status)) => {
                tracing::warn!(thread_id = %thread_id, status = %status, "Run ended in failure");
                format!("Run status: {status}")
            }
            Err(e) => {
                tracing::error!(thread_id = %thread_id, error = %e, "Run request failed");
                GENERIC_FAILURE_TEXT.to_string()
            }
        }
    }
}
