//! Shared in-memory assistant backend double for server tests.

#![allow(dead_code)]

use async_trait::async_trait;
use skillbot_agent::{
    AgentError, AgentResult, AssistantBackend, MessageRole, RunOutcome, ThreadMessage,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// What a run does to the thread.
pub enum RunBehavior {
    /// Append an assistant echo of the most recent user message
    Echo,
    /// Complete without producing an assistant message
    Silent,
    /// End in a failed terminal state with the given status description
    Fail(String),
}

/// In-memory thread storage standing in for the assistant API.
pub struct InMemoryBackend {
    threads: Mutex<HashMap<String, Vec<ThreadMessage>>>,
    next_id: AtomicUsize,
    run_behavior: RunBehavior,
    run_delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl InMemoryBackend {
    pub fn new(run_behavior: RunBehavior) -> Self {
        Self {
            threads: Mutex::new(HashMap::new()),
            next_id: AtomicUsize::new(0),
            run_behavior,
            run_delay: Duration::ZERO,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Make runs take a while, so overlap between units becomes observable.
    pub fn with_run_delay(mut self, delay: Duration) -> Self {
        self.run_delay = delay;
        self
    }

    pub fn messages(&self, thread_id: &str) -> Vec<ThreadMessage> {
        self.threads
            .lock()
            .unwrap()
            .get(thread_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn thread_count(&self) -> usize {
        self.threads.lock().unwrap().len()
    }

    /// Largest number of runs that were ever in flight at once.
    pub fn max_observed_concurrency(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AssistantBackend for InMemoryBackend {
    async fn create_thread(&self) -> AgentResult<String> {
        let id = format!("thread_{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        self.threads.lock().unwrap().insert(id.clone(), Vec::new());
        Ok(id)
    }

    async fn add_message(
        &self,
        thread_id: &str,
        role: MessageRole,
        text: &str,
    ) -> AgentResult<()> {
        let mut threads = self.threads.lock().unwrap();
        let messages = threads
            .get_mut(thread_id)
            .ok_or_else(|| AgentError::InvalidThread(thread_id.to_string()))?;
        let created_at = messages.len() as i64;
        messages.push(ThreadMessage {
            role,
            text: text.into(),
            created_at,
        });
        Ok(())
    }

    async fn list_messages(&self, thread_id: &str) -> AgentResult<Vec<ThreadMessage>> {
        Ok(self.messages(thread_id))
    }

    async fn run(&self, thread_id: &str) -> AgentResult<RunOutcome> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.run_delay.is_zero() {
            tokio::time::sleep(self.run_delay).await;
        }

        let outcome = match &self.run_behavior {
            RunBehavior::Echo => {
                let mut threads = self.threads.lock().unwrap();
                let messages = threads
                    .get_mut(thread_id)
                    .ok_or_else(|| AgentError::InvalidThread(thread_id.to_string()))?;
                let last_user = messages
                    .iter()
                    .rev()
                    .find(|m| m.role == MessageRole::User)
                    .map(|m| m.text.clone())
                    .unwrap_or_default();
                let created_at = messages.len() as i64;
                messages.push(ThreadMessage {
                    role: MessageRole::Assistant,
                    text: format!("re: {last_user}"),
                    created_at,
                });
                RunOutcome::Completed
            }
            RunBehavior::Silent => RunOutcome::Completed,
            RunBehavior::Fail(status) => RunOutcome::Failed(status.clone()),
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(outcome)
    }
}
