//! Per-user conversation sessions.
//!
//! The store is the single source of truth for which thread a user is
//! talking on. It also owns the per-user work locks that serialize the
//! whole resolve → trim → append → run sequence, so two concurrent events
//! from one user can never race on the same backing thread.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Maps each user to their live thread handle.
///
/// Map access is internally synchronized and independent of the work
/// locks: a store lookup never observes a half-written entry, and readers
/// for other users are never blocked by one user's in-flight pipeline.
pub struct SessionStore {
    threads: DashMap<String, String>,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl SessionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            threads: DashMap::new(),
            locks: DashMap::new(),
        }
    }

    /// Current thread handle for a user, if a session exists.
    pub fn get(&self, user_id: &str) -> Option<String> {
        self.threads.get(user_id).map(|entry| entry.value().clone())
    }

    /// Point the user's session at a thread handle.
    ///
    /// Used both for first-contact sessions and for adopting the
    /// replacement handle after a context trim; the previous handle is
    /// abandoned wholesale.
    pub fn set(&self, user_id: &str, thread_id: String) {
        self.threads.insert(user_id.to_string(), thread_id);
    }

    /// The user's work lock.
    ///
    /// Callers hold this for the full duration of a pipeline pass. Entries
    /// are created on first use and kept for the process lifetime.
    pub fn user_lock(&self, user_id: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Number of live sessions.
    pub fn session_count(&self) -> usize {
        self.threads.len()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}
