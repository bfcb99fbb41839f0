//! Per-session state and the store that serializes access to it.
//!
//! Conversation history is not here: it lives with the model adapters. A
//! [`Session`] holds what the orchestrator itself tracks between turns.

use std::sync::Arc;

use indexmap::IndexMap;
use tokio::sync::Mutex;
use tracing::debug;

use crate::workflow::WorkflowTracker;

/// Orchestrator-owned state of one conversation.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub tracker: WorkflowTracker,
    /// Consecutive silence signals since the last real utterance.
    pub silence_count: u32,
}

impl Session {
    pub fn new<S: AsRef<str>>(tasks: &[S]) -> Self {
        Self {
            tracker: WorkflowTracker::new(tasks.iter().map(|t| t.as_ref().to_string())),
            silence_count: 0,
        }
    }

    /// Reload tasks and zero the silence counter.
    pub fn reset<S: AsRef<str>>(&mut self, tasks: &[S]) {
        self.tracker
            .update_tasks(tasks.iter().map(|t| t.as_ref().to_string()));
        self.silence_count = 0;
    }
}

/// Default maximum number of sessions kept before the least recently used is dropped.
pub const DEFAULT_MAX_SESSIONS: usize = 10000;

/// Sessions by id, least recently used first.
///
/// Each session sits behind its own mutex. A turn holds that lock from start
/// to finish, so turns of one session run one at a time while other sessions
/// proceed. Evicting a session never interrupts a turn already holding it.
#[derive(Debug)]
pub struct SessionStore {
    sessions: Mutex<IndexMap<String, Arc<Mutex<Session>>>>,
    max_sessions: usize,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_SESSIONS)
    }

    /// Keep at most `max_sessions` sessions (minimum 1).
    pub fn with_capacity(max_sessions: usize) -> Self {
        Self {
            sessions: Mutex::new(IndexMap::new()),
            max_sessions: max_sessions.max(1),
        }
    }

    /// The session for `id`, created with `tasks` if it does not exist yet.
    ///
    /// Marks the session recently used.
    pub async fn get_or_create<S: AsRef<str>>(&self, id: &str, tasks: &[S]) -> Arc<Mutex<Session>> {
        let mut sessions = self.sessions.lock().await;

        let session = sessions.shift_remove(id).unwrap_or_else(|| {
            debug!(session = %id, "Creating session");
            Arc::new(Mutex::new(Session::new(tasks)))
        });
        sessions.insert(id.to_string(), session.clone());

        while sessions.len() > self.max_sessions {
            if let Some((evicted, _)) = sessions.shift_remove_index(0) {
                debug!(session = %evicted, "Evicting least recently used session");
            }
        }
        session
    }

    pub async fn get(&self, id: &str) -> Option<Arc<Mutex<Session>>> {
        self.sessions.lock().await.get(id).cloned()
    }

    pub async fn remove(&self, id: &str) -> Option<Arc<Mutex<Session>>> {
        self.sessions.lock().await.shift_remove(id)
    }

    /// Every live session.
    pub async fn all(&self) -> Vec<(String, Arc<Mutex<Session>>)> {
        self.sessions
            .lock()
            .await
            .iter()
            .map(|(id, s)| (id.clone(), s.clone()))
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_or_create_returns_same_session() {
        let store = SessionStore::new();
        let first = store.get_or_create("s1", &["1. a", "2. b"]).await;
        first.lock().await.silence_count = 2;

        // Task list is only used on creation.
        let second = store.get_or_create("s1", &["x"]).await;
        let session = second.lock().await;
        assert_eq!(session.silence_count, 2);
        assert_eq!(session.tracker.task_names(), vec!["1. a", "2. b"]);
        drop(session);

        assert_eq!(store.len().await, 1);
        assert!(store.get("s2").await.is_none());
    }

    #[tokio::test]
    async fn test_reset_reloads_tasks() {
        let mut session = Session::new(&["1. a"]);
        session.tracker.complete_all();
        session.silence_count = 3;

        session.reset(&["1. a", "2. b"]);
        assert_eq!(session.silence_count, 0);
        assert!(!session.tracker.is_workflow_complete());
        assert_eq!(session.tracker.tasks().len(), 2);
    }

    #[tokio::test]
    async fn test_remove() {
        let store = SessionStore::new();
        store.get_or_create("s1", &["a"]).await;
        assert!(store.remove("s1").await.is_some());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_least_recently_used_session_is_evicted() {
        let store = SessionStore::with_capacity(2);
        store.get_or_create("s1", &["a"]).await;
        store.get_or_create("s2", &["a"]).await;
        // Touch s1 so s2 becomes the oldest.
        store.get_or_create("s1", &["a"]).await;
        store.get_or_create("s3", &["a"]).await;

        assert_eq!(store.len().await, 2);
        assert!(store.get("s1").await.is_some());
        assert!(store.get("s2").await.is_none());
        assert!(store.get("s3").await.is_some());
    }
}
