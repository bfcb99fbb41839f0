//! Conversation history management.
//!
//! Per-session message history with optional length trimming and LRU eviction
//! of idle sessions. Each adapter owns one of these.

use indexmap::IndexMap;
use tokio::sync::RwLock;

use crate::{Message, Role};

/// Default maximum number of sessions to track before LRU eviction.
const DEFAULT_MAX_SESSIONS: usize = 10000;

/// Per-session conversation history with LRU eviction.
///
/// # Example
///
/// ```rust
/// use brain_core::{ConversationHistory, Message};
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() {
///     let history = ConversationHistory::unbounded();
///
///     history
///         .append("s-1", vec![Message::user("你好"), Message::assistant("您好！")])
///         .await;
///
///     assert_eq!(history.get("s-1").await.len(), 2);
///     assert_eq!(history.take("s-1").await.len(), 2);
///     assert!(history.get("s-1").await.is_empty());
/// }
/// ```
#[derive(Debug)]
pub struct ConversationHistory {
    /// Session id to ordered messages, oldest session first.
    histories: RwLock<IndexMap<String, Vec<Message>>>,
    /// Maximum messages kept per session; 0 keeps everything.
    max_messages: usize,
    max_sessions: usize,
}

impl Default for ConversationHistory {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl ConversationHistory {
    /// Keep at most `max_messages` per session (0 = unlimited).
    pub fn new(max_messages: usize) -> Self {
        Self::with_limits(max_messages, DEFAULT_MAX_SESSIONS)
    }

    /// Keep every message of every session (subject to session eviction).
    pub fn unbounded() -> Self {
        Self::new(0)
    }

    pub fn with_limits(max_messages: usize, max_sessions: usize) -> Self {
        Self {
            histories: RwLock::new(IndexMap::new()),
            max_messages,
            max_sessions,
        }
    }

    /// Get the history for a session, marking it recently used.
    pub async fn get(&self, session_id: &str) -> Vec<Message> {
        let mut histories = self.histories.write().await;

        if let Some(entry) = histories.shift_remove(session_id) {
            let result = entry.clone();
            histories.insert(session_id.to_string(), entry);
            result
        } else {
            Vec::new()
        }
    }

    /// Whether the session has no recorded messages.
    pub async fn is_empty(&self, session_id: &str) -> bool {
        let histories = self.histories.read().await;
        histories.get(session_id).map_or(true, |h| h.is_empty())
    }

    /// Append messages in order.
    pub async fn append(&self, session_id: &str, messages: Vec<Message>) {
        if messages.is_empty() {
            return;
        }
        let mut histories = self.histories.write().await;

        let mut history = histories.shift_remove(session_id).unwrap_or_default();
        history.extend(messages);
        self.trim(&mut history);
        histories.insert(session_id.to_string(), history);

        while histories.len() > self.max_sessions {
            histories.shift_remove_index(0);
        }
    }

    /// Atomically read and clear a session's history.
    pub async fn take(&self, session_id: &str) -> Vec<Message> {
        let mut histories = self.histories.write().await;
        histories.shift_remove(session_id).unwrap_or_default()
    }

    /// Clear all conversation histories.
    pub async fn clear_all(&self) {
        let mut histories = self.histories.write().await;
        histories.clear();
    }

    /// Number of sessions currently tracked.
    pub async fn session_count(&self) -> usize {
        let histories = self.histories.read().await;
        histories.len()
    }

    fn trim(&self, history: &mut Vec<Message>) {
        if self.max_messages == 0 || history.len() <= self.max_messages {
            return;
        }
        let mut start = history.len() - self.max_messages;
        // A tool result is meaningless without the assistant call before it.
        while start < history.len() && history[start].role == Role::Tool {
            start += 1;
        }
        history.drain(0..start);
    }
}
