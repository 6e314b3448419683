//! Bounded per-session conversation history.
//!
//! Each session keeps the most recent turns in a FIFO buffer and carries an
//! async gate so queries on one session run in submission order while
//! different sessions proceed in parallel.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::OwnedMutexGuard;
use tracing::debug;
use uuid::Uuid;

/// Who said a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One message in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Default)]
struct Session {
    turns: Mutex<VecDeque<ConversationTurn>>,
    gate: Arc<tokio::sync::Mutex<()>>,
}

fn guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-process session store.
pub struct SessionManager {
    max_turns: usize,
    sessions: Mutex<HashMap<String, Arc<Session>>>,
}

impl SessionManager {
    /// Create a manager keeping at most `max_turns` turns per session.
    pub fn new(max_turns: usize) -> Self {
        Self {
            max_turns,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Start a new empty session and return its id.
    pub fn create_session(&self) -> String {
        let id = Uuid::new_v4().to_string();
        guard(&self.sessions).insert(id.clone(), Arc::new(Session::default()));
        debug!("Created session {}", id);
        id
    }

    fn session(&self, session_id: &str) -> Arc<Session> {
        guard(&self.sessions)
            .entry(session_id.to_string())
            .or_default()
            .clone()
    }

    /// Whether a session exists.
    pub fn contains(&self, session_id: &str) -> bool {
        guard(&self.sessions).contains_key(session_id)
    }

    /// Append a turn, evicting the oldest turns beyond the limit.
    pub fn append(&self, session_id: &str, turn: ConversationTurn) {
        let session = self.session(session_id);
        let mut turns = guard(&session.turns);
        turns.push_back(turn);
        while turns.len() > self.max_turns {
            turns.pop_front();
        }
    }

    /// Append a user question and the assistant's answer.
    pub fn add_exchange(&self, session_id: &str, user: &str, assistant: &str) {
        self.append(session_id, ConversationTurn::user(user));
        self.append(session_id, ConversationTurn::assistant(assistant));
    }

    /// Retained turns, oldest first. Unknown sessions have no history.
    pub fn history(&self, session_id: &str) -> Vec<ConversationTurn> {
        let Some(session) = guard(&self.sessions).get(session_id).cloned() else {
            return Vec::new();
        };
        let turns = guard(&session.turns);
        turns.iter().cloned().collect()
    }

    /// Drop all turns of a session.
    pub fn clear(&self, session_id: &str) {
        if let Some(session) = guard(&self.sessions).get(session_id) {
            guard(&session.turns).clear();
        }
    }

    /// Wait for exclusive use of a session.
    ///
    /// Waiters are served in arrival order.
    pub async fn lock(&self, session_id: &str) -> OwnedMutexGuard<()> {
        let gate = self.session(session_id).gate.clone();
        gate.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_history_keeps_most_recent_turns_in_order() {
        let sessions = SessionManager::new(4);
        let id = sessions.create_session();

        for i in 0..3 {
            sessions.add_exchange(&id, &format!("q{i}"), &format!("a{i}"));
        }

        let contents: Vec<_> = sessions
            .history(&id)
            .into_iter()
            .map(|t| t.content)
            .collect();
        assert_eq!(contents, vec!["q1", "a1", "q2", "a2"]);
        assert_eq!(sessions.history(&id)[0].role, Role::User);
    }

    #[test]
    fn test_sessions_are_isolated() {
        let sessions = SessionManager::new(4);
        let a = sessions.create_session();
        let b = sessions.create_session();
        assert_ne!(a, b);

        sessions.add_exchange(&a, "hello", "hi");
        assert_eq!(sessions.history(&a).len(), 2);
        assert!(sessions.history(&b).is_empty());
        assert!(sessions.history("unknown").is_empty());
    }

    #[test]
    fn test_clear() {
        let sessions = SessionManager::new(4);
        let id = sessions.create_session();
        sessions.add_exchange(&id, "q", "a");
        sessions.clear(&id);
        assert!(sessions.history(&id).is_empty());
        assert!(sessions.contains(&id));
    }

    #[tokio::test]
    async fn test_lock_serializes_same_session() {
        let sessions = Arc::new(SessionManager::new(4));
        let id = sessions.create_session();

        let guard = sessions.lock(&id).await;

        let waiter = {
            let sessions = sessions.clone();
            let id = id.clone();
            tokio::spawn(async move {
                let _guard = sessions.lock(&id).await;
                sessions.append(&id, ConversationTurn::user("second"));
            })
        };

        // Another session is not blocked
        let other = sessions.create_session();
        let _other_guard = sessions.lock(&other).await;

        tokio::time::sleep(Duration::from_millis(20)).await;
        sessions.append(&id, ConversationTurn::user("first"));
        drop(guard);
        waiter.await.unwrap();

        let contents: Vec<_> = sessions.history(&id).into_iter().map(|t| t.content).collect();
        assert_eq!(contents, vec!["first", "second"]);
    }
}
