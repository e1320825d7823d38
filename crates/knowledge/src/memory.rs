//! In-process conversation memory.
//!
//! Sessions are keyed by UUID and hold the most recent question/answer turns,
//! which the answer engine replays into the prompt.

use chrono::{DateTime, Duration, Utc};
use docqa_prompt::HistoryEntry;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// One question and the answer given to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub query: String,
    pub answer: String,
    pub timestamp: DateTime<Utc>,
}

impl From<&ConversationTurn> for HistoryEntry {
    fn from(turn: &ConversationTurn) -> Self {
        HistoryEntry {
            query: turn.query.clone(),
            answer: turn.answer.clone(),
        }
    }
}

#[derive(Debug, Clone)]
struct Session {
    created_at: DateTime<Utc>,
    last_activity: DateTime<Utc>,
    is_active: bool,
    turns: Vec<ConversationTurn>,
}

impl Session {
    fn new() -> Self {
        let now = Utc::now();
        Self {
            created_at: now,
            last_activity: now,
            is_active: true,
            turns: Vec::new(),
        }
    }
}

/// Summary of one session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    pub session_id: Uuid,
    pub turns: usize,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub duration_minutes: f64,
    pub is_active: bool,
}

/// Shared store of conversation sessions.
#[derive(Debug, Clone)]
pub struct ConversationMemory {
    sessions: Arc<RwLock<HashMap<Uuid, Session>>>,
    max_turns: usize,
}

impl ConversationMemory {
    /// Keep at most `max_turns` turns per session (minimum 1).
    pub fn new(max_turns: usize) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            max_turns: max_turns.max(1),
        }
    }

    pub fn max_turns(&self) -> usize {
        self.max_turns
    }

    pub async fn create_session(&self) -> Uuid {
        let id = Uuid::new_v4();
        self.sessions.write().await.insert(id, Session::new());
        tracing::info!("Created session {}", id);
        id
    }

    /// Append a turn, trimming the oldest ones past `max_turns`.
    ///
    /// An unknown session id is created on the spot.
    pub async fn record_turn(
        &self,
        session_id: Uuid,
        query: impl Into<String>,
        answer: impl Into<String>,
    ) {
        let mut sessions = self.sessions.write().await;
        let session = sessions.entry(session_id).or_insert_with(|| {
            tracing::warn!("Session {} not found, creating it", session_id);
            Session::new()
        });

        let now = Utc::now();
        session.turns.push(ConversationTurn {
            query: query.into(),
            answer: answer.into(),
            timestamp: now,
        });
        session.last_activity = now;

        if session.turns.len() > self.max_turns {
            let excess = session.turns.len() - self.max_turns;
            session.turns.drain(..excess);
        }
    }

    /// Most recent turns, oldest first; `limit` keeps only the last N.
    pub async fn history(&self, session_id: Uuid, limit: Option<usize>) -> Vec<ConversationTurn> {
        let sessions = self.sessions.read().await;
        let Some(session) = sessions.get(&session_id) else {
            return Vec::new();
        };

        let skip = limit
            .map(|n| session.turns.len().saturating_sub(n))
            .unwrap_or(0);
        session.turns[skip..].to_vec()
    }

    /// History in the shape the prompt builder takes.
    pub async fn history_entries(
        &self,
        session_id: Uuid,
        limit: Option<usize>,
    ) -> Vec<HistoryEntry> {
        self.history(session_id, limit)
            .await
            .iter()
            .map(HistoryEntry::from)
            .collect()
    }

    /// Forget all turns of a session but keep the session.
    pub async fn clear(&self, session_id: Uuid) {
        if let Some(session) = self.sessions.write().await.get_mut(&session_id) {
            session.turns.clear();
            tracing::info!("Cleared history for session {}", session_id);
        }
    }

    /// Mark a session inactive; its history stays readable.
    pub async fn end_session(&self, session_id: Uuid) {
        if let Some(session) = self.sessions.write().await.get_mut(&session_id) {
            session.is_active = false;
            tracing::info!("Ended session {}", session_id);
        }
    }

    /// Drop sessions idle for longer than `timeout`; returns how many.
    pub async fn cleanup_expired(&self, timeout: Duration) -> usize {
        self.cleanup_idle_since(Utc::now() - timeout).await
    }

    async fn cleanup_idle_since(&self, cutoff: DateTime<Utc>) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| session.last_activity >= cutoff);
        let removed = before - sessions.len();

        if removed > 0 {
            tracing::info!("Cleaned up {} expired sessions", removed);
        }
        removed
    }

    pub async fn session_stats(&self, session_id: Uuid) -> Option<SessionStats> {
        let sessions = self.sessions.read().await;
        let session = sessions.get(&session_id)?;

        Some(SessionStats {
            session_id,
            turns: session.turns.len(),
            created_at: session.created_at,
            last_activity: session.last_activity,
            duration_minutes: (session.last_activity - session.created_at).num_milliseconds()
                as f64
                / 60_000.0,
            is_active: session.is_active,
        })
    }

    pub async fn active_sessions(&self) -> Vec<Uuid> {
        self.sessions
            .read()
            .await
            .iter()
            .filter(|(_, session)| session.is_active)
            .map(|(id, _)| *id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_record_and_read_history() {
        let memory = ConversationMemory::new(10);
        let id = memory.create_session().await;

        memory.record_turn(id, "What is covered?", "Parts.").await;
        memory.record_turn(id, "For how long?", "Two years.").await;

        let history = memory.history(id, None).await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].query, "What is covered?");
        assert_eq!(history[1].answer, "Two years.");

        let last = memory.history_entries(id, Some(1)).await;
        assert_eq!(
            last,
            vec![HistoryEntry {
                query: "For how long?".to_string(),
                answer: "Two years.".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn test_history_trimmed_to_max_turns() {
        let memory = ConversationMemory::new(3);
        let id = memory.create_session().await;

        for i in 0..5 {
            memory.record_turn(id, format!("q{i}"), format!("a{i}")).await;
        }

        let queries: Vec<String> = memory
            .history(id, None)
            .await
            .into_iter()
            .map(|t| t.query)
            .collect();
        assert_eq!(queries, vec!["q2", "q3", "q4"]);
    }

    #[tokio::test]
    async fn test_unknown_session_is_created_on_record() {
        let memory = ConversationMemory::new(5);
        let id = Uuid::new_v4();

        assert!(memory.history(id, None).await.is_empty());
        assert!(memory.session_stats(id).await.is_none());

        memory.record_turn(id, "hello", "hi").await;
        assert_eq!(memory.session_stats(id).await.unwrap().turns, 1);
    }

    #[tokio::test]
    async fn test_clear_and_end_session() {
        let memory = ConversationMemory::new(5);
        let id = memory.create_session().await;
        memory.record_turn(id, "q", "a").await;

        memory.clear(id).await;
        assert!(memory.history(id, None).await.is_empty());
        assert!(memory.active_sessions().await.contains(&id));

        memory.end_session(id).await;
        assert!(memory.active_sessions().await.is_empty());
        assert!(!memory.session_stats(id).await.unwrap().is_active);
    }

    #[tokio::test]
    async fn test_cleanup_expired_sessions() {
        let memory = ConversationMemory::new(5);
        let stale = memory.create_session().await;

        let removed = memory
            .cleanup_idle_since(Utc::now() + Duration::seconds(1))
            .await;
        assert_eq!(removed, 1);
        assert!(memory.session_stats(stale).await.is_none());

        let fresh = memory.create_session().await;
        assert_eq!(memory.cleanup_expired(Duration::minutes(30)).await, 0);
        assert!(memory.session_stats(fresh).await.is_some());
    }
}
