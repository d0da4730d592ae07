//! Per-session rolling conversation window

use dashmap::DashMap;
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tracing::debug;

use super::models::{Role, SessionId, Turn};

struct SessionEntry {
    turns: VecDeque<Turn>,
    last_seen: Instant,
}

impl SessionEntry {
    fn new() -> Self {
        Self {
            turns: VecDeque::new(),
            last_seen: Instant::now(),
        }
    }
}

/// Conversation history keyed by session
///
/// Each session keeps at most `max_turns` turns; older turns fall off the
/// front and a window never starts with an assistant turn. Mutations for one session happen under its map shard lock, so
/// concurrent turns on the same session never interleave a partial append.
pub struct HistoryStore {
    sessions: DashMap<SessionId, SessionEntry>,
    max_turns: usize,
    idle_timeout: Duration,
}

impl HistoryStore {
    pub fn new(max_turns: usize, idle_timeout: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            max_turns: max_turns.max(1),
            idle_timeout,
        }
    }

    pub fn max_turns(&self) -> usize {
        self.max_turns
    }

    /// Copy of a session's turns, oldest first
    pub fn snapshot(&self, session: &SessionId) -> Vec<Turn> {
        self.sessions
            .get(session)
            .map(|entry| entry.turns.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Append turns in order, then truncate to the newest `max_turns`
    pub fn append(&self, session: &SessionId, turns: impl IntoIterator<Item = Turn>) {
        let mut entry = self
            .sessions
            .entry(session.clone())
            .or_insert_with(SessionEntry::new);

        entry.turns.extend(turns);
        let mut dropped = entry.turns.len().saturating_sub(self.max_turns);
        if dropped > 0 {
            entry.turns.drain(..dropped);
            // Truncation may have split a user/assistant pair
            while entry.turns.front().is_some_and(|t| t.role == Role::Assistant) {
                entry.turns.pop_front();
                dropped += 1;
            }
        }
        entry.last_seen = Instant::now();

        debug!(
            "Session {} history now {} turns (dropped {})",
            session,
            entry.turns.len(),
            dropped
        );
    }

    /// Forget a session; returns the number of turns removed
    pub fn clear(&self, session: &SessionId) -> usize {
        self.sessions
            .remove(session)
            .map(|(_, entry)| entry.turns.len())
            .unwrap_or(0)
    }

    pub fn len(&self, session: &SessionId) -> usize {
        self.sessions.get(session).map_or(0, |e| e.turns.len())
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Drop sessions idle for longer than the configured timeout
    pub fn purge_idle(&self) -> usize {
        let before = self.sessions.len();
        let timeout = self.idle_timeout;
        self.sessions
            .retain(|_, entry| entry.last_seen.elapsed() < timeout);
        let purged = before.saturating_sub(self.sessions.len());
        if purged > 0 {
            debug!("Purged {} idle sessions", purged);
        }
        purged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn store() -> HistoryStore {
        HistoryStore::new(10, Duration::from_secs(3600))
    }

    #[test]
    fn test_append_and_snapshot() {
        let history = store();
        let session = SessionId::generate();
        history.append(&session, [Turn::user("hello"), Turn::assistant("hi")]);

        let turns = history.snapshot(&session);
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role, Role::User);
        assert_eq!(turns[1].text, "hi");
    }

    #[test]
    fn test_never_exceeds_capacity() {
        let history = store();
        let session = SessionId::generate();
        for i in 0..25 {
            history.append(
                &session,
                [Turn::user(format!("q{}", i)), Turn::assistant(format!("a{}", i))],
            );
            assert!(history.len(&session) <= 10);
        }

        let turns = history.snapshot(&session);
        assert_eq!(turns.len(), 10);
        assert_eq!(turns.first().unwrap().text, "q20");
        assert_eq!(turns.last().unwrap().text, "a24");
    }

    #[test]
    fn test_odd_capacity_keeps_whole_pairs() {
        let history = HistoryStore::new(9, Duration::from_secs(3600));
        let session = SessionId::generate();
        for i in 0..6 {
            history.append(
                &session,
                [Turn::user(format!("q{}", i)), Turn::assistant(format!("a{}", i))],
            );
            let turns = history.snapshot(&session);
            assert!(turns.len() <= 9);
            assert_eq!(turns[0].role, Role::User);
        }

        let turns = history.snapshot(&session);
        assert_eq!(turns.len(), 8);
        assert_eq!(turns[0].text, "q2");
        assert_eq!(turns.last().unwrap().text, "a5");
    }

    #[test]
    fn test_sessions_are_isolated() {
        let history = store();
        let a = SessionId::parse("farm-a").unwrap();
        let b = SessionId::parse("farm-b").unwrap();
        history.append(&a, [Turn::user("only a")]);

        assert_eq!(history.len(&a), 1);
        assert!(history.snapshot(&b).is_empty());

        assert_eq!(history.clear(&b), 0);
        assert_eq!(history.len(&a), 1);
    }

    #[test]
    fn test_clear_removes_session() {
        let history = store();
        let session = SessionId::generate();
        history.append(&session, [Turn::user("x"), Turn::assistant("y")]);

        assert_eq!(history.clear(&session), 2);
        assert!(history.snapshot(&session).is_empty());
        assert_eq!(history.session_count(), 0);
    }

    #[test]
    fn test_purge_idle() {
        let history = HistoryStore::new(10, Duration::from_millis(50));
        let session = SessionId::generate();
        history.append(&session, [Turn::user("x")]);

        assert_eq!(history.purge_idle(), 0);
        std::thread::sleep(Duration::from_millis(80));
        assert_eq!(history.purge_idle(), 1);
        assert_eq!(history.session_count(), 0);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let history = HistoryStore::new(0, Duration::from_secs(1));
        let session = SessionId::generate();
        history.append(&session, [Turn::user("a"), Turn::user("b")]);
        assert_eq!(history.snapshot(&session)[0].text, "b");
    }

    #[tokio::test]
    async fn test_concurrent_appends_respect_capacity() {
        let history = Arc::new(store());
        let session = SessionId::parse("shared").unwrap();

        let mut handles = Vec::new();
        for i in 0..32 {
            let history = history.clone();
            let session = session.clone();
            handles.push(tokio::spawn(async move {
                history.append(
                    &session,
                    [Turn::user(format!("q{}", i)), Turn::assistant(format!("a{}", i))],
                );
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let turns = history.snapshot(&session);
        assert_eq!(turns.len(), 10);
        // Pairs are appended atomically, so user/assistant alternate
        for pair in turns.chunks(2) {
            assert_eq!(pair[0].role, Role::User);
            assert_eq!(pair[1].role, Role::Assistant);
            assert_eq!(pair[0].text[1..], pair[1].text[1..]);
        }
    }
}
