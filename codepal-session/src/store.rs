use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use codepal_core::{Content, Result};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::memory::{ChatMemory, DEFAULT_MAX_MESSAGES};

/// Memory id used when a caller does not supply one.
pub const DEFAULT_MEMORY_ID: &str = "default";

/// Exclusive access to one session's memory. Lock it for the whole turn.
pub type SessionHandle = Arc<Mutex<ChatMemory>>;

/// Shortest interval between two idle sweeps.
pub const MIN_SWEEP_PERIOD: Duration = Duration::from_secs(1);

/// In-process chat memories, one per memory id, created on first use.
///
/// Sessions live until [`remove`](Self::remove)d or dropped by
/// [`evict_idle`](Self::evict_idle).
#[derive(Debug)]
pub struct ChatMemoryStore {
    max_messages: usize,
    sessions: RwLock<HashMap<String, SessionHandle>>,
}

impl Default for ChatMemoryStore {
    fn default() -> Self {
        Self { max_messages: DEFAULT_MAX_MESSAGES, sessions: RwLock::new(HashMap::new()) }
    }
}

impl ChatMemoryStore {
    /// Create a store whose sessions keep at most `max_messages` messages.
    ///
    /// # Errors
    ///
    /// Returns [`codepal_core::CoreError::Session`] if `max_messages` is zero.
    pub fn new(max_messages: usize) -> Result<Self> {
        ChatMemory::new(max_messages)?;
        Ok(Self { max_messages, sessions: RwLock::new(HashMap::new()) })
    }

    pub fn max_messages(&self) -> usize {
        self.max_messages
    }

    /// The handle for `memory_id`, creating an empty memory if needed.
    pub async fn session(&self, memory_id: &str) -> SessionHandle {
        if let Some(handle) = self.sessions.read().await.get(memory_id) {
            return handle.clone();
        }
        let mut sessions = self.sessions.write().await;
        sessions
            .entry(memory_id.to_string())
            .or_insert_with(|| {
                debug!(memory_id, max_messages = self.max_messages, "created chat memory");
                let memory = ChatMemory::new(self.max_messages).unwrap_or_default();
                Arc::new(Mutex::new(memory))
            })
            .clone()
    }

    /// A copy of the messages stored for `memory_id`, oldest first.
    ///
    /// Waits for any in-flight turn on that session to finish.
    pub async fn messages(&self, memory_id: &str) -> Vec<Content> {
        let handle = self.sessions.read().await.get(memory_id).cloned();
        match handle {
            Some(handle) => handle.lock().await.messages(),
            None => Vec::new(),
        }
    }

    /// Forget a session. Returns whether it existed.
    pub async fn remove(&self, memory_id: &str) -> bool {
        self.sessions.write().await.remove(memory_id).is_some()
    }

    /// Forget sessions whose memory has not changed for longer than
    /// `max_idle`. Sessions whose handle is held elsewhere are kept.
    ///
    /// Returns how many sessions were dropped.
    pub async fn evict_idle(&self, max_idle: Duration) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|memory_id, handle| {
            if Arc::strong_count(handle) > 1 {
                return true;
            }
            match handle.try_lock() {
                Ok(memory) if memory.idle_for() > max_idle => {
                    debug!(memory_id, idle_secs = memory.idle_for().as_secs(), "evicted idle chat memory");
                    false
                }
                _ => true,
            }
        });
        before - sessions.len()
    }

    /// Ids of all sessions created so far, sorted.
    pub async fn memory_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sessions.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }
}

/// Run [`ChatMemoryStore::evict_idle`] periodically until the store is
/// dropped.
pub fn spawn_idle_sweeper(store: &Arc<ChatMemoryStore>, max_idle: Duration) -> JoinHandle<()> {
    let store = Arc::downgrade(store);
    let period = (max_idle / 2).max(MIN_SWEEP_PERIOD);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let Some(store) = store.upgrade() else {
                debug!("chat memory store dropped, sweeper stopping");
                break;
            };
            let evicted = store.evict_idle(max_idle).await;
            if evicted > 0 {
                debug!(evicted, "swept idle chat memories");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn same_id_shares_memory() {
        let store = ChatMemoryStore::default();
        store.session("a").await.lock().await.add(Content::user("one"));
        store.session("a").await.lock().await.add(Content::user("two"));
        assert_eq!(store.messages("a").await.len(), 2);
        assert!(store.messages("b").await.is_empty());
    }

    #[tokio::test]
    async fn sessions_are_isolated() {
        let store = ChatMemoryStore::new(4).unwrap();
        store.session("a").await.lock().await.add(Content::user("for a"));
        store.session("b").await.lock().await.add(Content::user("for b"));
        assert_eq!(store.messages("a").await[0].text(), "for a");
        assert_eq!(store.messages("b").await[0].text(), "for b");
        assert_eq!(store.memory_ids().await, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn locked_session_does_not_block_others() {
        let store = Arc::new(ChatMemoryStore::default());
        let a = store.session("a").await;
        let _guard = a.lock().await;

        let b = store.session("b").await;
        let locked = tokio::time::timeout(Duration::from_millis(100), b.lock()).await;
        assert!(locked.is_ok());

        let a_again = store.session("a").await;
        assert!(a_again.try_lock().is_err());
    }

    #[tokio::test]
    async fn remove_forgets_session() {
        let store = ChatMemoryStore::default();
        store.session("x").await.lock().await.add(Content::user("hi"));
        assert!(store.remove("x").await);
        assert!(!store.remove("x").await);
        assert!(store.messages("x").await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn idle_sessions_are_evicted_unless_held() {
        let store = ChatMemoryStore::default();
        store.session("old").await.lock().await.add(Content::user("hi"));
        let busy = store.session("busy").await;

        tokio::time::advance(Duration::from_secs(60)).await;
        store.session("fresh").await.lock().await.add(Content::user("hi"));

        assert_eq!(store.evict_idle(Duration::from_secs(30)).await, 1);
        assert_eq!(store.memory_ids().await, vec!["busy", "fresh"]);

        drop(busy);
        assert_eq!(store.evict_idle(Duration::from_secs(30)).await, 1);
        assert_eq!(store.memory_ids().await, vec!["fresh"]);
    }

    #[tokio::test(start_paused = true)]
    async fn sweeper_evicts_and_stops_with_the_store() {
        let store = Arc::new(ChatMemoryStore::default());
        store.session("a").await.lock().await.add(Content::user("hi"));
        let sweeper = spawn_idle_sweeper(&store, Duration::from_secs(10));

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(store.memory_ids().await.is_empty());

        drop(store);
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(sweeper.is_finished());
    }

    #[test]
    fn zero_window_rejected() {
        assert!(ChatMemoryStore::new(0).is_err());
    }
}
