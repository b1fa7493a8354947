//! Process-wide session map: session id -> hypergraph

use super::graph::HyperGraph;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

pub type SharedGraph = Arc<Mutex<HyperGraph>>;

/// Concurrent get-or-create over per-session graphs
///
/// The map shard lock is held only while looking up the entry; callers then serialize
/// on the graph's own mutex. Never hold a graph lock across an LLM call.
pub struct SessionStore {
    sessions: DashMap<String, SharedGraph>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    /// Graph for `session_id`, created on first reference
    pub fn get_or_create(&self, session_id: &str) -> SharedGraph {
        self.sessions
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(HyperGraph::new(session_id))))
            .clone()
    }

    pub fn get(&self, session_id: &str) -> Option<SharedGraph> {
        self.sessions.get(session_id).map(|r| r.clone())
    }

    /// Drop a session's graph; true if it existed
    pub fn remove(&self, session_id: &str) -> bool {
        self.sessions.remove(session_id).is_some()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_or_create_is_shared() {
        let store = SessionStore::new();
        let a = store.get_or_create("s1");
        let b = store.get_or_create("s1");
        assert!(Arc::ptr_eq(&a, &b));

        a.lock().await.increment_step();
        assert_eq!(b.lock().await.interaction_step(), 1);
        assert_eq!(store.session_count(), 1);
    }

    #[tokio::test]
    async fn test_remove() {
        let store = SessionStore::new();
        store.get_or_create("s1");
        assert!(store.remove("s1"));
        assert!(!store.remove("s1"));
        assert!(store.get("s1").is_none());
    }

    #[tokio::test]
    async fn test_concurrent_get_or_create() {
        let store = Arc::new(SessionStore::new());
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move {
                    let graph = store.get_or_create("shared");
                    graph.lock().await.increment_step();
                })
            })
            .collect();
        for h in handles {
            h.await.unwrap();
        }

        assert_eq!(store.session_count(), 1);
        let graph = store.get("shared").unwrap();
        assert_eq!(graph.lock().await.interaction_step(), 16);
    }
}
