//! In-memory session registry.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::config::StoreConfig;
use crate::error::{Error, Result};
use crate::evictor::{Evictor, EvictorHandle};
use crate::provider::SessionProvider;
use crate::session::{Session, SessionSnapshot};

/// Registry of live sessions held in process memory.
///
/// Set membership is guarded by a single `RwLock`: inserts, removals and
/// sweeps take it exclusively, lookups and scans take it shared. Each
/// [`Session`] guards its own bag and timestamp, so value access never
/// contends on the registry lock.
///
/// Cloning is cheap and yields a handle to the same registry.
#[derive(Clone, Default)]
pub struct InMemoryProvider {
    sessions: Arc<RwLock<HashMap<String, Arc<Session>>>>,
    config: StoreConfig,
}

impl InMemoryProvider {
    /// Create an empty registry with default configuration.
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    /// Create an empty registry with the given configuration.
    pub fn with_config(config: StoreConfig) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            config,
        }
    }

    /// Get the store configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Start the background sweep using the configured interval and idle timeout.
    pub fn start_cleanup(&self) -> EvictorHandle {
        self.clean(self.config.sweep_interval, self.config.idle_timeout)
    }

    /// Ids of all live sessions, in no particular order.
    pub fn session_ids(&self) -> Vec<String> {
        self.sessions.read().keys().cloned().collect()
    }
}

impl SessionProvider for InMemoryProvider {
    fn create(&self, session_id: &str) -> Arc<Session> {
        let session = Arc::new(Session::new(session_id));

        let mut sessions = self.sessions.write();
        if sessions
            .insert(session_id.to_string(), Arc::clone(&session))
            .is_some()
        {
            debug!(session_id = %session_id, "Replaced existing session with colliding id");
        }

        trace!(session_id = %session_id, live = sessions.len(), "Session created");
        session
    }

    fn get(&self, session_id: &str) -> Result<Arc<Session>> {
        let sessions = self.sessions.read();
        match sessions.get(session_id) {
            Some(session) => {
                session.touch();
                trace!(session_id = %session_id, "Session resolved");
                Ok(Arc::clone(session))
            }
            None => Err(Error::NotFound(session_id.to_string())),
        }
    }

    fn find_sessions_by_value(&self, key: &str, value: &Value) -> Vec<SessionSnapshot> {
        let sessions = self.sessions.read();
        sessions
            .values()
            .filter_map(|session| session.snapshot_if(key, value))
            .collect()
    }

    fn remove(&self, session_id: &str) {
        if self.sessions.write().remove(session_id).is_some() {
            trace!(session_id = %session_id, "Session removed");
        }
    }

    fn evict_idle(&self, idle_timeout: Duration) -> usize {
        let now = Instant::now();
        let mut sessions = self.sessions.write();
        let before = sessions.len();

        sessions.retain(|session_id, session| {
            let idle = session.is_idle(now, idle_timeout);
            if idle {
                trace!(session_id = %session_id, "Evicting idle session");
            }
            !idle
        });

        let count = before - sessions.len();
        if count > 0 {
            debug!(count = count, live = sessions.len(), "Evicted idle sessions");
        }
        count
    }

    fn clean(&self, interval: Duration, idle_timeout: Duration) -> EvictorHandle {
        Evictor::spawn(Arc::new(self.clone()), interval, idle_timeout)
    }

    fn len(&self) -> usize {
        self.sessions.read().len()
    }

    fn contains(&self, session_id: &str) -> bool {
        self.sessions.read().contains_key(session_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_create_and_get() {
        let provider = InMemoryProvider::new();
        provider.create("session-1");

        let session = provider.get("session-1").unwrap();
        assert_eq!(session.session_id(), "session-1");
        assert!(session.is_empty());
    }

    #[test]
    fn test_not_found() {
        let provider = InMemoryProvider::new();
        let result = provider.get("nonexistent");
        assert_eq!(result.unwrap_err(), Error::NotFound("nonexistent".to_string()));
    }

    #[test]
    fn test_create_overwrites_colliding_id() {
        let provider = InMemoryProvider::new();
        let first = provider.create("session-1");
        first.set_value("userid", 8);

        provider.create("session-1");

        assert_eq!(provider.len(), 1);
        let current = provider.get("session-1").unwrap();
        assert_eq!(current.get_value("userid"), None);
    }

    #[test]
    fn test_values_visible_through_get() {
        let provider = InMemoryProvider::new();
        let created = provider.create("session-1");
        created.set_value("userid", 8);

        let fetched = provider.get("session-1").unwrap();
        assert_eq!(fetched.get_value("userid"), Some(json!(8)));
    }

    #[test]
    fn test_remove_is_idempotent() {
        let provider = InMemoryProvider::new();
        provider.create("session-1");
        provider.create("session-2");

        provider.remove("session-1");
        provider.remove("session-1");

        assert_eq!(provider.len(), 1);
        assert!(!provider.contains("session-1"));
        assert!(provider.contains("session-2"));
    }

    #[test]
    fn test_removed_handle_stays_usable() {
        let provider = InMemoryProvider::new();
        let session = provider.create("session-1");
        provider.remove("session-1");

        session.set_value("k", "v");
        assert_eq!(session.get_value("k"), Some(json!("v")));
        assert!(provider.get("session-1").is_err());
    }

    #[test]
    fn test_find_sessions_by_value() {
        let provider = InMemoryProvider::new();
        provider.create("a").set_value("userid", 8);
        provider.create("b").set_value("userid", 8);
        provider.create("c").set_value("userid", 7);
        provider.create("d");

        let mut ids: Vec<String> = provider
            .find_sessions_by_value("userid", &json!(8))
            .into_iter()
            .map(|s| s.id)
            .collect();
        ids.sort();
        assert_eq!(ids, vec!["a", "b"]);

        assert!(provider.find_sessions_by_value("missing", &json!(8)).is_empty());
    }

    #[test]
    fn test_find_returns_snapshots() {
        let provider = InMemoryProvider::new();
        let session = provider.create("a");
        session.set_value("userid", 8);

        let found = provider.find_sessions_by_value("userid", &json!(8));
        session.set_value("userid", 9);

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].get_value("userid"), Some(&json!(8)));
    }

    #[test]
    fn test_find_snapshots_match_under_concurrent_writes() {
        use std::sync::atomic::{AtomicBool, Ordering};

        let provider = InMemoryProvider::new();
        let session = provider.create("flipping");
        session.set_value("userid", 8);

        let done = Arc::new(AtomicBool::new(false));
        let writers: Vec<_> = (0..3)
            .map(|_| {
                let session = Arc::clone(&session);
                let done = Arc::clone(&done);
                std::thread::spawn(move || {
                    while !done.load(Ordering::Relaxed) {
                        session.set_value("userid", 9);
                        session.set_value("userid", 8);
                    }
                })
            })
            .collect();

        for _ in 0..20_000 {
            for snapshot in provider.find_sessions_by_value("userid", &json!(8)) {
                assert_eq!(snapshot.get_value("userid"), Some(&json!(8)));
            }
        }

        done.store(true, Ordering::Relaxed);
        for writer in writers {
            writer.join().unwrap();
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_refreshes_last_access() {
        let provider = InMemoryProvider::new();
        let created = provider.create("session-1").last_access();

        tokio::time::advance(Duration::from_secs(10)).await;
        let session = provider.get("session-1").unwrap();

        assert_eq!(session.last_access(), created + Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_evict_idle() {
        let provider = InMemoryProvider::new();
        provider.create("stale");
        provider.create("fresh");

        tokio::time::advance(Duration::from_secs(3)).await;
        provider.get("fresh").unwrap();

        let evicted = provider.evict_idle(Duration::from_secs(2));
        assert_eq!(evicted, 1);
        assert!(!provider.contains("stale"));
        assert!(provider.contains("fresh"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_evict_idle_keeps_session_at_deadline() {
        let provider = InMemoryProvider::new();
        provider.create("session-1");

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(provider.evict_idle(Duration::from_secs(2)), 0);

        tokio::time::advance(Duration::from_millis(1)).await;
        assert_eq!(provider.evict_idle(Duration::from_secs(2)), 1);
    }

    #[test]
    fn test_evict_idle_on_empty_registry() {
        let provider = InMemoryProvider::new();
        assert_eq!(provider.evict_idle(Duration::ZERO), 0);
    }

    #[test]
    fn test_clones_share_registry() {
        let provider = InMemoryProvider::new();
        let other = provider.clone();
        provider.create("session-1");

        assert!(other.contains("session-1"));
        assert_eq!(other.session_ids(), vec!["session-1".to_string()]);
    }
}
