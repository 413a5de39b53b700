//! Session records.

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::RwLock;
use serde_json::Value;
use tokio::time::Instant;

/// A single session: an immutable id, a last-access timestamp and a value bag.
///
/// The bag and the timestamp are each guarded by the record's own lock, so
/// reads and writes on one session never block the registry or other
/// sessions. A record handed out by the registry stays usable after it has
/// been removed or evicted; it is simply no longer reachable through the
/// registry.
#[derive(Debug)]
pub struct Session {
    id: String,
    created_at: Instant,
    last_access: RwLock<Instant>,
    values: RwLock<HashMap<String, Value>>,
}

impl Session {
    /// Create an empty session stamped with the current time.
    pub(crate) fn new(id: impl Into<String>) -> Self {
        let now = Instant::now();
        Self {
            id: id.into(),
            created_at: now,
            last_access: RwLock::new(now),
            values: RwLock::new(HashMap::new()),
        }
    }

    /// The session identifier.
    pub fn session_id(&self) -> &str {
        &self.id
    }

    /// When the session was last resolved through the registry.
    pub fn last_access(&self) -> Instant {
        *self.last_access.read()
    }

    /// When the session was created.
    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// Refresh the last-access timestamp to now.
    pub(crate) fn touch(&self) {
        *self.last_access.write() = Instant::now();
    }

    /// Whether the session has been idle strictly longer than `idle_timeout` at `now`.
    ///
    /// A session whose deadline equals `now` is still live.
    pub fn is_idle(&self, now: Instant, idle_timeout: Duration) -> bool {
        now.saturating_duration_since(self.last_access()) > idle_timeout
    }

    /// Insert or replace a value.
    pub fn set_value(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.write().insert(key.into(), value.into());
    }

    /// Read a value. Returns `None` when the key is absent.
    pub fn get_value(&self, key: &str) -> Option<Value> {
        self.values.read().get(key).cloned()
    }

    /// Remove a value. Does nothing when the key is absent.
    pub fn remove_key(&self, key: &str) {
        self.values.write().remove(key);
    }

    /// Whether the bag holds `value` under `key`.
    pub fn has_value(&self, key: &str, value: &Value) -> bool {
        self.values.read().get(key) == Some(value)
    }

    /// Keys currently present in the bag, in no particular order.
    pub fn keys(&self) -> Vec<String> {
        self.values.read().keys().cloned().collect()
    }

    /// Number of values in the bag.
    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    /// Whether the bag is empty.
    pub fn is_empty(&self) -> bool {
        self.values.read().is_empty()
    }

    /// Copy the current state of the session.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot_of(&self.values.read())
    }

    /// Copy the session only if its bag maps `key` to `value`.
    ///
    /// The check and the copy happen under one read of the bag, so the
    /// returned snapshot always holds `value` at `key`.
    pub fn snapshot_if(&self, key: &str, value: &Value) -> Option<SessionSnapshot> {
        let values = self.values.read();
        (values.get(key) == Some(value)).then(|| self.snapshot_of(&values))
    }

    fn snapshot_of(&self, values: &HashMap<String, Value>) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id.clone(),
            created_at: self.created_at,
            last_access: self.last_access(),
            values: values.clone(),
        }
    }
}

/// Point-in-time copy of a [`Session`].
///
/// Snapshots do not follow later mutation of the session they were taken from.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    /// Session identifier.
    pub id: String,

    /// When the session was created.
    pub created_at: Instant,

    /// Last access at the time of the snapshot.
    pub last_access: Instant,

    /// Copy of the value bag.
    pub values: HashMap<String, Value>,
}

impl SessionSnapshot {
    /// The session identifier.
    pub fn session_id(&self) -> &str {
        &self.id
    }

    /// Read a copied value.
    pub fn get_value(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }
}
