//! Storage backend contract for session registries.
//!
//! The [`SessionProvider`] trait decouples callers from a specific backing
//! store. [`InMemoryProvider`](crate::InMemoryProvider) is the in-process
//! implementation; other backends only need to honor the same contract.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::error::Result;
use crate::evictor::EvictorHandle;
use crate::session::{Session, SessionSnapshot};

/// Contract for storing and resolving sessions.
///
/// Identifiers are accepted as given. Generating unpredictable ids (see
/// [`generate_session_id`](crate::generate_session_id)) is the caller's job.
pub trait SessionProvider: Send + Sync {
    /// Create an empty session under `session_id`.
    ///
    /// An existing session with the same id is replaced.
    fn create(&self, session_id: &str) -> Arc<Session>;

    /// Resolve a session and refresh its last-access time.
    ///
    /// Fails with [`Error::NotFound`](crate::Error::NotFound) when the id was
    /// never created, has been removed, or has been evicted.
    fn get(&self, session_id: &str) -> Result<Arc<Session>>;

    /// Snapshots of every live session whose bag maps `key` to `value`.
    ///
    /// Order is unspecified.
    fn find_sessions_by_value(&self, key: &str, value: &Value) -> Vec<SessionSnapshot>;

    /// Remove a session. Removing an unknown id is a no-op.
    fn remove(&self, session_id: &str);

    /// Run a single eviction pass, dropping every session idle strictly
    /// longer than `idle_timeout`. Returns how many were removed.
    fn evict_idle(&self, idle_timeout: Duration) -> usize;

    /// Start a background sweep that calls [`evict_idle`](Self::evict_idle)
    /// every `interval`.
    ///
    /// Returns immediately. The sweep keeps running until the returned
    /// handle is stopped. Outside a Tokio runtime the handle is inert and
    /// only [`EvictorHandle::sweep_now`] evicts.
    fn clean(&self, interval: Duration, idle_timeout: Duration) -> EvictorHandle;

    /// Number of live sessions.
    fn len(&self) -> usize;

    /// Whether no sessions are live.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a session exists, without refreshing its last-access time.
    fn contains(&self, session_id: &str) -> bool;
}
