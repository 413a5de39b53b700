//! Configuration for the session store.

use std::time::Duration;

/// Default interval between eviction sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Default idle timeout (30 minutes without access).
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Configuration for an [`InMemoryProvider`](crate::InMemoryProvider).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// How often the evictor scans the registry.
    pub sweep_interval: Duration,

    /// Sessions not accessed within this duration are evicted on the next sweep.
    pub idle_timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
        }
    }
}

impl StoreConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the sweep interval.
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Set the idle timeout.
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }
}
