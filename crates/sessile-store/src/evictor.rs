//! Background sweep that evicts idle sessions.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::provider::SessionProvider;

/// Shortest interval the sweep will run at.
const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(1);

/// Counters shared between the sweep task and its handle.
#[derive(Debug, Default)]
struct SweepStats {
    sweeps: AtomicU64,
    evicted: AtomicU64,
}

impl SweepStats {
    fn record(&self, evicted: usize) {
        self.sweeps.fetch_add(1, Ordering::Relaxed);
        self.evicted.fetch_add(evicted as u64, Ordering::Relaxed);
    }
}

/// Periodic eviction of idle sessions.
///
/// The first sweep runs one `interval` after start. Ticks missed while the
/// runtime was busy are delayed rather than replayed in a burst.
pub struct Evictor;

impl Evictor {
    /// Spawn the sweep on the current Tokio runtime.
    ///
    /// Outside a runtime no task is started: a warning is logged and the
    /// returned handle is inert, though [`EvictorHandle::sweep_now`] still
    /// works.
    pub fn spawn(
        provider: Arc<dyn SessionProvider>,
        interval: Duration,
        idle_timeout: Duration,
    ) -> EvictorHandle {
        let interval = if interval < MIN_SWEEP_INTERVAL {
            warn!(?interval, "Sweep interval too short, clamping");
            MIN_SWEEP_INTERVAL
        } else {
            interval
        };

        let cancel = CancellationToken::new();
        let stats = Arc::new(SweepStats::default());

        let task = match Handle::try_current() {
            Ok(runtime) => {
                let task = runtime.spawn(run_sweeps(
                    Arc::clone(&provider),
                    interval,
                    idle_timeout,
                    cancel.clone(),
                    Arc::clone(&stats),
                ));
                info!(?interval, ?idle_timeout, "Session evictor started");
                Some(task)
            }
            Err(e) => {
                warn!(error = %e, "No Tokio runtime, idle sessions will not be swept");
                None
            }
        };

        EvictorHandle {
            provider,
            idle_timeout,
            cancel,
            stats,
            task,
        }
    }
}

async fn run_sweeps(
    provider: Arc<dyn SessionProvider>,
    interval: Duration,
    idle_timeout: Duration,
    cancel: CancellationToken,
    stats: Arc<SweepStats>,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let evicted = provider.evict_idle(idle_timeout);
                stats.record(evicted);
                debug!(evicted, live = provider.len(), "Eviction sweep complete");
            }
        }
    }

    info!(
        sweeps = stats.sweeps.load(Ordering::Relaxed),
        evicted = stats.evicted.load(Ordering::Relaxed),
        "Session evictor stopped"
    );
}

/// Handle to a running [`Evictor`].
///
/// Dropping the handle leaves the sweep running; call [`stop`](Self::stop)
/// to halt it.
pub struct EvictorHandle {
    provider: Arc<dyn SessionProvider>,
    idle_timeout: Duration,
    cancel: CancellationToken,
    stats: Arc<SweepStats>,
    task: Option<JoinHandle<()>>,
}

impl EvictorHandle {
    /// Halt future sweeps. A sweep already in progress runs to completion.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Whether the sweep task is still alive.
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Run a sweep immediately, outside the timer schedule.
    pub fn sweep_now(&self) -> usize {
        let evicted = self.provider.evict_idle(self.idle_timeout);
        self.stats.record(evicted);
        evicted
    }

    /// Number of sweeps completed so far.
    pub fn sweeps(&self) -> u64 {
        self.stats.sweeps.load(Ordering::Relaxed)
    }

    /// Total sessions evicted so far.
    pub fn evicted(&self) -> u64 {
        self.stats.evicted.load(Ordering::Relaxed)
    }

    /// The idle timeout this evictor applies.
    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    /// Stop the sweep and wait for the task to exit.
    pub async fn shutdown(self) {
        self.stop();
        let Some(task) = self.task else {
            return;
        };
        if let Err(e) = task.await {
            warn!(error = %e, "Session evictor task failed");
        }
    }
}

impl std::fmt::Debug for EvictorHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvictorHandle")
            .field("idle_timeout", &self.idle_timeout)
            .field("running", &self.is_running())
            .field("sweeps", &self.sweeps())
            .field("evicted", &self.evicted())
            .finish()
    }
}
