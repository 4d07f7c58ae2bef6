use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::error::{MaintenanceError, MaintenanceResult};
use crate::cache::{HybridCache, SweepReport};
use crate::storage::PersistentStore;

/// Runs [`HybridCache::sweep_expired`] on a fixed interval until shut down.
///
/// A failed sweep is logged and the loop keeps going.
pub struct MaintenanceScheduler<S: PersistentStore> {
    cache: Arc<HybridCache<S>>,
    interval: Duration,
    shutdown_initiated: Arc<AtomicBool>,
    running: Arc<AtomicBool>,
    wake: Arc<Notify>,
    last_report: Arc<Mutex<Option<SweepReport>>>,
    total_removed: Arc<AtomicU64>,
    sweeps: Arc<AtomicU64>,
}

impl<S: PersistentStore> std::fmt::Debug for MaintenanceScheduler<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MaintenanceScheduler")
            .field("interval", &self.interval)
            .field("running", &self.is_running())
            .field("sweeps", &self.sweeps())
            .finish()
    }
}

impl<S: PersistentStore> MaintenanceScheduler<S> {
    /// Creates a scheduler sweeping every `interval`.
    pub fn new(cache: Arc<HybridCache<S>>, interval: Duration) -> MaintenanceResult<Self> {
        if interval.is_zero() {
            return Err(MaintenanceError::ZeroInterval);
        }
        Ok(Self {
            cache,
            interval,
            shutdown_initiated: Arc::new(AtomicBool::new(false)),
            running: Arc::new(AtomicBool::new(false)),
            wake: Arc::new(Notify::new()),
            last_report: Arc::new(Mutex::new(None)),
            total_removed: Arc::new(AtomicU64::new(0)),
            sweeps: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Creates a scheduler using the cache's configured cleanup interval.
    pub fn from_cache(cache: Arc<HybridCache<S>>) -> MaintenanceResult<Self> {
        let interval = cache.config().cleanup_interval;
        Self::new(cache, interval)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn is_shutdown_initiated(&self) -> bool {
        self.shutdown_initiated.load(Ordering::Acquire)
    }

    /// Report of the most recent sweep, periodic or manual.
    pub fn last_report(&self) -> Option<SweepReport> {
        self.last_report.lock().clone()
    }

    /// Persistent entries removed across all sweeps.
    pub fn total_removed(&self) -> u64 {
        self.total_removed.load(Ordering::Relaxed)
    }

    pub fn sweeps(&self) -> u64 {
        self.sweeps.load(Ordering::Relaxed)
    }

    /// Runs one sweep now.
    pub async fn run_once(&self) -> SweepReport {
        sweep(
            &self.cache,
            &self.last_report,
            &self.total_removed,
            &self.sweeps,
        )
        .await
    }

    /// Starts the sweep loop (no-op if already running or shut down).
    ///
    /// The first sweep happens one interval after the call.
    pub fn start(&self) -> JoinHandle<()> {
        if self.is_shutdown_initiated() || self.running.swap(true, Ordering::AcqRel) {
            return tokio::spawn(async {});
        }

        let cache = Arc::clone(&self.cache);
        let period = self.interval;
        let shutdown_initiated = Arc::clone(&self.shutdown_initiated);
        let running = Arc::clone(&self.running);
        let wake = Arc::clone(&self.wake);
        let last_report = Arc::clone(&self.last_report);
        let total_removed = Arc::clone(&self.total_removed);
        let sweeps = Arc::clone(&self.sweeps);

        info!(interval_secs = period.as_secs(), "Maintenance scheduler started");

        tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = wake.notified() => {}
                }
                if shutdown_initiated.load(Ordering::Acquire) {
                    break;
                }
                sweep(&cache, &last_report, &total_removed, &sweeps).await;
            }

            running.store(false, Ordering::Release);
            debug!("Maintenance scheduler stopped");
        })
    }

    /// Stops the loop (idempotent). A sweep already in progress completes first.
    pub fn shutdown(&self) {
        if self.shutdown_initiated.swap(true, Ordering::AcqRel) {
            return;
        }
        self.wake.notify_one();
        info!("Maintenance scheduler shutting down");
    }

    /// Stops the loop and waits for the task behind `handle` to exit.
    pub async fn shutdown_and_wait(&self, handle: JoinHandle<()>) -> MaintenanceResult<()> {
        self.shutdown();
        handle.await?;
        Ok(())
    }
}

async fn sweep<S: PersistentStore>(
    cache: &HybridCache<S>,
    last_report: &Mutex<Option<SweepReport>>,
    total_removed: &AtomicU64,
    sweeps: &AtomicU64,
) -> SweepReport {
    let report = cache.sweep_expired().await;

    total_removed.fetch_add(report.persistent_removed as u64, Ordering::Relaxed);
    sweeps.fetch_add(1, Ordering::Relaxed);

    match &report.error {
        None => info!(
            removed = report.persistent_removed,
            memory_purged = report.memory_purged,
            "Expired entries swept"
        ),
        Some(error) => warn!(
            error = %error,
            memory_purged = report.memory_purged,
            "Expiry sweep incomplete"
        ),
    }

    *last_report.lock() = Some(report.clone());
    report
}
