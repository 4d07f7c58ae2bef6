//! Scheduler sweeps against the on-disk store.

mod common;

use std::sync::Arc;
use std::time::Duration;

use metacache::{DataType, MaintenanceScheduler, PersistentStore};

use common::DiskHarness;

#[tokio::test]
async fn test_scheduled_sweep_cleans_disk() {
    let h = DiskHarness::new();
    h.load("u1", DataType::Playlist, "p1").await;
    h.load("u1", DataType::Playlist, "p2").await;
    h.load("u1", DataType::AudioFeatures, "t1").await;

    let key_path = h
        .cache
        .store()
        .entry_path(&metacache::CacheKey::new("u1", DataType::Playlist, "p1"));
    assert!(key_path.exists());

    h.clock.advance(Duration::from_secs(2 * 3_600));

    let scheduler =
        MaintenanceScheduler::new(Arc::clone(&h.cache), Duration::from_millis(10)).expect("scheduler");
    let handle = scheduler.start();

    tokio::time::timeout(Duration::from_secs(5), async {
        while scheduler.total_removed() < 2 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("sweep did not run");

    scheduler
        .shutdown_and_wait(handle)
        .await
        .expect("clean shutdown");

    assert!(!key_path.exists());
    assert_eq!(h.cache.store().len(), 1);
    assert_eq!(h.cache.memory().len(), 1);

    let report = scheduler.last_report().expect("report");
    assert!(report.is_ok());
}

#[tokio::test]
async fn test_startup_sweep_after_reopen() {
    let h = DiskHarness::new();
    h.load("u1", DataType::Playlist, "p1").await;
    h.clock.advance(Duration::from_secs(3_600));

    let restarted = Arc::new(h.reopen());
    let scheduler = MaintenanceScheduler::from_cache(Arc::clone(&restarted)).expect("scheduler");

    let report = scheduler.run_once().await;
    assert_eq!(report.persistent_removed, 1);
    assert!(restarted.store().is_empty());
}
