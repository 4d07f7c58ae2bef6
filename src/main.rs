//! Metacache maintenance host: sweeps expired entries on a schedule.

use std::sync::Arc;

use mimalloc::MiMalloc;
use tokio::signal;

use metacache::{CacheConfig, DiskStore, HybridCache, MaintenanceScheduler};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = CacheConfig::from_env()?;

    tracing::info!(
        storage_path = %config.storage_path.display(),
        memory_capacity = config.memory_capacity,
        cleanup_interval_secs = config.cleanup_interval.as_secs(),
        enabled = config.enabled,
        "Metacache maintenance starting"
    );

    let store = DiskStore::open(&config.storage_path)?;
    let recovery = store.recovery_report();
    tracing::info!(
        loaded = recovery.loaded,
        dropped_corrupt = recovery.dropped_corrupt,
        dropped_temp = recovery.dropped_temp,
        "Persistent store opened"
    );

    let cache = Arc::new(HybridCache::new(config, Arc::new(store)));
    let scheduler = MaintenanceScheduler::from_cache(Arc::clone(&cache))?;

    let report = scheduler.run_once().await;
    tracing::info!(
        removed = report.persistent_removed,
        ok = report.is_ok(),
        "Startup sweep complete"
    );

    let stats = cache.stats().await;
    match serde_json::to_string(&stats.persistent) {
        Ok(json) => tracing::info!(stats = %json, "Persistent tier stats"),
        Err(e) => tracing::warn!("Failed to render stats: {}", e),
    }

    let handle = scheduler.start();

    shutdown_signal().await;

    scheduler.shutdown_and_wait(handle).await?;
    tracing::info!(
        sweeps = scheduler.sweeps(),
        total_removed = scheduler.total_removed(),
        "Metacache maintenance shutdown complete"
    );
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
