//! Background maintenance jobs.
//!
//! Each job ticks on its own `tokio::time::interval`, logs failures and keeps
//! going. All of them stop when the shutdown channel fires. Work that touches
//! the data directory runs on the blocking pool.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::{FaceService, JobsConfig, ServiceError, ShutdownController};

/// Spawn every job described by `config`.
pub fn spawn_jobs(
    service: Arc<FaceService>,
    config: &JobsConfig,
    shutdown: &ShutdownController,
) -> Vec<JoinHandle<()>> {
    vec![
        spawn_retention_purge(
            Arc::clone(&service),
            secs(config.retention_interval_secs),
            shutdown.subscribe(),
        ),
        spawn_bias_monitor(
            Arc::clone(&service),
            secs(config.bias_interval_secs),
            config.bias_ratio_threshold,
            shutdown.subscribe(),
        ),
        spawn_challenge_sweep(
            service,
            secs(config.challenge_sweep_interval_secs),
            secs(config.challenge_max_age_secs),
            shutdown.subscribe(),
        ),
    ]
}

fn secs(value: u64) -> Duration {
    Duration::from_secs(value.max(1))
}

async fn run_blocking<T, F>(service: &Arc<FaceService>, op: F) -> Result<T, String>
where
    T: Send + 'static,
    F: FnOnce(&FaceService) -> Result<T, ServiceError> + Send + 'static,
{
    let service = Arc::clone(service);
    match tokio::task::spawn_blocking(move || op(&service)).await {
        Ok(result) => result.map_err(|e| e.to_string()),
        Err(e) => Err(format!("worker failed: {e}")),
    }
}

/// Delete users past their retention window.
pub fn spawn_retention_purge(
    service: Arc<FaceService>,
    every: Duration,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.recv() => {
                    info!("retention purge job shutting down");
                    break;
                }
                _ = interval.tick() => {
                    match run_blocking(&service, FaceService::purge_expired).await {
                        Ok(0) => debug!("retention purge: nothing expired"),
                        Ok(count) => info!(count, "retention purge removed users"),
                        Err(e) => warn!(error = %e, "retention purge failed"),
                    }
                }
            }
        }
    })
}

/// Compare TAR/FAR across groups and raise an error-level alert on disparity.
pub fn spawn_bias_monitor(
    service: Arc<FaceService>,
    every: Duration,
    threshold: f64,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.recv() => {
                    info!("bias monitor shutting down");
                    break;
                }
                _ = interval.tick() => {
                    match run_blocking(&service, move |s| s.check_bias(threshold)).await {
                        Ok(Some(report)) => error!(
                            highest_group = %report.highest_group,
                            highest_ratio = report.highest_ratio,
                            lowest_group = %report.lowest_group,
                            lowest_ratio = report.lowest_ratio,
                            spread = report.spread,
                            "TAR/FAR disparity detected"
                        ),
                        Ok(None) => debug!("bias monitor: no disparity"),
                        Err(e) => warn!(error = %e, "bias monitor failed"),
                    }
                }
            }
        }
    })
}

/// Drop abandoned challenges.
pub fn spawn_challenge_sweep(
    service: Arc<FaceService>,
    every: Duration,
    max_age: Duration,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.recv() => break,
                _ = interval.tick() => {
                    let swept = service.sweep_challenges(max_age);
                    if swept > 0 {
                        debug!(swept, "expired challenges dropped");
                    }
                }
            }
        }
    })
}
