// Background tasks: event dispatcher, periodic monitor (window tick, GPS eviction, stats log),
// host sampler. Each stops on the shared shutdown signal.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tokio::time::{Duration, Instant, Interval, interval, interval_at};
use tracing::{Instrument, debug, info, warn};

use crate::aggregator::{Aggregator, RouteOutcome};
use crate::models::format_bytes;
use crate::sampler::HostSampler;
use crate::sysinfo_repo::HostStats;

/// Aggregator and shutdown for the monitor loop.
pub struct WorkerDeps {
    pub aggregator: Arc<Aggregator>,
    pub shutdown_rx: watch::Receiver<bool>,
}

/// Monitor timing. The window length comes from the aggregator's frame tracker.
pub struct WorkerConfig {
    /// 0 disables eviction.
    pub evict_interval_secs: u64,
    pub stats_log_interval_secs: u64,
}

fn dispatch(aggregator: &Aggregator, path: &Path) {
    match aggregator.route(path) {
        RouteOutcome::Routed(kind) => {
            debug!(path = %path.display(), kind = ?kind, "event routed");
        }
        RouteOutcome::Dropped(e) => {
            warn!(error = %e, operation = "route", "dropping event");
            aggregator.record_dropped(1);
        }
    }
}

/// Routes every event still buffered in the channel. Returns how many were routed.
fn drain(rx: &mut broadcast::Receiver<PathBuf>, aggregator: &Aggregator) -> usize {
    let mut drained = 0;
    loop {
        match rx.try_recv() {
            Ok(path) => {
                dispatch(aggregator, &path);
                drained += 1;
            }
            Err(broadcast::error::TryRecvError::Lagged(n)) => aggregator.record_dropped(n),
            Err(_) => break,
        }
    }
    drained
}

/// Consumes created paths and routes them. On shutdown, drains what is already buffered first.
pub fn spawn_dispatcher(
    mut rx: broadcast::Receiver<PathBuf>,
    aggregator: Arc<Aggregator>,
    mut shutdown_rx: watch::Receiver<bool>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                result = rx.recv() => {
                    match result {
                        Ok(path) => dispatch(&aggregator, &path),
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            warn!(dropped_events = n, "event channel full; oldest events dropped");
                            aggregator.record_dropped(n);
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
                _ = shutdown_rx.changed() => {
                    let drained = drain(&mut rx, &aggregator);
                    debug!(drained, "Dispatcher shutting down");
                    break;
                }
            }
        }
    })
}

/// Samples host stats every `sample_interval_ms` and publishes a new TopSnapshot.
/// On the first sampling failure the last snapshot is marked stale and this task stops;
/// every other task keeps running.
pub fn spawn_host_sampler<S: HostStats>(
    sampler: HostSampler<S>,
    aggregator: Arc<Aggregator>,
    sample_interval_ms: u64,
    mut shutdown_rx: watch::Receiver<bool>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut tick = interval(Duration::from_millis(sample_interval_ms));
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    match sampler.tick(aggregator.frames()).await {
                        Ok(snapshot) => aggregator.publish_top(snapshot),
                        Err(e) => {
                            warn!(
                                error = %e,
                                operation = "host_sample",
                                "host sampling failed; last snapshot kept and marked stale"
                            );
                            aggregator.mark_top_stale();
                            break;
                        }
                    }
                }
                _ = shutdown_rx.changed() => {
                    debug!("Host sampler shutting down");
                    break;
                }
            }
        }
    })
}

// First tick one full period from now, unlike `interval` which fires immediately.
fn delayed_interval(period: Duration) -> Interval {
    let mut tick = interval_at(Instant::now() + period, period);
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    tick
}

async fn tick_opt(tick: &mut Option<Interval>) {
    match tick {
        Some(t) => {
            t.tick().await;
        }
        None => std::future::pending().await,
    }
}

fn log_app_stats(aggregator: &Aggregator) {
    let frames = aggregator.frames().stats();
    let top = aggregator.top();
    let memory_used = top
        .top
        .map(|t| format_bytes(t.memory.used))
        .unwrap_or_else(|| "n/a".into());
    info!(
        framerate = frames.framerate,
        frame_average_size = frames.frame_average_size,
        frame_total_count = frames.frame_total_count,
        gps_buckets = aggregator.gps().bucket_count(),
        gps_stale = aggregator.gps().is_stale(),
        dropped_events = aggregator.dropped_events(),
        top_stale = top.stale,
        memory_used = %memory_used,
        "app stats"
    );
}

pub fn spawn(deps: WorkerDeps, config: WorkerConfig) -> tokio::task::JoinHandle<()> {
    let WorkerDeps {
        aggregator,
        mut shutdown_rx,
    } = deps;
    let window_secs = aggregator.frames().window_secs();
    let WorkerConfig {
        evict_interval_secs,
        stats_log_interval_secs,
    } = config;

    tokio::spawn(async move {
        let mut window_tick = delayed_interval(Duration::from_secs(window_secs));
        let mut evict_tick = (evict_interval_secs > 0)
            .then(|| delayed_interval(Duration::from_secs(evict_interval_secs)));
        let mut stats_log_tick = delayed_interval(Duration::from_secs(stats_log_interval_secs));

        loop {
            tokio::select! {
                _ = window_tick.tick() => {
                    let stats = aggregator.frames().tick_window();
                    debug!(
                        framerate = stats.framerate,
                        frame_average_size = stats.frame_average_size,
                        "frame window closed"
                    );
                }
                _ = tick_opt(&mut evict_tick) => {
                    let removed = aggregator.gps().evict_expired();
                    if removed > 0 {
                        info!(operation = "evict", removed_buckets = removed, "expired gps buckets evicted");
                    }
                }
                _ = stats_log_tick.tick() => log_app_stats(&aggregator),
                _ = shutdown_rx.changed() => {
                    debug!("Worker shutting down");
                    break;
                }
            }
        }
    }
    .instrument(tracing::debug_span!("worker", window_secs)))
}
