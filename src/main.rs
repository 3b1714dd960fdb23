use anyhow::Result;
use camtelemetry::*;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(s) => s,
                Err(_) => {
                    let _ = tokio::signal::ctrl_c().await;
                    return;
                }
            };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .init();

    tracing::info!("Starting {}", version::banner());
    let app_config = config::AppConfig::load()?;
    let aggregator = Arc::new(aggregator::Aggregator::from_config(&app_config)?);

    let gps_path = PathBuf::from(&app_config.watch.gps_path);
    match aggregator
        .gps()
        .load_dir(&gps_path, aggregator.classifier().gps_extension())
    {
        Ok(summary) => tracing::info!(
            files_ingested = summary.files_ingested,
            files_failed = summary.files_failed,
            "gps history loaded"
        ),
        Err(e) => tracing::warn!(error = %e, path = %gps_path.display(), "gps history not loaded"),
    }

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let (watch_stop_tx, watch_stop_rx) = tokio::sync::watch::channel(false);
    let (event_tx, event_rx) = watcher::event_channel(app_config.watch.channel_capacity);

    let dispatcher_handle =
        worker::spawn_dispatcher(event_rx, aggregator.clone(), shutdown_rx.clone());
    let watcher_handle = watcher::spawn(
        watcher::WatcherConfig {
            dirs: vec![PathBuf::from(&app_config.watch.images_path), gps_path],
            poll_interval: Duration::from_millis(app_config.watch.poll_interval_ms),
        },
        aggregator.classifier().clone(),
        event_tx,
        watch_stop_rx,
    );
    let worker_handle = worker::spawn(
        worker::WorkerDeps {
            aggregator: aggregator.clone(),
            shutdown_rx: shutdown_rx.clone(),
        },
        worker::WorkerConfig {
            evict_interval_secs: app_config.gps.evict_interval_secs,
            stats_log_interval_secs: app_config.monitoring.stats_log_interval_secs,
        },
    );
    let sampler = sampler::HostSampler::new(
        Arc::new(sysinfo_repo::SysinfoRepo::new()),
        Duration::from_millis(app_config.monitoring.cpu_sample_delay_ms),
    );
    let sampler_handle = worker::spawn_host_sampler(
        sampler,
        aggregator.clone(),
        app_config.monitoring.sample_interval_ms,
        shutdown_rx,
    );

    let app = routes::app(aggregator, app_config.clone());
    let addr = format!("{}:{}", app_config.server.host, app_config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);

    tokio::select! {
        result = axum::serve(listener, app) => {
            result?;
        }
        _ = shutdown_signal() => {
            tracing::info!("Received shutdown signal");
        }
    }

    // Watcher first so nothing new is queued, then the dispatcher drains what is buffered.
    let _ = watch_stop_tx.send(true);
    let _ = watcher_handle.await;
    let _ = shutdown_tx.send(true);
    let _ = dispatcher_handle.await;
    let _ = worker_handle.await;
    let _ = sampler_handle.await;

    Ok(())
}
