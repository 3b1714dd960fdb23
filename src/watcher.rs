// Polling directory watcher: emits a "path created" event for each new watched file.
// Events go out on a bounded broadcast channel; a lagging receiver loses the oldest ones.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::sync::{broadcast, watch};
use tokio::time::{Duration, Instant, interval};
use tracing::{debug, warn};

use crate::classifier::Classifier;

/// Rate limit for repeated directory read failures.
const SCAN_WARN_INTERVAL: Duration = Duration::from_secs(60);

/// Channel carrying created paths from the watcher to the dispatcher.
pub fn event_channel(capacity: usize) -> (broadcast::Sender<PathBuf>, broadcast::Receiver<PathBuf>) {
    broadcast::channel(capacity)
}

pub struct WatcherConfig {
    pub dirs: Vec<PathBuf>,
    pub poll_interval: Duration,
}

async fn scan_dir(dir: &Path, classifier: &Classifier) -> std::io::Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut out = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if entry.file_type().await.is_ok_and(|t| t.is_file()) && classifier.is_watched(&path) {
            out.push(path);
        }
    }
    Ok(out)
}

/// Lists watched files in every dir. A dir that cannot be read keeps its previously known
/// files, so its contents are not re-emitted once it becomes readable again.
async fn scan(
    dirs: &[PathBuf],
    classifier: &Classifier,
    known: &HashSet<PathBuf>,
    last_warn: &mut Option<Instant>,
) -> HashSet<PathBuf> {
    let mut current = HashSet::new();
    for dir in dirs {
        match scan_dir(dir, classifier).await {
            Ok(paths) => current.extend(paths),
            Err(e) => {
                if last_warn.is_none_or(|t| t.elapsed() >= SCAN_WARN_INTERVAL) {
                    warn!(error = %e, dir = %dir.display(), operation = "scan_dir", "cannot read watched directory");
                    *last_warn = Some(Instant::now());
                }
                current.extend(known.iter().filter(|p| p.starts_with(dir)).cloned());
            }
        }
    }
    current
}

/// Paths in `current` that were not known before, sorted.
pub fn created_paths(known: &HashSet<PathBuf>, current: &HashSet<PathBuf>) -> Vec<PathBuf> {
    let mut created: Vec<PathBuf> = current.difference(known).cloned().collect();
    created.sort();
    created
}

/// The first scan only seeds the known set; files already present are not events.
pub fn spawn(
    config: WatcherConfig,
    classifier: Classifier,
    tx: broadcast::Sender<PathBuf>,
    mut shutdown_rx: watch::Receiver<bool>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let WatcherConfig {
            dirs,
            poll_interval,
        } = config;
        let mut last_warn: Option<Instant> = None;
        let mut known = scan(&dirs, &classifier, &HashSet::new(), &mut last_warn).await;
        debug!(known_files = known.len(), "watcher seeded");

        let mut tick = interval(poll_interval);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        tick.tick().await;

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    let current = scan(&dirs, &classifier, &known, &mut last_warn).await;
                    for path in created_paths(&known, &current) {
                        if tx.send(path).is_err() {
                            debug!("event channel has no receivers");
                        }
                    }
                    known = current;
                }
                _ = shutdown_rx.changed() => {
                    debug!("Watcher shutting down");
                    break;
                }
            }
        }
    })
}
