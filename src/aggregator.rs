// Aggregation context: built once in main, shared as Arc<Aggregator> by every task and handler.
// Readers only ever get copies (stats, snapshots, TopState), never references into live state.

use chrono::Utc;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use tracing::debug;

use crate::classifier::{Classifier, EventKind, FileSource, LocalFs};
use crate::config::AppConfig;
use crate::error::IngestError;
use crate::frame_repo::FrameRepo;
use crate::gps_repo::GpsRepo;
use crate::models::{TopSnapshot, TopState};

/// Outcome of routing one created path.
#[derive(Debug)]
pub enum RouteOutcome {
    Routed(EventKind),
    Dropped(IngestError),
}

pub struct Aggregator {
    frames: FrameRepo,
    gps: GpsRepo,
    classifier: Classifier,
    files: Box<dyn FileSource>,
    top_tx: watch::Sender<TopState>,
    dropped_events: AtomicU64,
}

impl Aggregator {
    pub fn new(
        frames: FrameRepo,
        gps: GpsRepo,
        classifier: Classifier,
        files: Box<dyn FileSource>,
    ) -> Self {
        let (top_tx, _) = watch::channel(TopState::default());
        Self {
            frames,
            gps,
            classifier,
            files,
            top_tx,
            dropped_events: AtomicU64::new(0),
        }
    }

    /// Builds the production aggregator (local filesystem). Invalid window/retention fail here.
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let frames = FrameRepo::new(config.frames.window_secs)?;
        let gps = GpsRepo::new(
            Duration::from_secs(config.gps.retention_secs),
            config.gps.vdop_from_tdop,
        )?;
        let classifier = Classifier::new(
            config.watch.frame_extension.clone(),
            config.watch.gps_extension.clone(),
            config.watch.gps_marker.clone(),
        );
        Ok(Self::new(frames, gps, classifier, Box::new(LocalFs)))
    }

    pub fn frames(&self) -> &FrameRepo {
        &self.frames
    }

    pub fn gps(&self) -> &GpsRepo {
        &self.gps
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// Classifies a created path and feeds the frame tracker or the GPS table.
    /// A file that vanished or cannot be parsed is dropped, never fatal.
    pub fn route(&self, path: &Path) -> RouteOutcome {
        let Some(kind) = self.classifier.classify(path) else {
            return RouteOutcome::Dropped(IngestError::Unwatched {
                path: path.to_path_buf(),
            });
        };

        let result = match kind {
            EventKind::GpsBatch => self.route_gps(path),
            EventKind::Frame => self.route_frame(path),
        };
        match result {
            Ok(()) => RouteOutcome::Routed(kind),
            Err(e) => RouteOutcome::Dropped(e),
        }
    }

    fn route_gps(&self, path: &Path) -> Result<(), IngestError> {
        let bytes = self.files.read(path).map_err(|source| {
            self.gps.mark_stale();
            IngestError::Read {
                path: path.to_path_buf(),
                source,
            }
        })?;
        let folded = self.gps.ingest_batch(&bytes)?;
        debug!(path = %path.display(), fixes_folded = folded, "gps batch ingested");
        Ok(())
    }

    fn route_frame(&self, path: &Path) -> Result<(), IngestError> {
        let meta = self.files.stat(path).map_err(|source| IngestError::Stat {
            path: path.to_path_buf(),
            source,
        })?;
        self.frames.observe(&meta.name, meta.size, Utc::now());
        Ok(())
    }

    pub fn record_dropped(&self, n: u64) {
        self.dropped_events.fetch_add(n, Ordering::Relaxed);
    }

    /// Events lost to channel overflow or dropped during routing.
    pub fn dropped_events(&self) -> u64 {
        self.dropped_events.load(Ordering::Relaxed)
    }

    pub fn top(&self) -> TopState {
        *self.top_tx.borrow()
    }

    pub fn subscribe_top(&self) -> watch::Receiver<TopState> {
        self.top_tx.subscribe()
    }

    /// Replaces the published snapshot wholesale and clears the stale flag.
    pub fn publish_top(&self, snapshot: TopSnapshot) {
        self.top_tx.send_replace(TopState {
            top: Some(snapshot),
            stale: false,
        });
    }

    /// Keeps the last snapshot but flags that no fresher one is coming.
    pub fn mark_top_stale(&self) {
        self.top_tx.send_modify(|state| state.stale = true);
    }
}
