// Time-bucketed GPS averages: metric -> minute bucket -> Average.
// A single mutex covers every fold, snapshot and eviction.

mod average;

pub use average::{Average, BucketKey, INVALID_DOP, bucket_key, normalize};

use chrono::{DateTime, TimeDelta, Utc};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{instrument, warn};

use crate::error::{ConfigError, IngestError};
use crate::models::{GpsFix, GpsMetric};

/// Point-in-time copy: every metric, buckets ascending by timestamp.
pub type GpsSnapshot = BTreeMap<GpsMetric, Vec<Average>>;

#[derive(Debug)]
struct GpsTable {
    metrics: HashMap<GpsMetric, HashMap<BucketKey, Average>>,
    stale: bool,
}

impl GpsTable {
    fn new() -> Self {
        Self {
            metrics: GpsMetric::ALL
                .iter()
                .map(|m| (*m, HashMap::new()))
                .collect(),
            stale: false,
        }
    }

    fn fold(&mut self, metric: GpsMetric, value: f64, ts: DateTime<Utc>) {
        let value = normalize(value);
        self.metrics
            .entry(metric)
            .or_default()
            .entry(bucket_key(ts))
            .and_modify(|avg| avg.fold(value, ts))
            .or_insert_with(|| Average::new(value, ts));
    }

    fn fold_fix(&mut self, fix: &GpsFix, vdop_from_tdop: bool) -> bool {
        if !fix.has_fix() {
            return false;
        }
        let ts = fix.systemtime;
        if let Some(dop) = &fix.dop {
            let vdop = if vdop_from_tdop { dop.tdop } else { dop.vdop };
            self.fold(GpsMetric::Gdop, dop.gdop, ts);
            self.fold(GpsMetric::Hdop, dop.hdop, ts);
            self.fold(GpsMetric::Pdop, dop.pdop, ts);
            self.fold(GpsMetric::Tdop, dop.tdop, ts);
            self.fold(GpsMetric::Vdop, vdop, ts);
        }
        if let Some(sats) = &fix.satellites {
            self.fold(GpsMetric::SatSeen, sats.seen as f64, ts);
            self.fold(GpsMetric::SatUsed, sats.used as f64, ts);
        }
        true
    }
}

/// Result of backfilling from a directory of batch files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub files_ingested: usize,
    pub files_failed: usize,
}

pub struct GpsRepo {
    retention: Duration,
    vdop_from_tdop: bool,
    table: Mutex<GpsTable>,
}

impl GpsRepo {
    /// `vdop_from_tdop` reproduces the capture tooling's historical behaviour of
    /// averaging the tdop field under the vdop name.
    pub fn new(retention: Duration, vdop_from_tdop: bool) -> Result<Self, ConfigError> {
        if retention.is_zero() {
            return Err(ConfigError::ZeroRetention);
        }
        Ok(Self {
            retention,
            vdop_from_tdop,
            table: Mutex::new(GpsTable::new()),
        })
    }

    // Every mutation is a single in-place fold or remove, so a poisoned table is still consistent.
    fn lock(&self) -> MutexGuard<'_, GpsTable> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Parses a JSON array of fixes and folds every fix whose quality is not "None".
    /// An empty payload folds nothing but still counts as a successful batch.
    /// Returns the number of fixes folded. The whole batch is folded under one lock acquisition.
    pub fn ingest_batch(&self, bytes: &[u8]) -> Result<usize, IngestError> {
        if bytes.is_empty() {
            self.lock().stale = false;
            return Ok(0);
        }
        let fixes: Vec<GpsFix> = match serde_json::from_slice(bytes) {
            Ok(f) => f,
            Err(e) => {
                self.mark_stale();
                return Err(e.into());
            }
        };

        let mut table = self.lock();
        let mut folded = 0;
        for fix in &fixes {
            if table.fold_fix(fix, self.vdop_from_tdop) {
                folded += 1;
            }
        }
        table.stale = false;
        Ok(folded)
    }

    /// Reads and ingests one batch file.
    pub fn ingest_file(&self, path: &Path) -> Result<usize, IngestError> {
        let bytes = std::fs::read(path).map_err(|source| {
            self.mark_stale();
            IngestError::Read {
                path: path.to_path_buf(),
                source,
            }
        })?;
        self.ingest_batch(&bytes)
    }

    /// Ingests every `*.{extension}` file in `dir` in name order. Failing files are logged and skipped.
    #[instrument(skip(self), fields(repo = "gps", operation = "load_dir"))]
    pub fn load_dir(&self, dir: &Path, extension: &str) -> std::io::Result<LoadSummary> {
        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|p| p.is_file() && p.extension().is_some_and(|e| e == extension))
            .collect();
        paths.sort();

        let mut summary = LoadSummary::default();
        for path in paths {
            match self.ingest_file(&path) {
                Ok(_) => summary.files_ingested += 1,
                Err(e) => {
                    warn!(error = %e, path = %path.display(), "skipping gps batch");
                    summary.files_failed += 1;
                }
            }
        }
        Ok(summary)
    }

    /// Folds a single value into the bucket of `ts`. Sentinel 99.99 is folded as 0.
    pub fn fold(&self, metric: GpsMetric, value: f64, ts: DateTime<Utc>) {
        self.lock().fold(metric, value, ts);
    }

    pub fn snapshot(&self) -> GpsSnapshot {
        let table = self.lock();
        table
            .metrics
            .iter()
            .map(|(metric, buckets)| {
                let mut averages: Vec<Average> = buckets.values().cloned().collect();
                averages.sort_by_key(|a| a.ts());
                (*metric, averages)
            })
            .collect()
    }

    /// Removes buckets last updated more than `max_age` before now. Returns how many were removed.
    pub fn evict(&self, max_age: Duration) -> usize {
        let cutoff = TimeDelta::from_std(max_age)
            .ok()
            .and_then(|age| Utc::now().checked_sub_signed(age))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        self.evict_older_than(cutoff)
    }

    /// Evicts with the configured retention.
    pub fn evict_expired(&self) -> usize {
        self.evict(self.retention)
    }

    pub fn evict_older_than(&self, cutoff: DateTime<Utc>) -> usize {
        let mut table = self.lock();
        let mut removed = 0;
        for buckets in table.metrics.values_mut() {
            let before = buckets.len();
            buckets.retain(|_, avg| avg.ts() >= cutoff);
            removed += before - buckets.len();
        }
        removed
    }

    /// Flags that the latest batch could not be ingested. Cleared by the next successful batch.
    pub fn mark_stale(&self) {
        self.lock().stale = true;
    }

    /// True when the most recent batch failed to be read or parsed.
    pub fn is_stale(&self) -> bool {
        self.lock().stale
    }

    pub fn bucket_count(&self) -> usize {
        self.lock().metrics.values().map(HashMap::len).sum()
    }
}
