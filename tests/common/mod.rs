// Shared test helpers
#![allow(dead_code)]

use camtelemetry::aggregator::Aggregator;
use camtelemetry::classifier::{Classifier, FileMeta, FileSource, LocalFs};
use camtelemetry::frame_repo::FrameRepo;
use camtelemetry::gps_repo::GpsRepo;
use chrono::{DateTime, TimeZone, Utc};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

pub const TWO_HOURS: Duration = Duration::from_secs(2 * 60 * 60);

pub fn ts(h: u32, m: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, h, m, s).unwrap()
}

pub fn fix_json(fix: &str, hdop: f64, systemtime: DateTime<Utc>) -> serde_json::Value {
    serde_json::json!({
        "dop": {
            "gdop": 2.0,
            "hdop": hdop,
            "pdop": 1.5,
            "tdop": 0.5,
            "vdop": 0.8,
            "xdop": null,
            "ydop": null
        },
        "satellites": { "seen": 12, "used": 8 },
        "fix": fix,
        "systemtime": systemtime.to_rfc3339(),
        "timestamp": systemtime.to_rfc3339()
    })
}

pub fn batch(fixes: &[serde_json::Value]) -> Vec<u8> {
    serde_json::to_vec(fixes).unwrap()
}

pub fn classifier() -> Classifier {
    Classifier::new("jpg", "json", "gps")
}

pub fn aggregator_with(files: Box<dyn FileSource>) -> Aggregator {
    Aggregator::new(
        FrameRepo::new(5).unwrap(),
        GpsRepo::new(TWO_HOURS, false).unwrap(),
        classifier(),
        files,
    )
}

pub fn local_aggregator() -> Aggregator {
    aggregator_with(Box::new(LocalFs))
}

/// In-memory file source; paths not inserted behave as deleted files.
#[derive(Default)]
pub struct FakeFs {
    files: Mutex<HashMap<PathBuf, Vec<u8>>>,
}

impl FakeFs {
    pub fn with(files: &[(&str, &str)]) -> Self {
        let fs = Self::default();
        for (path, data) in files {
            fs.files
                .lock()
                .unwrap()
                .insert(PathBuf::from(path), data.as_bytes().to_vec());
        }
        fs
    }
}

impl FileSource for FakeFs {
    fn stat(&self, path: &Path) -> std::io::Result<FileMeta> {
        let files = self.files.lock().unwrap();
        let data = files
            .get(path)
            .ok_or_else(|| std::io::Error::from(std::io::ErrorKind::NotFound))?;
        Ok(FileMeta {
            name: path.file_name().unwrap().to_string_lossy().into_owned(),
            size: data.len() as u64,
        })
    }

    fn read(&self, path: &Path) -> std::io::Result<Vec<u8>> {
        self.files
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| std::io::Error::from(std::io::ErrorKind::NotFound))
    }
}
