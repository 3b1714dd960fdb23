// Path classification (frame / GPS batch / ignored) and the file capability used to route events.

use serde::Serialize;
use std::path::Path;

/// Where a created path is routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EventKind {
    Frame,
    GpsBatch,
}

/// Size and base name of a file that exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMeta {
    pub name: String,
    pub size: u64,
}

/// Stat and read access to created files. `LocalFs` in production; tests substitute fakes.
pub trait FileSource: Send + Sync {
    fn stat(&self, path: &Path) -> std::io::Result<FileMeta>;
    fn read(&self, path: &Path) -> std::io::Result<Vec<u8>>;
}

pub struct LocalFs;

impl FileSource for LocalFs {
    fn stat(&self, path: &Path) -> std::io::Result<FileMeta> {
        let meta = std::fs::metadata(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(FileMeta {
            name,
            size: meta.len(),
        })
    }

    fn read(&self, path: &Path) -> std::io::Result<Vec<u8>> {
        std::fs::read(path)
    }
}

#[derive(Debug, Clone)]
pub struct Classifier {
    frame_extension: String,
    gps_extension: String,
    gps_marker: String,
}

impl Classifier {
    pub fn new(
        frame_extension: impl Into<String>,
        gps_extension: impl Into<String>,
        gps_marker: impl Into<String>,
    ) -> Self {
        Self {
            frame_extension: frame_extension.into(),
            gps_extension: gps_extension.into(),
            gps_marker: gps_marker.into(),
        }
    }

    pub fn gps_extension(&self) -> &str {
        &self.gps_extension
    }

    fn has_extension(path: &Path, ext: &str) -> bool {
        path.extension().is_some_and(|e| e == ext)
    }

    /// Whether the watcher should emit this path at all.
    pub fn is_watched(&self, path: &Path) -> bool {
        Self::has_extension(path, &self.frame_extension)
            || Self::has_extension(path, &self.gps_extension)
    }

    /// GPS extension plus the marker anywhere in the path is a GPS batch; any other watched
    /// path is a frame candidate. `None` means the path is ignored.
    pub fn classify(&self, path: &Path) -> Option<EventKind> {
        if !self.is_watched(path) {
            return None;
        }
        if Self::has_extension(path, &self.gps_extension)
            && path.to_string_lossy().contains(self.gps_marker.as_str())
        {
            Some(EventKind::GpsBatch)
        } else {
            Some(EventKind::Frame)
        }
    }
}
