// Frame tracker outputs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Debounced "last observed frame". Overwritten, never appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastFrame {
    pub filename: String,
    pub size: u64,
    pub ts: DateTime<Utc>,
}

/// Values published at the last window tick, plus the lifetime frame total.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameStats {
    /// Frames per second over the last completed window (integer division).
    pub framerate: u64,
    /// Mean frame size in bytes of the last non-empty window.
    pub frame_average_size: u64,
    pub frame_total_count: u64,
}
