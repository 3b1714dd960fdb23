// Host CPU and memory models, and the composite "top" snapshot

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::FrameStats;

/// Raw cumulative CPU counters (jiffies) as read from the OS.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuTimes {
    pub user: u64,
    pub nice: u64,
    pub system: u64,
    pub idle: u64,
    pub total: u64,
}

/// Share of each CPU category between two counter samples, in percent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CpuStats {
    pub user: f64,
    pub system: f64,
    pub idle: f64,
    pub nice: f64,
    pub total: f64,
}

impl CpuStats {
    /// `100 * (after - before) / total_delta` per category. A zero total delta yields all zeros.
    pub fn from_delta(before: &CpuTimes, after: &CpuTimes) -> Self {
        let total = after.total.saturating_sub(before.total);
        if total == 0 {
            return Self::default();
        }
        let pct = |a: u64, b: u64| a.saturating_sub(b) as f64 / total as f64 * 100.0;
        Self {
            user: pct(after.user, before.user),
            system: pct(after.system, before.system),
            idle: pct(after.idle, before.idle),
            nice: pct(after.nice, before.nice),
            total: pct(after.total, before.total),
        }
    }
}

/// Memory figures in bytes, sampled once per tick (not a delta).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryStats {
    pub total: u64,
    pub used: u64,
    pub cached: u64,
    pub free: u64,
    pub active: u64,
    pub inactive: u64,
    pub swap_total: u64,
    pub swap_used: u64,
    pub swap_free: u64,
}

/// Replaced wholesale every sampling tick; never partially updated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopSnapshot {
    pub timestamp: DateTime<Utc>,
    pub frame_stats: FrameStats,
    pub memory: MemoryStats,
    pub cpu: CpuStats,
}

/// What readers see: the last good snapshot (if any) and whether sampling has stopped behind it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopState {
    pub top: Option<TopSnapshot>,
    pub stale: bool,
}

/// IEC byte formatting for logs, e.g. `1.5 GiB`.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 6] = ["KiB", "MiB", "GiB", "TiB", "PiB", "EiB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}
