// Linux-specific helpers: /proc/stat CPU counters, /proc/meminfo page-cache figures.

use crate::error::SamplerError;
use crate::models::CpuTimes;

/// Aggregate `cpu` line of /proc/stat. Total is user+nice+system+idle+iowait+irq+softirq+steal
/// (guest time is already counted in user).
pub(super) fn parse_proc_stat(content: &str) -> Option<CpuTimes> {
    let line = content.lines().find(|l| l.starts_with("cpu "))?;
    let fields: Vec<u64> = line
        .split_whitespace()
        .skip(1)
        .map(|f| f.parse::<u64>())
        .collect::<Result<_, _>>()
        .ok()?;
    if fields.len() < 4 {
        return None;
    }
    let total: u64 = fields.iter().take(8).sum();
    Some(CpuTimes {
        user: fields[0],
        nice: fields[1],
        system: fields[2],
        idle: fields[3],
        total,
    })
}

pub(super) fn read_cpu_times_linux() -> Result<CpuTimes, SamplerError> {
    #[cfg(target_os = "linux")]
    {
        let content = std::fs::read_to_string("/proc/stat")?;
        parse_proc_stat(&content)
            .ok_or_else(|| SamplerError::Parse("no aggregate cpu line in /proc/stat".into()))
    }
    #[cfg(not(target_os = "linux"))]
    Err(SamplerError::Unsupported("cpu counters need /proc/stat"))
}

/// Memory figures sysinfo does not expose, in bytes.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(super) struct MeminfoExtras {
    pub cached: u64,
    pub active: u64,
    pub inactive: u64,
}

pub(super) fn parse_meminfo(content: &str) -> MeminfoExtras {
    let mut out = MeminfoExtras::default();
    for line in content.lines() {
        let Some((key, rest)) = line.split_once(':') else {
            continue;
        };
        let Some(kib) = rest
            .split_whitespace()
            .next()
            .and_then(|v| v.parse::<u64>().ok())
        else {
            continue;
        };
        let bytes = kib * 1024;
        match key {
            "Cached" => out.cached = bytes,
            "Active" => out.active = bytes,
            "Inactive" => out.inactive = bytes,
            _ => {}
        }
    }
    out
}

/// Zeros when /proc/meminfo is unavailable.
pub(super) fn read_meminfo_extras_linux() -> MeminfoExtras {
    #[cfg(target_os = "linux")]
    {
        if let Ok(content) = std::fs::read_to_string("/proc/meminfo") {
            return parse_meminfo(&content);
        }
    }
    MeminfoExtras::default()
}
