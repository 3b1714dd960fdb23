// Host CPU counters and memory figures via /proc and sysinfo

mod linux;

use crate::error::SamplerError;
use crate::models::{CpuTimes, MemoryStats};
use std::sync::Mutex;
use sysinfo::System;
use tracing::instrument;

/// OS-stats collaborator: raw cumulative CPU counters and current memory figures.
/// Calls may block briefly; the sampler runs them on the blocking pool.
pub trait HostStats: Send + Sync + 'static {
    fn cpu_times(&self) -> Result<CpuTimes, SamplerError>;
    fn memory(&self) -> Result<MemoryStats, SamplerError>;
}

pub struct SysinfoRepo {
    sys: Mutex<System>,
}

impl Default for SysinfoRepo {
    fn default() -> Self {
        Self::new()
    }
}

impl SysinfoRepo {
    pub fn new() -> Self {
        let mut sys = System::new();
        sys.refresh_memory();
        Self {
            sys: Mutex::new(sys),
        }
    }
}

impl HostStats for SysinfoRepo {
    #[instrument(skip(self), fields(repo = "sysinfo", operation = "cpu_times"))]
    fn cpu_times(&self) -> Result<CpuTimes, SamplerError> {
        linux::read_cpu_times_linux()
    }

    #[instrument(skip(self), fields(repo = "sysinfo", operation = "memory"))]
    fn memory(&self) -> Result<MemoryStats, SamplerError> {
        let mut sys = self.sys.lock().map_err(|_| SamplerError::Poisoned)?;
        sys.refresh_memory();

        let extras = linux::read_meminfo_extras_linux();
        Ok(MemoryStats {
            total: sys.total_memory(),
            used: sys.used_memory(),
            cached: extras.cached,
            free: sys.free_memory(),
            active: extras.active,
            inactive: extras.inactive,
            swap_total: sys.total_swap(),
            swap_used: sys.used_swap(),
            swap_free: sys.free_swap(),
        })
    }
}
