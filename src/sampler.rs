// Host snapshot sampler: two CPU counter reads a fixed delay apart, one memory read,
// combined with the frame tracker's published stats into one TopSnapshot.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

use crate::error::SamplerError;
use crate::frame_repo::FrameRepo;
use crate::models::{CpuStats, TopSnapshot};
use crate::sysinfo_repo::HostStats;

pub struct HostSampler<S> {
    stats: Arc<S>,
    cpu_sample_delay: Duration,
}

impl<S: HostStats> HostSampler<S> {
    pub fn new(stats: Arc<S>, cpu_sample_delay: Duration) -> Self {
        Self {
            stats,
            cpu_sample_delay,
        }
    }

    /// Produces a fresh snapshot, or the first collaborator error (nothing is published then).
    pub async fn tick(&self, frames: &FrameRepo) -> Result<TopSnapshot, SamplerError> {
        let memory = self.blocking(|s| s.memory()).await?;
        let before = self.blocking(|s| s.cpu_times()).await?;
        tokio::time::sleep(self.cpu_sample_delay).await;
        let after = self.blocking(|s| s.cpu_times()).await?;

        Ok(TopSnapshot {
            timestamp: Utc::now(),
            frame_stats: frames.stats(),
            memory,
            cpu: CpuStats::from_delta(&before, &after),
        })
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T, SamplerError>
    where
        F: FnOnce(&S) -> Result<T, SamplerError> + Send + 'static,
        T: Send + 'static,
    {
        let stats = self.stats.clone();
        tokio::task::spawn_blocking(move || f(&stats)).await?
    }
}
