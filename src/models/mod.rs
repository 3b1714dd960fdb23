// Domain models: frames, GPS fixes and averages, host snapshot

mod frame;
mod gps;
mod system;

pub use frame::{FrameStats, LastFrame};
pub use gps::{Dop, GpsFix, GpsMetric, Satellites};
pub use system::{CpuStats, CpuTimes, MemoryStats, TopSnapshot, TopState, format_bytes};
