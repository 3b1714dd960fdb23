// Rolling frame counters: per-window count and byte sum, lifetime total, debounced last frame.
// Rate and average size are published once per window tick and held until the next.

use chrono::{DateTime, TimeDelta, Utc};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::ConfigError;
use crate::models::{FrameStats, LastFrame};

/// A frame arriving within this many milliseconds of the recorded last frame does not replace it.
pub const LAST_FRAME_DEBOUNCE_MS: i64 = 500;

#[derive(Debug, Default)]
struct FrameState {
    window_count: u64,
    window_bytes: u64,
    published: FrameStats,
    last_frame: Option<LastFrame>,
}

pub struct FrameRepo {
    window_secs: u64,
    state: Mutex<FrameState>,
}

impl FrameRepo {
    pub fn new(window_secs: u64) -> Result<Self, ConfigError> {
        if window_secs == 0 {
            return Err(ConfigError::ZeroWindow);
        }
        Ok(Self {
            window_secs,
            state: Mutex::new(FrameState::default()),
        })
    }

    pub fn window_secs(&self) -> u64 {
        self.window_secs
    }

    // Counters only; a panic while holding the lock cannot leave them half-written.
    fn lock(&self) -> MutexGuard<'_, FrameState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Counts one frame into the current window and the lifetime total.
    /// `last_frame` keeps the first frame of a burst: it is only replaced when
    /// more than 500ms have passed since the recorded one.
    pub fn observe(&self, filename: &str, size: u64, now: DateTime<Utc>) {
        let mut state = self.lock();
        state.window_count += 1;
        state.window_bytes = state.window_bytes.saturating_add(size);
        state.published.frame_total_count += 1;

        let replace = match &state.last_frame {
            None => true,
            Some(last) => now - last.ts > TimeDelta::milliseconds(LAST_FRAME_DEBOUNCE_MS),
        };
        if replace {
            state.last_frame = Some(LastFrame {
                filename: filename.to_string(),
                size,
                ts: now,
            });
        }
    }

    /// Closes the current window: publishes `count / window_secs` (truncating) and, when the
    /// window saw any frame, `bytes / count`. An empty window keeps the previous average size.
    pub fn tick_window(&self) -> FrameStats {
        let mut state = self.lock();
        state.published.framerate = state.window_count / self.window_secs;
        if state.window_count > 0 {
            state.published.frame_average_size = state.window_bytes / state.window_count;
        }
        state.window_count = 0;
        state.window_bytes = 0;
        state.published
    }

    pub fn stats(&self) -> FrameStats {
        self.lock().published
    }

    pub fn last_frame(&self) -> Option<LastFrame> {
        self.lock().last_frame.clone()
    }
}
