//! Shared session clock.
//!
//! One monotonic origin, captured when the session starts, shared by every
//! part of the pipeline. Video timestamps are derived from it; audio
//! timestamps come from the sample counter instead, so both streams measure
//! time from the same instant without ever consulting the wall clock.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
pub struct SessionClock {
    origin: Instant,
}

impl SessionClock {
    pub fn start() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.origin.elapsed()
    }

    /// Current video timestamp in ticks of 1/frame_rate seconds.
    pub fn video_pts(&self, frame_rate: u32) -> i64 {
        (self.elapsed().as_secs_f64() * frame_rate as f64).round() as i64
    }
}
