//! Time utilities for the match drivers

use std::time::{Duration, Instant};

/// Number of driver ticks that fit in `limit`, at least one.
/// Saturates at `u64::MAX` for limits too long to count.
pub fn ticks_within(limit: Duration, tick_period: Duration) -> u64 {
    let period = tick_period.as_micros().max(1);
    u64::try_from(limit.as_micros() / period)
        .unwrap_or(u64::MAX)
        .max(1)
}

/// Tracks how long the server has been up
#[derive(Debug, Clone, Copy)]
pub struct Uptime {
    start: Instant,
}

impl Uptime {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn secs(&self) -> u64 {
        self.start.elapsed().as_secs()
    }
}

impl Default for Uptime {
    fn default() -> Self {
        Self::start()
    }
}
