//! Simulated game clock
//!
//! Game time advances `time_acceleration` times faster than wall time,
//! starting from a configured instant. Equipment decay and block timestamps
//! are read from this clock.

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use crate::config::ClockConfig;

#[derive(Debug, Clone)]
pub struct SimClock {
    game_start_ms: u64,
    acceleration: f64,
    started: Instant,
}

impl SimClock {
    pub fn new(config: &ClockConfig) -> Self {
        Self {
            game_start_ms: config.game_start_ms.unwrap_or_else(unix_now_ms),
            acceleration: config.time_acceleration,
            started: Instant::now(),
        }
    }

    /// Current game time (ms)
    pub fn now_ms(&self) -> u64 {
        self.at(self.started.elapsed())
    }

    /// Game time after `elapsed` real time
    pub fn at(&self, elapsed: Duration) -> u64 {
        let scaled = elapsed.as_millis() as f64 * self.acceleration;
        self.game_start_ms.saturating_add(scaled as u64)
    }

    pub fn game_start_ms(&self) -> u64 {
        self.game_start_ms
    }

    pub fn acceleration(&self) -> f64 {
        self.acceleration
    }
}

/// Wall clock in Unix milliseconds
pub fn unix_now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
