//! Host time adapters.
//!
//! - [`MonotonicClock`] implements the [`Clock`] port over
//!   `std::time::Instant`, counting milliseconds from construction.
//! - [`StdDelay`] implements `embedded_hal::delay::DelayNs` with
//!   `thread::sleep`, for the bit-banged drivers and the startup probe.

use std::time::{Duration, Instant};

use embedded_hal::delay::DelayNs;

use crate::app::ports::Clock;
use crate::state::Timestamp;

pub struct MonotonicClock {
    start: Instant,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Instant corresponding to `t` on this clock.
    pub fn instant_at(&self, t: Timestamp) -> Instant {
        self.start + Duration::from_millis(t.as_millis())
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_millis(self.start.elapsed().as_millis() as u64)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StdDelay;

impl DelayNs for StdDelay {
    fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(Duration::from_nanos(u64::from(ns)));
    }

    fn delay_us(&mut self, us: u32) {
        std::thread::sleep(Duration::from_micros(u64::from(us)));
    }

    fn delay_ms(&mut self, ms: u32) {
        std::thread::sleep(Duration::from_millis(u64::from(ms)));
    }
}
