//! Monotonic clock and timer used to schedule probe readings.
//!
//! Timestamps are milliseconds as `f64`, measured from an arbitrary origin
//! fixed when the clock is created.

use std::cell::Cell;
use std::rc::Rc;
use std::thread;
use std::time::{Duration, Instant};

pub trait Clock {
    /// Current time in milliseconds.
    fn now(&self) -> f64;

    /// Blocks until `now() >= timestamp`. Returns immediately for past timestamps.
    fn wait_until(&self, timestamp: f64);
}

/// Wall clock backed by [`Instant`], waiting with `thread::sleep`.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }

    fn wait_until(&self, timestamp: f64) {
        if let Some(delay) = sleep_duration(timestamp - self.now()) {
            thread::sleep(delay);
        }
    }
}

/// Converts a delay in milliseconds to a sleep, saturating at [`Duration::MAX`].
/// `None` when there is nothing to wait for.
fn sleep_duration(delay_ms: f64) -> Option<Duration> {
    if delay_ms.is_nan() || delay_ms <= 0.0 {
        return None;
    }
    Some(Duration::try_from_secs_f64(delay_ms / 1000.0).unwrap_or(Duration::MAX))
}

/// Clock that only moves when told to. `wait_until` jumps straight to the
/// target, so timed procedures run instantly and deterministically.
///
/// Clones share the same time, which lets a fake collaborator advance the
/// clock seen by the session.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<f64>>,
}

impl ManualClock {
    pub fn starting_at(timestamp: f64) -> Self {
        Self {
            now: Rc::new(Cell::new(timestamp)),
        }
    }

    pub fn advance(&self, millis: f64) {
        self.now.set(self.now.get() + millis);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        self.now.get()
    }

    fn wait_until(&self, timestamp: f64) {
        if timestamp > self.now.get() {
            self.now.set(timestamp);
        }
    }
}
