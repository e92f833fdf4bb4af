//! Monotonic clock abstraction
//!
//! The dispatcher and the video streamer never call `Instant::now()` or
//! `thread::sleep()` directly; they go through [`Clock`], so tests can drive
//! them with [`ManualClock`] and observe drift and cancellation without real
//! delays.

use super::CancelToken;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Monotonic time source with cancellable sleeping
pub trait Clock: Send + Sync {
    /// Time elapsed since the clock's origin
    fn now(&self) -> Duration;

    /// Suspend until `deadline` (relative to the origin) or until cancelled
    ///
    /// Returns true if the token was cancelled.
    fn sleep_until(&self, deadline: Duration, cancel: &CancelToken) -> bool;
}

/// Wall-clock time backed by `Instant`
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    /// Create a clock whose origin is now
    pub fn new() -> Self {
        SystemClock {
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
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn sleep_until(&self, deadline: Duration, cancel: &CancelToken) -> bool {
        let now = self.now();
        if deadline <= now {
            return cancel.is_cancelled();
        }
        cancel.wait_timeout(deadline - now)
    }
}

/// Simulated time that only moves when told to
///
/// Sleeping jumps straight to the deadline. Clones share the same time, so a
/// test sink can call [`ManualClock::advance`] to model transmission latency.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<Mutex<Duration>>,
}

impl ManualClock {
    /// Create a clock at time zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Move time forward
    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }

    /// Set the absolute time (never moves backwards)
    pub fn set(&self, to: Duration) {
        let mut now = self.now.lock();
        if to > *now {
            *now = to;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        *self.now.lock()
    }

    fn sleep_until(&self, deadline: Duration, cancel: &CancelToken) -> bool {
        if cancel.is_cancelled() {
            return true;
        }
        self.set(deadline);
        cancel.is_cancelled()
    }
}
