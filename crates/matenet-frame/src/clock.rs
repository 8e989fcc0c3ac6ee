//! Millisecond tick source for receive deadlines.
//!
//! Deadlines are measured against a free-running `u32` millisecond counter
//! that is allowed to wrap. [`elapsed_ms`] subtracts across the full
//! unsigned range, so a deadline that straddles the wrap still expires on time.

use std::time::Instant;

/// A monotonic, wrapping millisecond counter.
pub trait Clock {
    fn now_ms(&self) -> u32;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_ms(&self) -> u32 {
        (**self).now_ms()
    }
}

/// Milliseconds from `start` to `now`, correct across counter wraparound.
pub fn elapsed_ms(start: u32, now: u32) -> u32 {
    now.wrapping_sub(start)
}

/// Wall-clock independent tick source backed by [`Instant`].
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_ms(&self) -> u32 {
        // Truncation is the wrap.
        self.origin.elapsed().as_millis() as u32
    }
}
