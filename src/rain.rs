//! Rain gauge tip counting.
//!
//! Tips are counted as integers. Depth is derived from the count and
//! converted to the display unit once, when a window closes, so rounding
//! error does not accumulate tip by tip.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use crate::units::{Millimeters, SECONDS_PER_HOUR};

/// Two independent accumulators fed by the same tip: one for the calendar
/// day, one for the current rate window.
#[derive(Debug, Default)]
pub struct RainPulseCounter {
    daily_tips: AtomicU32,
    window_tips: AtomicU32,
}

impl RainPulseCounter {
    pub const fn new() -> Self {
        Self {
            daily_tips: AtomicU32::new(0),
            window_tips: AtomicU32::new(0),
        }
    }

    /// Record one bucket tip. Tip contacts are clean, no debounce.
    pub fn record_tip(&self) {
        self.daily_tips.fetch_add(1, Ordering::AcqRel);
        self.window_tips.fetch_add(1, Ordering::AcqRel);
    }

    pub fn daily_tips(&self) -> u32 {
        self.daily_tips.load(Ordering::Acquire)
    }

    pub fn window_tips(&self) -> u32 {
        self.window_tips.load(Ordering::Acquire)
    }

    /// Read and reset the rate accumulator. Leaves the daily count alone.
    pub fn take_window_tips(&self) -> u32 {
        self.window_tips.swap(0, Ordering::AcqRel)
    }

    /// Reset the daily count, returning what it held. Leaves the rate
    /// accumulator alone.
    pub fn reset_daily(&self) -> u32 {
        self.daily_tips.swap(0, Ordering::AcqRel)
    }
}

/// Depth per hour implied by `depth` falling over `window`.
///
/// # Panics
/// If `window` is zero.
pub fn hourly_rate(depth: Millimeters, window: Duration) -> Millimeters {
    let seconds = window.as_secs_f64();
    assert!(seconds > 0.0, "rain window closed with zero elapsed time");
    Millimeters(depth.0 * (SECONDS_PER_HOUR / seconds))
}
