//! Anemometer pulse counting, debounce and gust tracking.
//!
//! [`WindPulseCounter::record_pulse`] runs in interrupt context. It only
//! touches atomics: no locks, no allocation, no floating point. The shortest
//! accepted inter-pulse interval stands in for the gust; it is turned into a
//! speed only when read from a periodic context.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use crate::units::{ANEMOMETER_KMH_PER_HZ, Kmh};

/// Minimum spacing between accepted pulses. Closer pulses are reed-switch bounce.
pub const DEBOUNCE_MS: u64 = 5;

const NONE: u64 = u64::MAX;

/// Pulses and shortest interval accumulated over one coarse window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WindWindow {
    pub pulses: u32,
    pub shortest_interval_ms: Option<u64>,
}

impl WindWindow {
    /// Peak instantaneous speed of the window, zero without an interval.
    pub fn gust(&self) -> Kmh {
        self.shortest_interval_ms.map_or(Kmh(0.0), gust_speed)
    }
}

#[derive(Debug)]
pub struct WindPulseCounter {
    pulses: AtomicU32,
    last_pulse_ms: AtomicU64,
    shortest_interval_ms: AtomicU64,
}

impl Default for WindPulseCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl WindPulseCounter {
    pub const fn new() -> Self {
        Self {
            pulses: AtomicU32::new(0),
            last_pulse_ms: AtomicU64::new(NONE),
            shortest_interval_ms: AtomicU64::new(NONE),
        }
    }

    /// Record a rising edge at monotonic time `now_ms`.
    ///
    /// Returns `false` when the pulse is dropped by debounce. The last-pulse
    /// timestamp survives window boundaries, so the first interval of a
    /// window may start in the previous one.
    pub fn record_pulse(&self, now_ms: u64) -> bool {
        let mut last = self.last_pulse_ms.load(Ordering::Acquire);
        loop {
            let interval = (last != NONE).then(|| now_ms.saturating_sub(last));
            if interval.is_some_and(|dt| dt < DEBOUNCE_MS) {
                return false;
            }
            match self.last_pulse_ms.compare_exchange_weak(
                last,
                now_ms,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    if let Some(dt) = interval {
                        self.shortest_interval_ms.fetch_min(dt, Ordering::AcqRel);
                    }
                    self.pulses.fetch_add(1, Ordering::AcqRel);
                    return true;
                }
                Err(current) => last = current,
            }
        }
    }

    /// Pulses accepted since the last [`take_window`](Self::take_window).
    pub fn pulses(&self) -> u32 {
        self.pulses.load(Ordering::Acquire)
    }

    /// Current window state without resetting it.
    pub fn peek(&self) -> WindWindow {
        WindWindow {
            pulses: self.pulses(),
            shortest_interval_ms: interval_or_none(
                self.shortest_interval_ms.load(Ordering::Acquire),
            ),
        }
    }

    /// Read and reset the window. Each field is swapped atomically; a pulse
    /// landing between the two swaps is attributed to the neighbouring window.
    pub fn take_window(&self) -> WindWindow {
        let pulses = self.pulses.swap(0, Ordering::AcqRel);
        let shortest = self.shortest_interval_ms.swap(NONE, Ordering::AcqRel);
        WindWindow {
            pulses,
            shortest_interval_ms: interval_or_none(shortest),
        }
    }
}

fn interval_or_none(raw: u64) -> Option<u64> {
    (raw != NONE).then_some(raw)
}

/// Instantaneous speed implied by one inter-pulse interval.
pub fn gust_speed(interval_ms: u64) -> Kmh {
    let seconds = interval_ms.max(DEBOUNCE_MS) as f64 / 1000.0;
    Kmh(ANEMOMETER_KMH_PER_HZ / seconds)
}

/// Mean speed of `pulses` spread over `elapsed`.
///
/// # Panics
/// If `elapsed` is zero. The scheduler never closes an empty window.
pub fn average_speed(pulses: u32, elapsed: Duration) -> Kmh {
    let seconds = elapsed.as_secs_f64();
    assert!(seconds > 0.0, "wind window closed with zero elapsed time");
    Kmh(ANEMOMETER_KMH_PER_HZ * f64::from(pulses) / seconds)
}
