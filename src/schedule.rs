//! Calendar-day boundary for the daily rain reset.
//!
//! The reset is driven by a one-shot timer armed for the next local midnight.
//! A timer can wake a little early, or the wall clock can be stepped, so the
//! actual decision goes through [`DailyResetGate`], which fires at most once
//! per calendar date.

use std::time::Duration;

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone};

/// First instant of the day after `now`, in `now`'s timezone.
///
/// If midnight does not exist that day (a DST jump at 00:00), the first
/// whole hour that does exist is used. An ambiguous midnight resolves to
/// the earlier instant.
pub fn next_midnight<Tz: TimeZone>(now: &DateTime<Tz>) -> Option<DateTime<Tz>> {
    let tomorrow = now.date_naive().succ_opt()?;
    let tz = now.timezone();
    (0..24).find_map(|hour| {
        let time = NaiveTime::from_hms_opt(hour, 0, 0)?;
        tz.from_local_datetime(&tomorrow.and_time(time)).earliest()
    })
}

/// How long to sleep until the next local midnight.
///
/// Falls back to a full day if the boundary cannot be computed.
pub fn until_next_midnight<Tz: TimeZone>(now: &DateTime<Tz>) -> Duration {
    const ONE_DAY: Duration = Duration::from_secs(24 * 60 * 60);

    next_midnight(now)
        .and_then(|midnight| (midnight - now.clone()).to_std().ok())
        .unwrap_or(ONE_DAY)
}

/// Once-per-date latch for the daily rain reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyResetGate {
    last_reset: NaiveDate,
}

impl DailyResetGate {
    /// The start-up date counts as already reset: the rain count begins at
    /// zero.
    pub fn new(today: NaiveDate) -> Self {
        Self { last_reset: today }
    }

    pub fn last_reset(&self) -> NaiveDate {
        self.last_reset
    }

    /// Returns `true` exactly once for each date later than the last reset.
    /// A date at or before the last reset (early wake-up, clock stepped
    /// backwards) is refused.
    pub fn should_reset(&mut self, today: NaiveDate) -> bool {
        if today <= self.last_reset {
            return false;
        }
        self.last_reset = today;
        true
    }
}
