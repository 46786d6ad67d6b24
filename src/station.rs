//! The live weather state and its window-close logic.
//!
//! A [`WeatherStation`] is shared by three execution contexts:
//!
//! - **Interrupt context** calls [`PulseInputs`] (atomics only).
//! - **Fine cadence** calls [`WeatherStation::sample`] (short mutex hold).
//! - **Coarse cadence** calls [`WeatherStation::close_window`], which takes
//!   every window-scoped accumulator, does all averaging and unit conversion,
//!   and updates the published record.
//!
//! The daily boundary calls [`WeatherStation::reset_daily_rain`].

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::direction::Direction;
use crate::error::SensorError;
use crate::rain::{RainPulseCounter, hourly_rate};
use crate::sampling::SampleWindow;
use crate::traits::WeatherSensors;
use crate::units::{Celsius, Millimeters, Units, two_decimals};
use crate::wind::{WindPulseCounter, average_speed};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WindReading {
    pub direction: Direction,
    /// Degrees clockwise from north; `None` while the direction is unresolved.
    pub angle: Option<f64>,
    /// Mean speed over the last window.
    pub speed: f64,
    /// Peak instantaneous speed over the last window.
    pub gust: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RainReading {
    /// Depth since the last daily reset.
    pub count: f64,
    /// Hourly rate over the last window.
    pub rate: f64,
}

/// Published weather values, all in display units and rounded to two
/// decimals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherSnapshot {
    /// When the window that produced this record closed; `None` before the
    /// first window.
    pub observed_at: Option<DateTime<Utc>>,
    /// `None` until a window with at least one good probe reading closes.
    pub temperature: Option<f64>,
    pub wind: WindReading,
    pub rain: RainReading,
    pub units: Units,
}

impl WeatherSnapshot {
    /// The record published before any window has closed.
    pub fn empty(units: Units) -> Self {
        Self {
            observed_at: None,
            temperature: None,
            wind: WindReading {
                direction: Direction::Unresolved,
                angle: None,
                speed: 0.0,
                gust: 0.0,
            },
            rain: RainReading {
                count: 0.0,
                rate: 0.0,
            },
            units,
        }
    }
}

/// Handles given to interrupt context. Cloning is cheap.
#[derive(Debug, Clone)]
pub struct PulseInputs {
    wind: Arc<WindPulseCounter>,
    rain: Arc<RainPulseCounter>,
}

impl PulseInputs {
    /// Anemometer rising edge. Returns `false` if dropped by debounce.
    pub fn wind_pulse(&self, now_ms: u64) -> bool {
        self.wind.record_pulse(now_ms)
    }

    /// Rain bucket rising edge.
    pub fn rain_tip(&self) {
        self.rain.record_tip();
    }
}

#[derive(Debug)]
pub struct WeatherStation {
    units: Units,
    wind: Arc<WindPulseCounter>,
    rain: Arc<RainPulseCounter>,
    samples: Mutex<SampleWindow>,
    published: Mutex<WeatherSnapshot>,
}

impl WeatherStation {
    pub fn new(units: Units) -> Self {
        Self {
            units,
            wind: Arc::new(WindPulseCounter::new()),
            rain: Arc::new(RainPulseCounter::new()),
            samples: Mutex::new(SampleWindow::new()),
            published: Mutex::new(WeatherSnapshot::empty(units)),
        }
    }

    pub fn units(&self) -> Units {
        self.units
    }

    pub fn pulse_inputs(&self) -> PulseInputs {
        PulseInputs {
            wind: Arc::clone(&self.wind),
            rain: Arc::clone(&self.rain),
        }
    }

    pub fn record_wind_pulse(&self, now_ms: u64) -> bool {
        self.wind.record_pulse(now_ms)
    }

    pub fn record_rain_tip(&self) {
        self.rain.record_tip();
    }

    // ==================== Fine Cadence ====================

    /// Read the vane and the probe once and fold both into the window.
    pub fn sample<S: WeatherSensors + ?Sized>(&self, sensors: &mut S) {
        let direction = sensors.read_direction();
        let temperature = sensors.read_temperature();
        let mut samples = lock(&self.samples);
        samples.record_direction(direction);
        samples.record_temperature(temperature);
    }

    pub fn record_direction_sample(&self, raw: u16) {
        lock(&self.samples).record_direction(raw);
    }

    pub fn record_temperature_sample(&self, reading: Result<Celsius, SensorError>) -> bool {
        lock(&self.samples).record_temperature(reading)
    }

    // ==================== Coarse Cadence ====================

    /// Peak speed since the last window close, in display units.
    pub fn current_gust(&self) -> f64 {
        two_decimals(self.wind.peek().gust().to(self.units.wind_speed))
    }

    /// Close the current window of length `elapsed` and publish.
    ///
    /// Takes and resets the wind pulses, the gust, the rain rate accumulator
    /// and both sample accumulators. Directions and temperatures with no
    /// samples in the window keep their previous published value.
    ///
    /// # Panics
    /// If `elapsed` is zero.
    pub fn close_window(&self, elapsed: Duration, observed_at: DateTime<Utc>) -> WeatherSnapshot {
        assert!(!elapsed.is_zero(), "window closed with zero elapsed time");

        let wind = self.wind.take_window();
        let window_tips = self.rain.take_window_tips();
        let averages = lock(&self.samples).take();

        // the daily read and the published write share one critical section
        // with reset_daily_rain, so a reset can't land between them
        let mut published = lock(&self.published);
        let daily_tips = self.rain.daily_tips();

        let units = self.units;
        let speed = two_decimals(average_speed(wind.pulses, elapsed).to(units.wind_speed));
        let gust = two_decimals(wind.gust().to(units.wind_speed));
        let rate = two_decimals(
            hourly_rate(Millimeters::from_tips(window_tips), elapsed).to(units.rain),
        );
        let count = two_decimals(Millimeters::from_tips(daily_tips).to(units.rain));

        published.observed_at = Some(observed_at);
        published.wind.speed = speed;
        published.wind.gust = gust;
        published.rain.rate = rate;
        published.rain.count = count;
        if let Some(direction) = averages.direction {
            published.wind.direction = direction;
            published.wind.angle = direction.angle();
        }
        if let Some(celsius) = averages.temperature {
            published.temperature = Some(two_decimals(celsius.to(units.temperature)));
        }

        debug!(
            "Closed {:.1}s window: {} wind pulses, {} rain tips, direction {}",
            elapsed.as_secs_f64(),
            wind.pulses,
            window_tips,
            published.wind.direction
        );

        published.clone()
    }

    // ==================== Daily Boundary ====================

    /// Zero the cumulative rain count. The rate accumulator is not touched.
    pub fn reset_daily_rain(&self) {
        let mut published = lock(&self.published);
        let tips = self.rain.reset_daily();
        published.rain.count = 0.0;
        drop(published);
        info!("Daily rain reset after {} tips", tips);
    }

    /// The last published record.
    pub fn snapshot(&self) -> WeatherSnapshot {
        lock(&self.published).clone()
    }
}

/// The guarded data are plain accumulators that stay consistent even if a
/// holder panicked, so a poisoned lock is recovered rather than propagated.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
