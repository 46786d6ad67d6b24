//! Fine-cadence sample accumulators for the wind vane and temperature probe.

use std::mem;

use tracing::warn;

use crate::direction::Direction;
use crate::error::SensorError;
use crate::traits::WeatherSensors;
use crate::units::Celsius;

/// Running sum and count. Holds no samples, so memory stays constant
/// whatever the window length.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunningMean {
    sum: f64,
    count: u32,
}

impl RunningMean {
    pub fn push(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    /// `None` when empty.
    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / f64::from(self.count))
    }

    /// Mean of the accumulated samples; leaves the accumulator empty.
    pub fn take(&mut self) -> Option<f64> {
        mem::take(self).mean()
    }
}

/// Averages taken at a window boundary. `None` means no sample was accepted
/// during the window and the published value should be held.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SampleAverages {
    pub direction: Option<Direction>,
    pub temperature: Option<Celsius>,
}

#[derive(Debug, Default)]
pub struct SampleWindow {
    direction: RunningMean,
    temperature: RunningMean,
}

impl SampleWindow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_direction(&mut self, raw: u16) {
        self.direction.push(f64::from(raw));
    }

    /// Fold a probe reading in. A failed read records nothing and returns
    /// `false`.
    pub fn record_temperature(&mut self, reading: Result<Celsius, SensorError>) -> bool {
        match reading {
            Ok(Celsius(value)) if value.is_finite() => {
                self.temperature.push(value);
                true
            }
            Ok(Celsius(value)) => {
                warn!("Discarding non-finite temperature reading: {}", value);
                false
            }
            Err(e) => {
                warn!("Temperature read failed, no sample this tick: {}", e);
                false
            }
        }
    }

    /// One fine-cadence tick: read both polled sensors.
    pub fn sample<S: WeatherSensors + ?Sized>(&mut self, sensors: &mut S) {
        self.record_direction(sensors.read_direction());
        self.record_temperature(sensors.read_temperature());
    }

    pub fn direction_samples(&self) -> u32 {
        self.direction.count()
    }

    pub fn temperature_samples(&self) -> u32 {
        self.temperature.count()
    }

    /// Average both accumulators and reset them to empty.
    ///
    /// The mean vane reading is rounded to the nearest ADC count and then
    /// resolved through the calibration table; it is never interpolated.
    pub fn take(&mut self) -> SampleAverages {
        SampleAverages {
            direction: self
                .direction
                .take()
                .map(|mean| Direction::from_adc(mean.round() as u16)),
            temperature: self.temperature.take().map(Celsius),
        }
    }
}
