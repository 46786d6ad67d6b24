//! Simulated hardware, so the daemon runs on a host without sensors.
//!
//! Everything here is deterministic: the vane walks round the compass, the
//! temperature follows a slow sine wave and every [`FAILED_READ_EVERY`]th
//! probe read fails. Pulse generators drive the same [`PulseInputs`] the
//! edge handlers would.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

use crate::direction::Sector;
use crate::error::SensorError;
use crate::station::PulseInputs;
use crate::traits::{Clock, WeatherSensors};
use crate::units::{ANEMOMETER_KMH_PER_HZ, Celsius};

/// One probe read in this many fails with a CRC error.
pub const FAILED_READ_EVERY: u64 = 17;

/// Vane samples spent in each sector before moving on.
const SAMPLES_PER_SECTOR: u64 = 12;

/// Relative spacing of successive simulated anemometer pulses. Averages to 1
/// so the mean speed matches the configured one; the short entry is the gust.
const PULSE_SPACING: [f64; 5] = [1.0, 1.1, 0.9, 1.2, 0.8];

#[derive(Debug, Clone)]
pub struct SimulatedSensors {
    base_celsius: f64,
    amplitude: f64,
    direction_reads: u64,
    temperature_reads: u64,
}

impl Default for SimulatedSensors {
    fn default() -> Self {
        Self::new(15.0, 5.0)
    }
}

impl SimulatedSensors {
    pub fn new(base_celsius: f64, amplitude: f64) -> Self {
        Self {
            base_celsius,
            amplitude,
            direction_reads: 0,
            temperature_reads: 0,
        }
    }
}

impl WeatherSensors for SimulatedSensors {
    fn read_direction(&mut self) -> u16 {
        let index = (self.direction_reads / SAMPLES_PER_SECTOR) as usize % Sector::ALL.len();
        self.direction_reads += 1;
        let range = Sector::ALL[index].adc_range();
        range.start + (range.end - range.start) / 2
    }

    fn read_temperature(&mut self) -> Result<Celsius, SensorError> {
        self.temperature_reads += 1;
        if self.temperature_reads % FAILED_READ_EVERY == 0 {
            return Err(SensorError::Crc);
        }
        let phase = self.temperature_reads as f64 * 0.01;
        Ok(Celsius(self.base_celsius + phase.sin() * self.amplitude))
    }
}

/// Mean pulse period for a wind speed; `None` for calm air.
pub fn pulse_period(wind_kmh: f64) -> Option<Duration> {
    if !(wind_kmh.is_finite() && wind_kmh > 0.0) {
        return None;
    }
    let hz = wind_kmh / ANEMOMETER_KMH_PER_HZ;
    Duration::try_from_secs_f64(1.0 / hz).ok()
}

/// Feed anemometer pulses at `wind_kmh`, timestamped from `clock`.
/// Returns `None` when the speed is zero.
pub fn spawn_wind_pulses<C: Clock + 'static>(
    inputs: PulseInputs,
    clock: Arc<C>,
    wind_kmh: f64,
) -> Option<JoinHandle<()>> {
    let period = pulse_period(wind_kmh)?;
    debug!("Simulating wind at {} km/h, pulse every {:?}", wind_kmh, period);
    Some(tokio::spawn(async move {
        for factor in PULSE_SPACING.iter().cycle() {
            tokio::time::sleep(period.mul_f64(*factor)).await;
            inputs.wind_pulse(clock.monotonic_ms());
        }
    }))
}

/// Tip the rain bucket every `interval`. Returns `None` for a zero interval.
pub fn spawn_rain_tips(inputs: PulseInputs, interval: Duration) -> Option<JoinHandle<()>> {
    if interval.is_zero() {
        return None;
    }
    debug!("Simulating rain, one tip every {:?}", interval);
    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
        loop {
            ticker.tick().await;
            inputs.rain_tip();
        }
    }))
}
