//! Seams between the aggregation engine and the outside world.
//!
//! This module provides traits for:
//! - `Clock`: wall-clock and monotonic time, mockable for deterministic tests
//! - `WeatherSensors`: the polled vane and temperature probe
//! - `SnapshotSink`: the downstream publication collaborator

use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use anyhow::Result;
use chrono::{DateTime, Local, Utc};

use crate::error::SensorError;
use crate::station::WeatherSnapshot;
use crate::units::Celsius;

// ==================== Clock Trait ====================

/// Trait for abstracting time access.
///
/// Wall-clock time drives the daily reset; the monotonic millisecond counter
/// drives debounce and window lengths. The two need not agree.
pub trait Clock: Send + Sync {
    /// Get the current time in UTC.
    fn now_utc(&self) -> DateTime<Utc>;

    /// Get the current time in the local timezone.
    fn now_local(&self) -> DateTime<Local>;

    /// Milliseconds since an arbitrary fixed origin. Never goes backwards.
    fn monotonic_ms(&self) -> u64;
}

/// System clock implementation using real time.
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn now_local(&self) -> DateTime<Local> {
        Local::now()
    }

    fn monotonic_ms(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

/// Mock clock for testing with controllable time.
#[derive(Debug, Clone)]
pub struct MockClock {
    utc_time: Arc<Mutex<DateTime<Utc>>>,
    monotonic_ms: Arc<Mutex<u64>>,
}

impl MockClock {
    /// Create a new mock clock set to the given UTC time, monotonic zero.
    pub fn new(time: DateTime<Utc>) -> Self {
        Self {
            utc_time: Arc::new(Mutex::new(time)),
            monotonic_ms: Arc::new(Mutex::new(0)),
        }
    }

    /// Set the wall clock. The monotonic counter is unaffected, as with an
    /// NTP step on real hardware.
    pub fn set_time(&self, time: DateTime<Utc>) {
        *self.utc_time.lock().unwrap() = time;
    }

    /// Advance both clocks by a duration.
    pub fn advance(&self, duration: chrono::Duration) {
        let mut time = self.utc_time.lock().unwrap();
        *time += duration;
        let mut mono = self.monotonic_ms.lock().unwrap();
        *mono += u64::try_from(duration.num_milliseconds()).unwrap_or(0);
    }

    /// Advance both clocks by whole milliseconds.
    pub fn advance_ms(&self, ms: u64) {
        self.advance(chrono::Duration::milliseconds(ms as i64));
    }
}

impl Clock for MockClock {
    fn now_utc(&self) -> DateTime<Utc> {
        *self.utc_time.lock().unwrap()
    }

    fn now_local(&self) -> DateTime<Local> {
        self.now_utc().with_timezone(&Local)
    }

    fn monotonic_ms(&self) -> u64 {
        *self.monotonic_ms.lock().unwrap()
    }
}

// ==================== Sensors Trait ====================

/// Polled sensors read at the fine cadence.
///
/// Reads are synchronous and may block: a one-wire probe conversion takes
/// around 750 ms. The scheduler calls them on tokio's blocking pool.
pub trait WeatherSensors: Send {
    /// Raw wind vane ADC reading.
    fn read_direction(&mut self) -> u16;

    /// Probe temperature in its native unit. May fail transiently.
    fn read_temperature(&mut self) -> Result<Celsius, SensorError>;
}

impl<S: WeatherSensors + ?Sized> WeatherSensors for Box<S> {
    fn read_direction(&mut self) -> u16 {
        (**self).read_direction()
    }

    fn read_temperature(&mut self) -> Result<Celsius, SensorError> {
        (**self).read_temperature()
    }
}

/// Scripted sensors for testing.
///
/// Temperature readings are served from a queue; once it runs dry the
/// fallback reading is repeated.
#[derive(Debug, Clone)]
pub struct MockSensors {
    direction: u16,
    temperatures: VecDeque<Result<f64, SensorError>>,
    fallback: Result<f64, SensorError>,
    reads: usize,
}

impl MockSensors {
    /// Sensors that always report `direction` and `temperature_c`.
    pub fn new(direction: u16, temperature_c: f64) -> Self {
        Self {
            direction,
            temperatures: VecDeque::new(),
            fallback: Ok(temperature_c),
            reads: 0,
        }
    }

    /// Sensors whose temperature probe always fails.
    pub fn failing(direction: u16) -> Self {
        Self {
            direction,
            temperatures: VecDeque::new(),
            fallback: Err(SensorError::ProbeMissing),
            reads: 0,
        }
    }

    pub fn set_direction(&mut self, direction: u16) {
        self.direction = direction;
    }

    /// Queue one temperature reading ahead of the fallback.
    pub fn push_temperature(&mut self, reading: Result<f64, SensorError>) {
        self.temperatures.push_back(reading);
    }

    /// Number of temperature reads served so far.
    pub fn reads(&self) -> usize {
        self.reads
    }
}

impl WeatherSensors for MockSensors {
    fn read_direction(&mut self) -> u16 {
        self.direction
    }

    fn read_temperature(&mut self) -> Result<Celsius, SensorError> {
        self.reads += 1;
        self.temperatures
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
            .map(Celsius)
    }
}

// ==================== Sink Trait ====================

/// Downstream consumer of the once-per-window snapshot.
///
/// Failures are reported to the caller and logged there; they never feed
/// back into aggregation.
pub trait SnapshotSink: Send + Sync {
    fn publish(&self, snapshot: &WeatherSnapshot) -> impl Future<Output = Result<()>> + Send;
}

/// Mock sink for testing that records every delivered snapshot.
#[derive(Debug, Clone, Default)]
pub struct MockSink {
    delivered: Arc<Mutex<Vec<WeatherSnapshot>>>,
    offline: Arc<AtomicBool>,
}

impl MockSink {
    /// Create a new mock sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent publishes fail, as if connectivity were lost.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Get all snapshots that have been delivered.
    pub fn delivered(&self) -> Vec<WeatherSnapshot> {
        self.delivered.lock().unwrap().clone()
    }

    /// Get the count of snapshots delivered.
    pub fn delivery_count(&self) -> usize {
        self.delivered.lock().unwrap().len()
    }
}

impl SnapshotSink for MockSink {
    async fn publish(&self, snapshot: &WeatherSnapshot) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            anyhow::bail!("sink offline");
        }
        self.delivered.lock().unwrap().push(snapshot.clone());
        Ok(())
    }
}
