//! Weather Station Library
//!
//! The aggregation engine of a small weather station: pulse counting for the
//! anemometer and rain gauge, fine-cadence sampling of the wind vane and
//! temperature probe, and the windowed averaging, unit conversion and resets
//! that turn them into a published [`WeatherSnapshot`].

pub mod config;
pub mod direction;
pub mod error;
pub mod publish;
pub mod rain;
pub mod sampling;
pub mod schedule;
pub mod scheduler;
pub mod sim;
pub mod station;
pub mod traits;
pub mod units;
pub mod wind;

// Re-export commonly used types
pub use config::StationConfig;
pub use direction::{Direction, Sector};
pub use error::{ConfigError, SensorError};
pub use publish::{AnySink, HttpSink, LogSink};
pub use scheduler::{Cadence, StationTasks, spawn_station};
pub use station::{PulseInputs, WeatherSnapshot, WeatherStation};
pub use traits::{
    Clock, MockClock, MockSensors, MockSink, SnapshotSink, SystemClock, WeatherSensors,
};
pub use units::{Celsius, Kmh, Millimeters, RainUnit, SpeedUnit, TemperatureUnit, Units};
