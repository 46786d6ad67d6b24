use thiserror::Error;

/// Failure reading a polled sensor. Swallowed at the sampling layer: a failed
/// read means "no sample this tick".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SensorError {
    #[error("temperature probe not found on the bus")]
    ProbeMissing,
    #[error("CRC mismatch in probe scratchpad")]
    Crc,
    #[error("sensor bus error: {0}")]
    Bus(String),
}

/// Invalid startup configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("windows.sample_interval_secs must be greater than zero")]
    ZeroSampleInterval,
    #[error("windows.samples_per_update must be greater than zero")]
    ZeroSamplesPerUpdate,
    #[error("window of sample_interval_secs x samples_per_update must not exceed {max_secs}s")]
    WindowTooLong { max_secs: u64 },
    #[error("publish.{field} must be greater than zero")]
    ZeroTimeout { field: &'static str },
    #[error("simulation.wind_kmh must be finite and non-negative, got {0}")]
    InvalidSimulatedWind(f64),
}
