use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use config::{Config, ConfigBuilder, Environment, File, builder::DefaultState};
use serde::Deserialize;

use crate::error::ConfigError;
use crate::units::Units;

/// Longest accepted coarse window: one day.
pub const MAX_WINDOW_SECS: u64 = 86_400;

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct StationConfig {
    pub units: Units,
    pub windows: WindowsConfig,
    pub publish: PublishConfig,
    pub simulation: SimulationConfig,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct WindowsConfig {
    /// Fine cadence: seconds between direction/temperature samples.
    pub sample_interval_secs: u64,
    /// Coarse window length, in fine-cadence samples.
    pub samples_per_update: u32,
}

impl Default for WindowsConfig {
    fn default() -> Self {
        Self {
            sample_interval_secs: 5,
            samples_per_update: 60,
        }
    }
}

impl WindowsConfig {
    pub fn sample_interval(&self) -> Duration {
        Duration::from_secs(self.sample_interval_secs)
    }

    /// Coarse window length. Only meaningful on a validated config, where
    /// the product is known not to overflow.
    pub fn window(&self) -> Duration {
        self.sample_interval() * self.samples_per_update
    }

    /// Coarse windows per hour, as a float because the window need not
    /// divide the hour.
    pub fn updates_per_hour(&self) -> f64 {
        3_600.0 / self.window().as_secs_f64()
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct PublishConfig {
    /// HTTP endpoint receiving snapshots as JSON. Log-only when unset.
    pub endpoint: Option<String>,
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            request_timeout_secs: 30,
            connect_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct SimulationConfig {
    /// Mean simulated wind speed.
    pub wind_kmh: f64,
    /// Seconds between simulated bucket tips; 0 disables rain.
    pub rain_tip_interval_secs: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            wind_kmh: 12.0,
            rain_tip_interval_secs: 0,
        }
    }
}

impl StationConfig {
    /// Load from the usual layers: defaults, `./config.toml`, the user
    /// config directory, then `WX__*` environment variables.
    pub fn load() -> Result<Self> {
        // Load .env file (silently ignore if not present)
        let _ = dotenvy::dotenv();

        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("weather-station");

        let builder = defaults()?
            // 2. Local config file (optional, lowest priority)
            .add_source(File::from(PathBuf::from("config.toml")).required(false))
            // 3. User config directory (optional, overrides local)
            .add_source(File::from(config_dir.join("config.toml")).required(false))
            // 4. Environment variables (WX__UNITS__TEMPERATURE=celsius)
            .add_source(env_source());

        finish(builder)
    }

    /// Load defaults overlaid with one explicit file, then the environment.
    pub fn load_from(path: &Path) -> Result<Self> {
        let _ = dotenvy::dotenv();

        let builder = defaults()?
            .add_source(File::from(path.to_path_buf()).required(true))
            .add_source(env_source());

        finish(builder).with_context(|| format!("Failed to load {}", path.display()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.windows.sample_interval_secs == 0 {
            return Err(ConfigError::ZeroSampleInterval);
        }
        if self.windows.samples_per_update == 0 {
            return Err(ConfigError::ZeroSamplesPerUpdate);
        }
        self.windows
            .sample_interval_secs
            .checked_mul(u64::from(self.windows.samples_per_update))
            .filter(|&secs| secs <= MAX_WINDOW_SECS)
            .ok_or(ConfigError::WindowTooLong {
                max_secs: MAX_WINDOW_SECS,
            })?;
        if self.publish.request_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout {
                field: "request_timeout_secs",
            });
        }
        if self.publish.connect_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout {
                field: "connect_timeout_secs",
            });
        }
        let wind = self.simulation.wind_kmh;
        if !wind.is_finite() || wind < 0.0 {
            return Err(ConfigError::InvalidSimulatedWind(wind));
        }
        Ok(())
    }
}

fn defaults() -> Result<ConfigBuilder<DefaultState>> {
    let units = Units::default();
    let windows = WindowsConfig::default();
    let publish = PublishConfig::default();
    let simulation = SimulationConfig::default();

    Ok(Config::builder()
        // Units
        .set_default("units.temperature", enum_name(&units.temperature)?)?
        .set_default("units.wind_speed", enum_name(&units.wind_speed)?)?
        .set_default("units.rain", enum_name(&units.rain)?)?
        // Windows
        .set_default("windows.sample_interval_secs", windows.sample_interval_secs)?
        .set_default("windows.samples_per_update", windows.samples_per_update)?
        // Publish
        .set_default("publish.endpoint", None::<String>)?
        .set_default("publish.request_timeout_secs", publish.request_timeout_secs)?
        .set_default("publish.connect_timeout_secs", publish.connect_timeout_secs)?
        // Simulation
        .set_default("simulation.wind_kmh", simulation.wind_kmh)?
        .set_default(
            "simulation.rain_tip_interval_secs",
            simulation.rain_tip_interval_secs,
        )?)
}

fn env_source() -> Environment {
    Environment::with_prefix("WX").prefix_separator("__").separator("__")
}

fn finish(builder: ConfigBuilder<DefaultState>) -> Result<StationConfig> {
    let settings = builder.build().context("Failed to read configuration")?;
    settings
        .try_deserialize()
        .context("Failed to parse configuration")
}

/// The serialized name of a unit enum, so defaults stay in step with serde.
fn enum_name<T: serde::Serialize>(value: &T) -> Result<String> {
    match serde_json::to_value(value)? {
        serde_json::Value::String(name) => Ok(name),
        other => anyhow::bail!("unit did not serialize to a name: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::units::{RainUnit, SpeedUnit, TemperatureUnit};

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    fn default_config() -> StationConfig {
        StationConfig {
            units: Units::default(),
            windows: WindowsConfig::default(),
            publish: PublishConfig::default(),
            simulation: SimulationConfig::default(),
        }
    }

    // ==================== Default Value Tests ====================

    #[test]
    fn test_windows_config_defaults() {
        let config = WindowsConfig::default();
        assert_eq!(config.sample_interval_secs, 5);
        assert_eq!(config.samples_per_update, 60);
        assert_eq!(config.window(), Duration::from_secs(300));
        assert_eq!(config.updates_per_hour(), 12.0);
    }

    #[test]
    fn test_publish_config_defaults() {
        let config = PublishConfig::default();
        assert_eq!(config.endpoint, None);
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.connect_timeout_secs, 10);
    }

    #[test]
    fn test_simulation_config_defaults() {
        let config = SimulationConfig::default();
        assert_eq!(config.wind_kmh, 12.0);
        assert_eq!(config.rain_tip_interval_secs, 0);
    }

    #[test]
    fn test_updates_per_hour_for_uneven_window() {
        let config = WindowsConfig {
            sample_interval_secs: 7,
            samples_per_update: 100,
        };
        assert_eq!(config.window(), Duration::from_secs(700));
        assert!((config.updates_per_hour() - 3_600.0 / 700.0).abs() < 1e-12);
    }

    // ==================== File Loading Tests ====================

    #[test]
    fn test_load_from_empty_file_gives_defaults() {
        let file = write_config("");
        let config = StationConfig::load_from(file.path()).unwrap();
        let defaults = default_config();
        assert_eq!(config.units, defaults.units);
        assert_eq!(config.windows, defaults.windows);
        assert_eq!(config.publish, defaults.publish);
        assert_eq!(config.simulation.wind_kmh, 12.0);
    }

    #[test]
    fn test_load_from_overrides_sections() {
        let file = write_config(
            r#"
[units]
temperature = "celsius"
wind_speed = "kmh"
rain = "mm"

[windows]
sample_interval_secs = 10
samples_per_update = 30

[publish]
endpoint = "http://localhost:8080/weather"
"#,
        );
        let config = StationConfig::load_from(file.path()).unwrap();

        assert_eq!(config.units.temperature, TemperatureUnit::Celsius);
        assert_eq!(config.units.wind_speed, SpeedUnit::Kmh);
        assert_eq!(config.units.rain, RainUnit::Mm);
        assert_eq!(config.windows.window(), Duration::from_secs(300));
        assert_eq!(
            config.publish.endpoint.as_deref(),
            Some("http://localhost:8080/weather")
        );
        // untouched keys keep their defaults
        assert_eq!(config.publish.request_timeout_secs, 30);
        assert_eq!(config.simulation.wind_kmh, 12.0);
    }

    #[test]
    fn test_load_from_accepts_unit_aliases() {
        let file = write_config(
            r#"
[units]
temperature = "c"
wind_speed = "km/h"
rain = "in"
"#,
        );
        let config = StationConfig::load_from(file.path()).unwrap();
        assert_eq!(config.units.temperature, TemperatureUnit::Celsius);
        assert_eq!(config.units.wind_speed, SpeedUnit::Kmh);
        assert_eq!(config.units.rain, RainUnit::Inches);
    }

    #[test]
    fn test_load_from_rejects_unknown_unit() {
        let file = write_config("[units]\ntemperature = \"kelvin\"\n");
        assert!(StationConfig::load_from(file.path()).is_err());
    }

    #[test]
    fn test_load_from_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = StationConfig::load_from(&dir.path().join("absent.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_config_load_with_defaults() {
        let result = StationConfig::load();
        assert!(result.is_ok());
    }

    // ==================== Validation Tests ====================

    #[test]
    fn test_defaults_are_valid() {
        assert_eq!(default_config().validate(), Ok(()));
    }

    #[test]
    fn test_zero_cadence_is_rejected() {
        let mut config = default_config();
        config.windows.sample_interval_secs = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroSampleInterval));

        let mut config = default_config();
        config.windows.samples_per_update = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroSamplesPerUpdate));
    }

    #[test]
    fn test_overlong_window_is_rejected() {
        let too_long = Err(ConfigError::WindowTooLong {
            max_secs: MAX_WINDOW_SECS,
        });

        // the product overflows u64
        let mut config = default_config();
        config.windows.sample_interval_secs = u64::MAX / 2;
        config.windows.samples_per_update = 3;
        assert_eq!(config.validate(), too_long);

        let mut config = default_config();
        config.windows.sample_interval_secs = 3_600;
        config.windows.samples_per_update = 25;
        assert_eq!(config.validate(), too_long);

        // exactly one day is still accepted
        config.windows.samples_per_update = 24;
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.windows.window(), Duration::from_secs(MAX_WINDOW_SECS));
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        let mut config = default_config();
        config.publish.connect_timeout_secs = 0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::ZeroTimeout {
                field: "connect_timeout_secs"
            })
        );
    }

    #[test]
    fn test_negative_simulated_wind_is_rejected() {
        let mut config = default_config();
        config.simulation.wind_kmh = -1.0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidSimulatedWind(-1.0))
        );
    }

    // ==================== Environment Variable Override Tests ====================
    // Only keys that no other test asserts on, so parallel tests do not race.

    #[test]
    fn test_env_var_overrides_simulated_rain() {
        let file = write_config("");
        let key = "WX__SIMULATION__RAIN_TIP_INTERVAL_SECS";

        // SAFETY: no other test reads this variable
        unsafe {
            std::env::set_var(key, "90");
        }
        let config = StationConfig::load_from(file.path());
        unsafe {
            std::env::remove_var(key);
        }

        assert_eq!(config.unwrap().simulation.rain_tip_interval_secs, 90);
    }
}
