//! Unit conversion for published weather values.
//!
//! Raw measurements travel through the engine as unit-tagged quantities
//! ([`Celsius`], [`Millimeters`], [`Kmh`]). The only way out of a tagged
//! quantity is `.to(display_unit)`, which returns a plain `f64` in the
//! configured display unit. Display values carry no tag, so they cannot be
//! fed back through a conversion a second time.

use serde::{Deserialize, Serialize};

use crate::direction::Sector;

/// Rainfall depth of a single bucket tip.
pub const RAIN_MM_PER_TIP: f64 = 0.2794;

/// Anemometer calibration: one pulse per second equals 2.4 km/h.
pub const ANEMOMETER_KMH_PER_HZ: f64 = 2.4;

/// Divisor taking km/h to mph.
pub const KMH_PER_MPH: f64 = 1.6093;

pub const MM_PER_INCH: f64 = 25.4;

pub const SECONDS_PER_HOUR: f64 = 3_600.0;

// ==================== Display Units ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureUnit {
    #[serde(alias = "c")]
    Celsius,
    #[serde(alias = "f")]
    Fahrenheit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeedUnit {
    Mph,
    #[serde(alias = "km/h")]
    Kmh,
}

impl SpeedUnit {
    /// Divisor applied to a km/h value to express it in this unit.
    pub fn divisor(self) -> f64 {
        match self {
            SpeedUnit::Kmh => 1.0,
            SpeedUnit::Mph => KMH_PER_MPH,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RainUnit {
    Mm,
    #[serde(alias = "in")]
    Inches,
}

/// Display units for every published field, fixed at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Units {
    pub temperature: TemperatureUnit,
    pub wind_speed: SpeedUnit,
    pub rain: RainUnit,
}

impl Default for Units {
    fn default() -> Self {
        Self {
            temperature: TemperatureUnit::Fahrenheit,
            wind_speed: SpeedUnit::Mph,
            rain: RainUnit::Inches,
        }
    }
}

// ==================== Tagged Quantities ====================

/// Temperature in the probe's native unit.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Celsius(pub f64);

impl Celsius {
    pub fn to(self, unit: TemperatureUnit) -> f64 {
        match unit {
            TemperatureUnit::Celsius => self.0,
            TemperatureUnit::Fahrenheit => celsius_to_fahrenheit(self.0),
        }
    }
}

/// Rainfall depth as measured by the tip bucket.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Millimeters(pub f64);

impl Millimeters {
    /// Depth of `tips` bucket tips.
    pub fn from_tips(tips: u32) -> Self {
        Self(f64::from(tips) * RAIN_MM_PER_TIP)
    }

    pub fn to(self, unit: RainUnit) -> f64 {
        match unit {
            RainUnit::Mm => self.0,
            RainUnit::Inches => millimeters_to_inches(self.0),
        }
    }
}

/// Wind speed in the anemometer's calibration unit.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Kmh(pub f64);

impl Kmh {
    pub fn to(self, unit: SpeedUnit) -> f64 {
        self.0 / unit.divisor()
    }
}

// ==================== Conversion Functions ====================

pub fn celsius_to_fahrenheit(celsius: f64) -> f64 {
    celsius * 1.8 + 32.0
}

pub fn millimeters_to_inches(mm: f64) -> f64 {
    mm / MM_PER_INCH
}

/// Round to two decimal places. Every published number passes through here.
pub fn two_decimals(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Compass angle for a sector label.
///
/// Unknown labels map to `0.0`. This is a fallback for free-form labels and
/// is unrelated to [`crate::direction::Direction::Unresolved`], whose angle is
/// absent rather than zero.
pub fn label_to_angle(label: &str) -> f64 {
    Sector::from_label(label).map_or(0.0, Sector::angle)
}
