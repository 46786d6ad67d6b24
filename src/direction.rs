//! Wind vane calibration: raw ADC reading to compass sector.
//!
//! The vane is a resistor ladder read through the ADC. The range table below
//! is a calibration artifact measured on the station hardware and is kept
//! exactly as measured. Its ordering does not follow the compass and some
//! ranges are much wider than their neighbours; do not "fix" it.

use std::fmt;
use std::ops::Range;

use serde::{Serialize, Serializer};

/// Lowest raw reading covered by the calibration table.
pub const ADC_MIN: u16 = 123;

/// One past the highest raw reading covered by the calibration table.
pub const ADC_MAX: u16 = 3800;

/// One of the 16 compass sectors the vane resolves to, declared clockwise
/// from north.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sector {
    N,
    NNE,
    NE,
    ENE,
    E,
    ESE,
    SE,
    SSE,
    S,
    SSW,
    SW,
    WSW,
    W,
    WNW,
    NW,
    NNW,
}

/// Contiguous, non-overlapping `[start, end)` ADC ranges in ascending order.
const CALIBRATION: [(u16, u16, Sector); 16] = [
    (123, 132, Sector::ENE),
    (132, 165, Sector::E),
    (165, 242, Sector::SSE),
    (242, 297, Sector::SE),
    (297, 397, Sector::ESE),
    (397, 709, Sector::S),
    (709, 927, Sector::NE),
    (927, 1165, Sector::NNE),
    (1165, 1458, Sector::WSW),
    (1458, 1520, Sector::SSW),
    (1520, 1695, Sector::SW),
    (1695, 2100, Sector::NNW),
    (2100, 2480, Sector::N),
    (2480, 2863, Sector::WNW),
    (2863, 3403, Sector::NW),
    (3403, 3800, Sector::W),
];

impl Sector {
    pub const ALL: [Sector; 16] = [
        Sector::N,
        Sector::NNE,
        Sector::NE,
        Sector::ENE,
        Sector::E,
        Sector::ESE,
        Sector::SE,
        Sector::SSE,
        Sector::S,
        Sector::SSW,
        Sector::SW,
        Sector::WSW,
        Sector::W,
        Sector::WNW,
        Sector::NW,
        Sector::NNW,
    ];

    /// Label as published, e.g. `"N/NE"`.
    pub fn label(self) -> &'static str {
        match self {
            Sector::N => "N",
            Sector::NNE => "N/NE",
            Sector::NE => "NE",
            Sector::ENE => "E/NE",
            Sector::E => "E",
            Sector::ESE => "E/SE",
            Sector::SE => "SE",
            Sector::SSE => "S/SE",
            Sector::S => "S",
            Sector::SSW => "S/SW",
            Sector::SW => "SW",
            Sector::WSW => "W/SW",
            Sector::W => "W",
            Sector::WNW => "W/NW",
            Sector::NW => "NW",
            Sector::NNW => "N/NW",
        }
    }

    /// Compass angle in degrees, 22.5° per sector clockwise from north.
    pub fn angle(self) -> f64 {
        f64::from(self as u8) * 22.5
    }

    pub fn from_label(label: &str) -> Option<Sector> {
        Sector::ALL.into_iter().find(|s| s.label() == label)
    }

    /// Raw ADC readings that resolve to this sector.
    pub fn adc_range(self) -> Range<u16> {
        CALIBRATION
            .iter()
            .find(|(_, _, sector)| *sector == self)
            .map_or(0..0, |(start, end, _)| *start..*end)
    }
}

impl fmt::Display for Sector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Resolved wind direction, or an explicit marker for readings outside the
/// calibration table. Never interpolated between sectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    Resolved(Sector),
    #[default]
    Unresolved,
}

impl Direction {
    pub const UNRESOLVED_LABEL: &'static str = "unresolved";

    /// Map a raw ADC reading through the calibration table.
    pub fn from_adc(reading: u16) -> Self {
        CALIBRATION
            .iter()
            .find(|(start, end, _)| (*start..*end).contains(&reading))
            .map_or(Direction::Unresolved, |(_, _, sector)| {
                Direction::Resolved(*sector)
            })
    }

    pub fn sector(self) -> Option<Sector> {
        match self {
            Direction::Resolved(sector) => Some(sector),
            Direction::Unresolved => None,
        }
    }

    pub fn label(self) -> &'static str {
        self.sector().map_or(Self::UNRESOLVED_LABEL, Sector::label)
    }

    /// Angle in degrees; `None` when unresolved.
    pub fn angle(self) -> Option<f64> {
        self.sector().map(Sector::angle)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for Direction {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    // ==================== Calibration Table ====================

    #[test]
    fn test_table_is_contiguous_and_covers_domain() {
        assert_eq!(CALIBRATION[0].0, ADC_MIN);
        assert_eq!(CALIBRATION[15].1, ADC_MAX);
        for pair in CALIBRATION.windows(2) {
            assert_eq!(pair[0].1, pair[1].0, "gap or overlap at {}", pair[0].1);
        }
    }

    #[test]
    fn test_every_sector_appears_once() {
        let sectors: HashSet<Sector> = CALIBRATION.iter().map(|(_, _, s)| *s).collect();
        assert_eq!(sectors.len(), 16);
    }

    #[test]
    fn test_adc_range_round_trips() {
        for sector in Sector::ALL {
            let range = sector.adc_range();
            assert!(!range.is_empty());
            assert_eq!(Direction::from_adc(range.start), Direction::Resolved(sector));
            assert_eq!(Direction::from_adc(range.end - 1), Direction::Resolved(sector));
        }
        assert_eq!(Sector::S.adc_range(), 397..709);
    }

    #[test]
    fn test_range_boundaries() {
        assert_eq!(Direction::from_adc(123), Direction::Resolved(Sector::ENE));
        assert_eq!(Direction::from_adc(131), Direction::Resolved(Sector::ENE));
        assert_eq!(Direction::from_adc(132), Direction::Resolved(Sector::E));
        assert_eq!(Direction::from_adc(709), Direction::Resolved(Sector::NE));
        assert_eq!(Direction::from_adc(2100), Direction::Resolved(Sector::N));
        assert_eq!(Direction::from_adc(3799), Direction::Resolved(Sector::W));
    }

    #[test]
    fn test_wide_south_range_is_preserved() {
        assert_eq!(Direction::from_adc(397), Direction::Resolved(Sector::S));
        assert_eq!(Direction::from_adc(708), Direction::Resolved(Sector::S));
    }

    #[test]
    fn test_out_of_domain_is_unresolved() {
        assert_eq!(Direction::from_adc(0), Direction::Unresolved);
        assert_eq!(Direction::from_adc(122), Direction::Unresolved);
        assert_eq!(Direction::from_adc(3800), Direction::Unresolved);
        assert_eq!(Direction::from_adc(u16::MAX), Direction::Unresolved);
    }

    // ==================== Labels and Angles ====================

    #[test]
    fn test_angles_step_by_22_5() {
        assert_eq!(Sector::N.angle(), 0.0);
        assert_eq!(Sector::NNE.angle(), 22.5);
        assert_eq!(Sector::E.angle(), 90.0);
        assert_eq!(Sector::S.angle(), 180.0);
        assert_eq!(Sector::W.angle(), 270.0);
        assert_eq!(Sector::NNW.angle(), 337.5);
    }

    #[test]
    fn test_label_roundtrip() {
        for sector in Sector::ALL {
            assert_eq!(Sector::from_label(sector.label()), Some(sector));
        }
    }

    #[test]
    fn test_unresolved_has_no_angle() {
        assert_eq!(Direction::Unresolved.angle(), None);
        assert_eq!(Direction::Unresolved.label(), "unresolved");
        assert_eq!(Direction::default(), Direction::Unresolved);
    }

    #[test]
    fn test_direction_serializes_as_label() {
        let json = serde_json::to_string(&Direction::Resolved(Sector::WSW)).unwrap();
        assert_eq!(json, r#""W/SW""#);
        let json = serde_json::to_string(&Direction::Unresolved).unwrap();
        assert_eq!(json, r#""unresolved""#);
    }

    mod proptest_tests {
        use proptest::prelude::*;

        use super::*;

        proptest! {
            #[test]
            fn in_domain_readings_hit_exactly_one_range(reading in ADC_MIN..ADC_MAX) {
                let hits = CALIBRATION
                    .iter()
                    .filter(|(start, end, _)| (*start..*end).contains(&reading))
                    .count();
                prop_assert_eq!(hits, 1);
                prop_assert!(Direction::from_adc(reading).sector().is_some());
            }

            #[test]
            fn out_of_domain_readings_are_unresolved(reading in ADC_MAX..=u16::MAX) {
                prop_assert_eq!(Direction::from_adc(reading), Direction::Unresolved);
            }

            #[test]
            fn angles_are_within_circle(index in 0usize..16) {
                let angle = Sector::ALL[index].angle();
                prop_assert!((0.0..360.0).contains(&angle));
            }
        }
    }
}
