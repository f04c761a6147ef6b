//! Value objects for trip parameters.
//!
//! Each type validates on construction, so a held value is always valid.
//! Wire tolerance (legacy numeric trip types and cabin classes, comma
//! separated time windows) lives in the conversions here, keeping the
//! extraction layer free of per-field parsing rules.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::TripError;

/// IATA-style airport code: exactly three ASCII letters, stored uppercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AirportCode(String);

impl AirportCode {
    /// Parses and normalizes an airport code.
    pub fn new(value: impl AsRef<str>) -> Result<Self, TripError> {
        let trimmed = value.as_ref().trim();
        if trimmed.len() == 3 && trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
            Ok(Self(trimmed.to_ascii_uppercase()))
        } else {
            Err(TripError::InvalidAirportCode {
                value: value.as_ref().to_string(),
            })
        }
    }

    /// Returns the normalized code.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AirportCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for AirportCode {
    type Error = TripError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl FromStr for AirportCode {
    type Err = TripError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl From<AirportCode> for String {
    fn from(code: AirportCode) -> Self {
        code.0
    }
}

/// Whether the trip needs a return leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TripType {
    RoundTrip,
    OneWay,
}

impl TripType {
    /// Provider wire encoding: 1 = round trip, 2 = one way.
    pub fn provider_code(&self) -> u8 {
        match self {
            Self::RoundTrip => 1,
            Self::OneWay => 2,
        }
    }

    /// Accepts the legacy numeric encoding.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Self::RoundTrip),
            2 => Some(Self::OneWay),
            _ => None,
        }
    }

    /// Accepts common textual spellings.
    pub fn from_label(label: &str) -> Option<Self> {
        let normalized = label.trim().to_ascii_lowercase().replace(' ', "_").replace('-', "_");
        match normalized.as_str() {
            "round_trip" | "roundtrip" | "return" => Some(Self::RoundTrip),
            "one_way" | "oneway" => Some(Self::OneWay),
            _ => None,
        }
    }
}

impl fmt::Display for TripType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RoundTrip => f.write_str("round trip"),
            Self::OneWay => f.write_str("one way"),
        }
    }
}

/// Cabin class of travel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CabinClass {
    Economy,
    PremiumEconomy,
    Business,
    First,
}

impl CabinClass {
    /// Provider wire encoding: 1 = economy .. 4 = first.
    pub fn provider_code(&self) -> u8 {
        match self {
            Self::Economy => 1,
            Self::PremiumEconomy => 2,
            Self::Business => 3,
            Self::First => 4,
        }
    }

    /// Accepts the legacy numeric encoding.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Self::Economy),
            2 => Some(Self::PremiumEconomy),
            3 => Some(Self::Business),
            4 => Some(Self::First),
            _ => None,
        }
    }

    /// Accepts common textual spellings.
    pub fn from_label(label: &str) -> Option<Self> {
        let normalized = label.trim().to_ascii_lowercase().replace(' ', "_").replace('-', "_");
        match normalized.as_str() {
            "economy" | "coach" => Some(Self::Economy),
            "premium_economy" | "premium" => Some(Self::PremiumEconomy),
            "business" => Some(Self::Business),
            "first" => Some(Self::First),
            _ => None,
        }
    }
}

impl fmt::Display for CabinClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Economy => f.write_str("economy"),
            Self::PremiumEconomy => f.write_str("premium economy"),
            Self::Business => f.write_str("business"),
            Self::First => f.write_str("first"),
        }
    }
}

/// Hour-of-day bounds for a flight leg.
///
/// Holds exactly 2 values (departure window) or 4 values (departure and
/// arrival windows), each in 0..=23, preserving the provider's positional
/// meaning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<i64>", into = "Vec<i64>")]
pub struct TimeWindow {
    bounds: Vec<u8>,
}

impl TimeWindow {
    /// Validates and builds a time window from hour values.
    pub fn new(bounds: Vec<i64>) -> Result<Self, TripError> {
        if bounds.len() != 2 && bounds.len() != 4 {
            return Err(TripError::InvalidTimeWindowLength {
                count: bounds.len(),
            });
        }
        for &value in &bounds {
            if !(0..=23).contains(&value) {
                return Err(TripError::TimeWindowHourOutOfRange { value });
            }
        }
        Ok(Self {
            bounds: bounds.into_iter().map(|v| v as u8).collect(),
        })
    }

    /// Parses the legacy comma-separated form, e.g. `"4,18,3,19"`.
    pub fn parse_csv(value: &str) -> Result<Self, TripError> {
        let parsed: Result<Vec<i64>, _> =
            value.split(',').map(|part| part.trim().parse::<i64>()).collect();
        match parsed {
            Ok(bounds) => Self::new(bounds),
            Err(_) => Err(TripError::InvalidTimeWindowLength { count: 0 }),
        }
    }

    /// Returns the hour bounds in provider order.
    pub fn bounds(&self) -> &[u8] {
        &self.bounds
    }

    /// Provider wire encoding: comma-separated hours.
    pub fn to_param(&self) -> String {
        self.bounds
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl TryFrom<Vec<i64>> for TimeWindow {
    type Error = TripError;

    fn try_from(value: Vec<i64>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TimeWindow> for Vec<i64> {
    fn from(window: TimeWindow) -> Self {
        window.bounds.into_iter().map(i64::from).collect()
    }
}
