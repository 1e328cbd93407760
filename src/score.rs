//! Comfort scores computed from station readings.
//!
//! These are plain functions of a reading; the aggregator receives one of them
//! as its `score_fn`.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Temperature at which the temperature score peaks, in °F.
pub const IDEAL_TEMPERATURE_F: f64 = 72.0;

/// Score awarded at the ideal temperature.
pub const MAX_TEMPERATURE_SCORE: f64 = 40.0;

/// Raw measurements of one station.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StationReading {
    /// Average daily maximum temperature, °F.
    pub max_temperature_f: Option<f64>,
    /// Sum over the year of the monthly average number of rainy days.
    pub rainy_days: Option<f64>,
}

/// Which score a run maps readings to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, ValueEnum)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum ScoreKind {
    Temperature,
    Precipitation,
    #[default]
    Total,
}

impl ScoreKind {
    /// Whether the reading carries every measurement this score needs.
    pub fn accepts(self, reading: &StationReading) -> bool {
        match self {
            ScoreKind::Temperature => reading.max_temperature_f.is_some(),
            ScoreKind::Precipitation => reading.rainy_days.is_some(),
            ScoreKind::Total => reading.max_temperature_f.is_some() && reading.rainy_days.is_some(),
        }
    }

    pub fn score(self, reading: &StationReading) -> f64 {
        match self {
            ScoreKind::Temperature => temperature_score(reading.max_temperature_f),
            ScoreKind::Precipitation => precipitation_score(reading.rainy_days),
            ScoreKind::Total => total_score(reading),
        }
    }
}

/// 0 at 32°F rising linearly to 40 at 72°F, then falling twice as fast to 0 at 92°F.
pub fn temperature_score(temp_f: Option<f64>) -> f64 {
    let Some(t) = temp_f else {
        return 0.0;
    };
    if t <= IDEAL_TEMPERATURE_F {
        if t >= 32.0 {
            (t - 32.0) * MAX_TEMPERATURE_SCORE / 40.0
        } else {
            0.0
        }
    } else if t <= 92.0 {
        MAX_TEMPERATURE_SCORE - (t - IDEAL_TEMPERATURE_F) * MAX_TEMPERATURE_SCORE / 20.0
    } else {
        0.0
    }
}

/// Ten points per rainy day, normalised by 30.
pub fn precipitation_score(rainy_days: Option<f64>) -> f64 {
    rainy_days.map_or(0.0, |days| days * 10.0 / 30.0)
}

pub fn total_score(reading: &StationReading) -> f64 {
    temperature_score(reading.max_temperature_f) + precipitation_score(reading.rainy_days)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temperature_score_boundaries() {
        assert_eq!(temperature_score(Some(72.0)), 40.0);
        assert_eq!(temperature_score(Some(32.0)), 0.0);
        assert_eq!(temperature_score(Some(20.0)), 0.0);
        assert_eq!(temperature_score(Some(52.0)), 20.0);
        assert_eq!(temperature_score(Some(82.0)), 20.0);
        assert_eq!(temperature_score(Some(92.0)), 0.0);
        assert_eq!(temperature_score(Some(100.0)), 0.0);
        assert_eq!(temperature_score(None), 0.0);
    }

    #[test]
    fn test_precipitation_score() {
        assert_eq!(precipitation_score(Some(30.0)), 10.0);
        assert_eq!(precipitation_score(Some(0.0)), 0.0);
        assert_eq!(precipitation_score(None), 0.0);
    }

    #[test]
    fn test_total_score() {
        let reading = StationReading {
            max_temperature_f: Some(72.0),
            rainy_days: Some(60.0),
        };
        assert_eq!(total_score(&reading), 60.0);
        assert_eq!(ScoreKind::Total.score(&reading), 60.0);
    }

    #[test]
    fn test_accepts() {
        let temp_only = StationReading {
            max_temperature_f: Some(70.0),
            rainy_days: None,
        };
        assert!(ScoreKind::Temperature.accepts(&temp_only));
        assert!(!ScoreKind::Precipitation.accepts(&temp_only));
        assert!(!ScoreKind::Total.accepts(&temp_only));
    }
}
