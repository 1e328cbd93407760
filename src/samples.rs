//! Point samples and the station CSV they are read from.

use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::projection::AlbersEqualArea;
use crate::score::{ScoreKind, StationReading};

/// A measurement located in the projection plane.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sample<R> {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub reading: R,
}

impl<R> Sample<R> {
    pub fn new(id: impl Into<String>, x: f64, y: f64, reading: R) -> Self {
        Self {
            id: id.into(),
            x,
            y,
            reading,
        }
    }

    pub fn has_coordinates(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// One row of the station input file. Empty fields deserialize to `None`.
///
/// Header: `station_id,longitude,latitude,avg_daily_max_temperature,rainy_days`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StationRecord {
    pub station_id: String,
    pub longitude: Option<f64>,
    pub latitude: Option<f64>,
    pub avg_daily_max_temperature: Option<f64>,
    pub rainy_days: Option<f64>,
}

impl StationRecord {
    pub fn reading(&self) -> StationReading {
        StationReading {
            max_temperature_f: self.avg_daily_max_temperature,
            rainy_days: self.rainy_days,
        }
    }
}

/// Reads every station row from a CSV file.
pub fn load_stations(path: impl AsRef<Path>) -> Result<Vec<StationRecord>> {
    let path = path.as_ref();
    let file =
        File::open(path).with_context(|| format!("failed to open stations {}", path.display()))?;
    let mut rdr = csv::Reader::from_reader(file);

    let mut rows = Vec::new();
    for result in rdr.deserialize() {
        let record: StationRecord =
            result.with_context(|| format!("malformed station row in {}", path.display()))?;
        rows.push(record);
    }

    info!(path = %path.display(), stations = rows.len(), "Stations loaded");
    Ok(rows)
}

/// Projects the stations that carry what `score` needs.
///
/// Stations without usable coordinates are dropped silently; only the totals are logged.
pub fn project_stations(
    records: &[StationRecord],
    projection: &AlbersEqualArea,
    score: ScoreKind,
) -> Vec<Sample<StationReading>> {
    let mut missing_reading = 0usize;
    let mut missing_coordinates = 0usize;

    let samples: Vec<_> = records
        .iter()
        .filter_map(|record| {
            let reading = record.reading();
            if !score.accepts(&reading) {
                missing_reading += 1;
                return None;
            }
            let projected = match (record.longitude, record.latitude) {
                (Some(lon), Some(lat)) => projection.forward(lon, lat).ok(),
                _ => None,
            };
            match projected {
                Some((x, y)) if x.is_finite() && y.is_finite() => {
                    Some(Sample::new(record.station_id.clone(), x, y, reading))
                }
                _ => {
                    missing_coordinates += 1;
                    None
                }
            }
        })
        .collect();

    debug!(
        kept = samples.len(),
        missing_reading, missing_coordinates, "Stations projected"
    );
    samples
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::fs;

    fn temp_path(name: &str) -> String {
        format!("{}/{}", env::temp_dir().display(), name)
    }

    fn record(id: &str, lon: Option<f64>, lat: Option<f64>, temp: Option<f64>) -> StationRecord {
        StationRecord {
            station_id: id.to_string(),
            longitude: lon,
            latitude: lat,
            avg_daily_max_temperature: temp,
            rainy_days: Some(90.0),
        }
    }

    #[test]
    fn test_load_stations_with_empty_fields() {
        let path = temp_path("comfort_grid_test_stations.csv");
        fs::write(
            &path,
            "station_id,longitude,latitude,avg_daily_max_temperature,rainy_days\n\
             USW00094728,-73.97,40.78,62.5,122\n\
             USC00000001,,,70.0,\n",
        )
        .unwrap();

        let rows = load_stations(&path).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].avg_daily_max_temperature, Some(62.5));
        assert_eq!(rows[1].longitude, None);
        assert_eq!(rows[1].rainy_days, None);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_load_missing_file() {
        assert!(load_stations(temp_path("comfort_grid_no_such_stations.csv")).is_err());
    }

    #[test]
    fn test_project_drops_missing_coordinates_and_readings() {
        let records = vec![
            record("a", Some(-96.0), Some(23.0), Some(70.0)),
            record("b", None, Some(40.0), Some(70.0)),
            record("c", Some(-100.0), Some(95.0), Some(70.0)),
            record("d", Some(-90.0), Some(35.0), None),
        ];
        let samples = project_stations(&records, &AlbersEqualArea::conus(), ScoreKind::Temperature);
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].id, "a");
        assert!(samples[0].x.abs() < 1e-6 && samples[0].y.abs() < 1e-6);
    }

    #[test]
    fn test_has_coordinates() {
        assert!(Sample::new("a", 1.0, 2.0, ()).has_coordinates());
        assert!(!Sample::new("b", f64::NAN, 2.0, ()).has_coordinates());
    }
}
