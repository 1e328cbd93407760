use chrono::{DateTime, Utc};
use serde::Serialize;

use super::utility::ValueStats;
use super::{CellValue, ValueSource};

/// Overview of one aggregation run, logged and written beside the cell values.
#[derive(Debug, Clone, Serialize)]
pub struct AggregationSummary {
    pub generated_at: DateTime<Utc>,
    pub cells: usize,
    pub from_samples: usize,
    pub from_nearest_sample: usize,
    pub from_adjacency: usize,
    pub from_nearest_cell: usize,
    pub absent: usize,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: f64,
    pub stddev: f64,
}

impl AggregationSummary {
    pub fn from_values(values: &[CellValue]) -> Self {
        let mut summary = AggregationSummary {
            generated_at: Utc::now(),
            cells: values.len(),
            from_samples: 0,
            from_nearest_sample: 0,
            from_adjacency: 0,
            from_nearest_cell: 0,
            absent: 0,
            min: None,
            max: None,
            mean: 0.0,
            stddev: 0.0,
        };

        for value in values {
            match value.source {
                ValueSource::Samples { .. } => summary.from_samples += 1,
                ValueSource::NearestSample => summary.from_nearest_sample += 1,
                ValueSource::Adjacency { .. } => summary.from_adjacency += 1,
                ValueSource::NearestCell => summary.from_nearest_cell += 1,
                ValueSource::Absent => summary.absent += 1,
            }
        }

        let stats = ValueStats::from_values(values.iter().filter_map(|v| v.value));
        summary.min = stats.min;
        summary.max = stats.max;
        summary.mean = stats.mean;
        summary.stddev = stats.stddev;
        summary
    }
}
