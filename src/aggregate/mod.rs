//! Assigning values to grid cells.
//!
//! [`CellAggregator`] averages the samples inside each cell and, depending on its
//! [`Fallback`], either takes the nearest sample for empty cells or leaves them
//! absent for [`fill_gaps`] to complete from neighbouring cells.

pub mod aggregator;
pub mod gapfill;
pub mod summary;
pub mod utility;

pub use aggregator::{CellAggregator, Fallback};
pub use gapfill::{GapFillReport, fill_gaps};
pub use summary::AggregationSummary;

use serde::Serialize;

/// How a cell obtained its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValueSource {
    /// Mean of the samples strictly inside the cell.
    Samples { count: usize },
    /// Score of the single nearest sample.
    NearestSample,
    /// Mean of touching cells that already had a value.
    Adjacency { neighbors: usize },
    /// Value of the cell with the nearest centroid.
    NearestCell,
    Absent,
}

impl ValueSource {
    pub fn label(&self) -> &'static str {
        match self {
            ValueSource::Samples { .. } => "samples",
            ValueSource::NearestSample => "nearest_sample",
            ValueSource::Adjacency { .. } => "adjacency",
            ValueSource::NearestCell => "nearest_cell",
            ValueSource::Absent => "absent",
        }
    }
}

/// Value of one grid cell. Once set, a value is never replaced.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CellValue {
    pub cell_id: usize,
    pub value: Option<f64>,
    pub source: ValueSource,
}

impl CellValue {
    pub fn determined(cell_id: usize, value: f64, source: ValueSource) -> Self {
        Self {
            cell_id,
            value: Some(value),
            source,
        }
    }

    pub fn absent(cell_id: usize) -> Self {
        Self {
            cell_id,
            value: None,
            source: ValueSource::Absent,
        }
    }

    pub fn is_determined(&self) -> bool {
        self.value.is_some()
    }
}
