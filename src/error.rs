//! Error conditions raised by the grid core.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, GridError>;

#[derive(Debug, Error)]
pub enum GridError {
    /// The boundary file could not be read at all.
    #[error("boundary source {path} could not be read")]
    BoundaryRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The boundary file was read but is not a valid boundary document.
    #[error("boundary source {path} is not a valid boundary file")]
    BoundaryParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("boundary has no area")]
    EmptyBoundary,

    #[error("grid spacing must be positive and finite, got {0}")]
    InvalidSpacing(f64),

    #[error("latitude {0} is outside [-90, 90]")]
    LatitudeOutOfRange(f64),

    /// Aggregation was asked to run without a single usable sample.
    #[error("no samples available")]
    NoSamples,

    /// Gap filling needs at least one cell that already carries a value.
    #[error("no determined cells to fill from")]
    NoDeterminedCells,
}
