use std::f64::consts::SQRT_2;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::utility::mean;
use super::{CellValue, ValueSource};
use crate::error::{GridError, Result};
use crate::grid::GridCell;
use crate::index::SampleIndex;
use crate::samples::Sample;

/// What a cell without contained samples receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, ValueEnum)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum Fallback {
    /// The score of the nearest sample anywhere, however far.
    #[default]
    NearestSample,
    /// Nothing; the cell stays absent until gap filling.
    DeferredFill,
}

/// Per-cell sample averaging over a fixed grid spacing.
#[derive(Debug, Clone, Copy)]
pub struct CellAggregator {
    spacing: f64,
    fallback: Fallback,
}

impl CellAggregator {
    /// `spacing` is the lattice side in projection units.
    pub fn new(spacing: f64, fallback: Fallback) -> Self {
        Self { spacing, fallback }
    }

    pub fn fallback(&self) -> Fallback {
        self.fallback
    }

    /// Half-diagonal of a lattice square; no point of a cell is farther than this
    /// from its bounding-box midpoint.
    pub fn search_radius(&self) -> f64 {
        SQRT_2 * (self.spacing / 2.0)
    }

    /// Computes one value per cell, in cell order.
    ///
    /// `index` must have been built from `samples`. Cells are independent of one
    /// another; neither cells nor samples are modified.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::NoSamples`] when the index holds no sample.
    #[tracing::instrument(skip_all, fields(cells = cells.len(), samples = index.len(), fallback = ?self.fallback))]
    pub fn aggregate<R, F>(
        &self,
        cells: &[GridCell],
        index: &SampleIndex,
        samples: &[Sample<R>],
        score_fn: F,
    ) -> Result<Vec<CellValue>>
    where
        F: Fn(&R) -> f64,
    {
        if index.is_empty() {
            return Err(GridError::NoSamples);
        }

        let values = cells
            .iter()
            .map(|cell| self.aggregate_cell(cell, index, samples, &score_fn))
            .collect::<Result<Vec<_>>>()?;

        let with_samples = values
            .iter()
            .filter(|v| matches!(v.source, ValueSource::Samples { .. }))
            .count();
        info!(
            with_samples,
            without_samples = values.len() - with_samples,
            "Cells aggregated"
        );
        Ok(values)
    }

    fn aggregate_cell<R, F>(
        &self,
        cell: &GridCell,
        index: &SampleIndex,
        samples: &[Sample<R>],
        score_fn: &F,
    ) -> Result<CellValue>
    where
        F: Fn(&R) -> f64,
    {
        let center = cell.centroid();

        let scores: Vec<f64> = index
            .radius_query(center, self.search_radius())
            .into_iter()
            .map(|i| &samples[i])
            .filter(|sample| cell.geometry.contains_point(sample.x, sample.y))
            .map(|sample| score_fn(&sample.reading))
            .collect();

        if !scores.is_empty() {
            return Ok(CellValue::determined(
                cell.id,
                mean(&scores),
                ValueSource::Samples {
                    count: scores.len(),
                },
            ));
        }

        match self.fallback {
            Fallback::NearestSample => {
                let nearest = index.nearest(center).ok_or(GridError::NoSamples)?;
                Ok(CellValue::determined(
                    cell.id,
                    score_fn(&samples[nearest].reading),
                    ValueSource::NearestSample,
                ))
            }
            Fallback::DeferredFill => Ok(CellValue::absent(cell.id)),
        }
    }
}
