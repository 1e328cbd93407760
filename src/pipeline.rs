//! End-to-end run: boundary → grid → sample index → cell values → optional gap fill.
//!
//! The result is plain data; drawing it is left to whoever consumes
//! [`PipelineOutput::rendered`].

use serde::Serialize;
use tracing::info;

use crate::aggregate::{
    AggregationSummary, CellAggregator, CellValue, Fallback, GapFillReport, ValueSource, fill_gaps,
};
use crate::boundary::Boundary;
use crate::error::{GridError, Result};
use crate::geometry::CellGeometry;
use crate::grid::{CellStore, GridBuilder, GridCell};
use crate::index::SampleIndex;
use crate::projection::GridSpacing;
use crate::samples::Sample;

/// A cell geometry with its final value, ready for a rendering stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedCell {
    pub cell_id: usize,
    pub geometry: CellGeometry,
    pub value: f64,
    pub source: ValueSource,
}

#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub cells: Vec<GridCell>,
    /// One entry per cell, in cell order.
    pub values: Vec<CellValue>,
    pub gap_fill: Option<GapFillReport>,
    pub summary: AggregationSummary,
}

impl PipelineOutput {
    /// Determined cells paired with their geometry, in cell order.
    pub fn rendered(&self) -> Vec<RenderedCell> {
        self.cells
            .iter()
            .zip(&self.values)
            .filter_map(|(cell, value)| {
                value.value.map(|v| RenderedCell {
                    cell_id: cell.id,
                    geometry: cell.geometry.clone(),
                    value: v,
                    source: value.source,
                })
            })
            .collect()
    }
}

/// Grid settings plus the builder (and thus cache) they run against.
#[derive(Debug)]
pub struct Pipeline<S> {
    builder: GridBuilder<S>,
    spacing: GridSpacing,
    fallback: Fallback,
    force_recompute: bool,
}

impl<S: CellStore> Pipeline<S> {
    pub fn new(store: S, spacing: GridSpacing, fallback: Fallback) -> Self {
        Self {
            builder: GridBuilder::new(store),
            spacing,
            fallback,
            force_recompute: false,
        }
    }

    pub fn force_recompute(mut self, force: bool) -> Self {
        self.force_recompute = force;
        self
    }

    pub fn builder(&self) -> &GridBuilder<S> {
        &self.builder
    }

    /// Builds or loads the clipped grid.
    pub fn grid(&mut self, boundary: &Boundary) -> Result<Vec<GridCell>> {
        self.builder
            .build(boundary, self.spacing, self.force_recompute)
    }

    /// Runs every stage. With [`Fallback::DeferredFill`] the absent cells are gap
    /// filled, so every returned value is determined either way.
    ///
    /// # Errors
    ///
    /// [`GridError::NoSamples`] when no sample has coordinates; also propagates
    /// spacing and gap-fill errors.
    #[tracing::instrument(skip_all, fields(spacing = %self.spacing.cache_key(), fallback = ?self.fallback))]
    pub fn run<R, F>(
        &mut self,
        boundary: &Boundary,
        samples: &[Sample<R>],
        score_fn: F,
    ) -> Result<PipelineOutput>
    where
        F: Fn(&R) -> f64,
    {
        let index = SampleIndex::build(samples);
        if index.is_empty() {
            return Err(GridError::NoSamples);
        }

        let cells = self.grid(boundary)?;
        let aggregator = CellAggregator::new(self.spacing.projected()?, self.fallback);
        let mut values = aggregator.aggregate(&cells, &index, samples, score_fn)?;

        let gap_fill = match self.fallback {
            Fallback::NearestSample => None,
            Fallback::DeferredFill => Some(fill_gaps(&cells, &mut values)?),
        };

        let summary = AggregationSummary::from_values(&values);
        info!(
            cells = summary.cells,
            from_samples = summary.from_samples,
            from_nearest_sample = summary.from_nearest_sample,
            from_adjacency = summary.from_adjacency,
            from_nearest_cell = summary.from_nearest_cell,
            "Pipeline complete"
        );

        Ok(PipelineOutput {
            cells,
            values,
            gap_fill,
            summary,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::square;
    use crate::grid::MemoryCellStore;

    fn square_boundary() -> Boundary {
        Boundary::from_parts(vec![square(0.0, 0.0, 60.0)]).unwrap()
    }

    #[test]
    fn test_run_nearest_sample() {
        let samples = vec![Sample::new("center", 30.0, 30.0, 40.0)];
        let mut pipeline = Pipeline::new(
            MemoryCellStore::new(),
            GridSpacing::meters(20.0),
            Fallback::NearestSample,
        );
        let output = pipeline.run(&square_boundary(), &samples, |v: &f64| *v).unwrap();
        assert_eq!(output.cells.len(), 9);
        assert!(output.gap_fill.is_none());
        assert_eq!(output.summary.from_samples, 1);
        assert_eq!(output.summary.from_nearest_sample, 8);
        assert_eq!(output.rendered().len(), 9);
    }

    #[test]
    fn test_run_deferred_fill_completes_every_cell() {
        let samples = vec![Sample::new("corner", 10.0, 10.0, 5.0)];
        let mut pipeline = Pipeline::new(
            MemoryCellStore::new(),
            GridSpacing::meters(20.0),
            Fallback::DeferredFill,
        );
        let output = pipeline.run(&square_boundary(), &samples, |v: &f64| *v).unwrap();
        assert!(output.values.iter().all(|v| v.value == Some(5.0)));
        let report = output.gap_fill.unwrap();
        // Cells 1 (above), 3 (right) and 4 (diagonal) touch the seeded corner cell.
        assert_eq!(report.adjacency, 3);
        assert_eq!(report.nearest, 5);
        assert_eq!(output.summary.absent, 0);
    }

    #[test]
    fn test_run_without_samples() {
        let samples: Vec<Sample<f64>> = vec![];
        let mut pipeline = Pipeline::new(
            MemoryCellStore::new(),
            GridSpacing::meters(20.0),
            Fallback::NearestSample,
        );
        let result = pipeline.run(&square_boundary(), &samples, |v: &f64| *v);
        assert!(matches!(result, Err(GridError::NoSamples)));
        // Nothing was built or cached.
        assert!(pipeline.builder().store().is_empty());
    }
}
