//! Two-pass completion of cells left absent by aggregation.
//!
//! Pass 1 gives each absent cell the mean of the touching cells that had a value
//! before the pass started. Touching cells are looked up by lattice position and
//! confirmed on geometry, see [`GridCell::is_adjacent`]. Pass 2 gives every cell
//! still absent the value of the determined cell whose centroid is nearest.
//! Within a pass no cell sees another cell's fill, so the outcome does not
//! depend on iteration order.

use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, info};

use super::utility::mean;
use super::{CellValue, ValueSource};
use crate::error::{GridError, Result};
use crate::grid::GridCell;
use crate::index::KdTree;

/// Number of cells completed by each pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GapFillReport {
    pub adjacency: usize,
    pub nearest: usize,
}

/// Fills every absent entry of `values`.
///
/// `values[i]` must describe `cells[i]`. Determined values are never touched.
///
/// # Errors
///
/// Returns [`GridError::NoDeterminedCells`] if no value is determined on entry.
#[tracing::instrument(skip_all, fields(cells = cells.len()))]
pub fn fill_gaps(cells: &[GridCell], values: &mut [CellValue]) -> Result<GapFillReport> {
    debug_assert_eq!(cells.len(), values.len(), "one value per cell");

    let determined: Vec<usize> = (0..values.len())
        .filter(|&i| values[i].is_determined())
        .collect();
    if determined.is_empty() {
        return Err(GridError::NoDeterminedCells);
    }

    let adjacency = fill_from_neighbors(cells, values, &determined);
    let nearest = fill_from_nearest(cells, values)?;

    let report = GapFillReport { adjacency, nearest };
    info!(
        initially_determined = determined.len(),
        adjacency, nearest, "Gaps filled"
    );
    Ok(report)
}

/// Pass 1. Reads only the cells listed in `determined`.
fn fill_from_neighbors(cells: &[GridCell], values: &mut [CellValue], determined: &[usize]) -> usize {
    let by_lattice: HashMap<(usize, usize), usize> =
        determined.iter().map(|&i| (cells[i].lattice(), i)).collect();

    let fills: Vec<(usize, f64, usize)> = (0..values.len())
        .filter(|&i| !values[i].is_determined())
        .filter_map(|i| {
            let cell = &cells[i];
            let mut neighbors: Vec<usize> = cell
                .lattice_neighbors()
                .filter_map(|position| by_lattice.get(&position).copied())
                .filter(|&j| cell.is_adjacent(&cells[j]))
                .collect();
            if neighbors.is_empty() {
                return None;
            }
            neighbors.sort_unstable();
            let neighbor_values: Vec<f64> =
                neighbors.iter().filter_map(|&j| values[j].value).collect();
            Some((i, mean(&neighbor_values), neighbors.len()))
        })
        .collect();

    for &(i, value, neighbors) in &fills {
        values[i] = CellValue::determined(
            values[i].cell_id,
            value,
            ValueSource::Adjacency { neighbors },
        );
    }
    debug!(filled = fills.len(), "Adjacency pass complete");
    fills.len()
}

/// Pass 2. Reads every cell determined after pass 1.
fn fill_from_nearest(cells: &[GridCell], values: &mut [CellValue]) -> Result<usize> {
    let tree = KdTree::build((0..values.len()).filter(|&i| values[i].is_determined()).map(|i| {
        let (x, y) = cells[i].centroid();
        (i, x, y)
    }));

    let fills = (0..values.len())
        .filter(|&i| !values[i].is_determined())
        .map(|i| {
            let (x, y) = cells[i].centroid();
            let source = tree.nearest(x, y).ok_or(GridError::NoDeterminedCells)?;
            let value = values[source].value.ok_or(GridError::NoDeterminedCells)?;
            Ok((i, value))
        })
        .collect::<Result<Vec<_>>>()?;

    for &(i, value) in &fills {
        values[i] = CellValue::determined(values[i].cell_id, value, ValueSource::NearestCell);
    }
    debug!(filled = fills.len(), "Nearest-cell pass complete");
    Ok(fills.len())
}
