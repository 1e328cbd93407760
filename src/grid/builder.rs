//! Lattice generation and boundary clipping.

use geo::{BooleanOps, Contains, Intersects, MultiPolygon};
use tracing::{debug, info, warn};

use super::{CellStore, GridCell};
use crate::boundary::Boundary;
use crate::error::Result;
use crate::geometry::{CellGeometry, square};
use crate::projection::GridSpacing;

/// Clipped cells keeping less than this share of their square are dropped.
pub const MIN_AREA_RATIO: f64 = 0.1;

/// Builds clipped grids, consulting its own cell store first.
#[derive(Debug)]
pub struct GridBuilder<S> {
    store: S,
}

impl<S: CellStore> GridBuilder<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns the clipped cells for `spacing`.
    ///
    /// A cached entry is returned unchanged unless `force` is set. Unreadable cache
    /// entries and failed rewrites are logged and otherwise ignored.
    ///
    /// # Errors
    ///
    /// Only an invalid spacing is an error.
    #[tracing::instrument(skip(self, boundary), fields(key = %spacing.cache_key()))]
    pub fn build(
        &mut self,
        boundary: &Boundary,
        spacing: GridSpacing,
        force: bool,
    ) -> Result<Vec<GridCell>> {
        let side = spacing.projected()?;
        let key = spacing.cache_key();

        if force {
            info!("Forced grid recompute, skipping cache");
        } else {
            match self.store.load(&key) {
                Ok(Some(cells)) => {
                    info!(cells = cells.len(), "Grid loaded from cache");
                    return Ok(cells);
                }
                Ok(None) => debug!("No cached grid for spacing"),
                Err(e) => warn!(error = %e, "Grid cache unreadable, recomputing"),
            }
        }

        let cells = generate_cells(boundary, side);
        info!(cells = cells.len(), side, "Grid generated");

        if let Err(e) = self.store.store(&key, &cells) {
            warn!(error = %e, "Failed to write grid cache");
        }

        Ok(cells)
    }
}

/// Lays squares of side `side` from the boundary's minimum corner, clips each to
/// the boundary and keeps those retaining at least [`MIN_AREA_RATIO`] of their area.
///
/// Columns are visited left to right and, within a column, rows bottom to top.
/// Ids are assigned in that order to the kept cells only. Squares lying wholly
/// inside the boundary are kept unclipped.
pub fn generate_cells(boundary: &Boundary, side: f64) -> Vec<GridCell> {
    let bounds = boundary.bounds();
    let columns = steps(bounds.width(), side);
    let rows = steps(bounds.height(), side);
    let min_area = MIN_AREA_RATIO * side * side;

    let mut cells = Vec::new();
    let mut disjoint = 0usize;
    let mut interior = 0usize;
    let mut slivers = 0usize;

    for i in 0..columns {
        let x = bounds.min_x + i as f64 * side;
        for j in 0..rows {
            let y = bounds.min_y + j as f64 * side;
            let lattice = square(x, y, side);

            if !boundary.shape().intersects(&lattice) {
                disjoint += 1;
                continue;
            }

            // Overlay output is snapped to an integer grid, so only squares that
            // cross the boundary go through it; inner squares stay exact.
            let geometry = if boundary.shape().contains(&lattice) {
                interior += 1;
                Some(CellGeometry::Polygon(lattice))
            } else {
                let clipped = boundary
                    .shape()
                    .intersection(&MultiPolygon::new(vec![lattice]));
                CellGeometry::from_multi(clipped).filter(|geometry| geometry.area() >= min_area)
            };

            match geometry.and_then(|geometry| GridCell::new(cells.len(), i, j, geometry)) {
                Some(cell) => cells.push(cell),
                None => slivers += 1,
            }
        }
    }

    debug!(
        columns,
        rows,
        kept = cells.len(),
        interior,
        disjoint,
        slivers,
        "Lattice clipped to boundary"
    );
    cells
}

/// `ceil(extent / side) + 1`, so a trailing partial row or column is covered.
fn steps(extent: f64, side: f64) -> usize {
    (extent / side).ceil() as usize + 1
}
