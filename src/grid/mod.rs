//! Regular square grid clipped to a region boundary.
//!
//! [`GridBuilder`] lays a lattice over the boundary's bounding box, clips each
//! square to the boundary and drops slivers. Results are cached per spacing
//! through a [`CellStore`].

pub mod builder;
pub mod cache;

pub use builder::{GridBuilder, MIN_AREA_RATIO, generate_cells};
pub use cache::{CACHE_SCHEMA_VERSION, CacheEntry, CellStore, FileCellStore, MemoryCellStore};

use serde::{Deserialize, Serialize};

use crate::geometry::{Bounds, CellGeometry};

/// Neighbouring cells may be this far apart, relative to the larger cell extent,
/// and still count as touching. Clipped edges are not bit-exact.
pub const ADJACENCY_TOLERANCE: f64 = 1e-4;

/// One clipped grid cell. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridCell {
    pub id: usize,
    /// Lattice column of the square this cell was cut from.
    pub col: usize,
    /// Lattice row of the square this cell was cut from.
    pub row: usize,
    pub geometry: CellGeometry,
    pub bounds: Bounds,
}

impl GridCell {
    /// Builds a cell, deriving bounds from the geometry.
    ///
    /// Returns `None` for a geometry without coordinates.
    pub fn new(id: usize, col: usize, row: usize, geometry: CellGeometry) -> Option<Self> {
        let bounds = geometry.bounds()?;
        Some(Self {
            id,
            col,
            row,
            geometry,
            bounds,
        })
    }

    /// Bounding-box midpoint, the reference point for all distance queries.
    pub fn centroid(&self) -> (f64, f64) {
        self.bounds.center()
    }

    pub fn lattice(&self) -> (usize, usize) {
        (self.col, self.row)
    }

    /// The up to eight lattice positions around this cell.
    pub fn lattice_neighbors(&self) -> impl Iterator<Item = (usize, usize)> {
        let (col, row) = self.lattice();
        (-1isize..=1)
            .flat_map(|dc| (-1isize..=1).map(move |dr| (dc, dr)))
            .filter(|&offset| offset != (0, 0))
            .filter_map(move |(dc, dr)| {
                Some((col.checked_add_signed(dc)?, row.checked_add_signed(dr)?))
            })
    }

    /// Whether the two cells come from neighbouring lattice squares and their
    /// geometries meet, up to [`ADJACENCY_TOLERANCE`].
    pub fn is_adjacent(&self, other: &GridCell) -> bool {
        let lattice_step = self.col.abs_diff(other.col).max(self.row.abs_diff(other.row));
        if lattice_step != 1 {
            return false;
        }
        let extent = self.extent().max(other.extent());
        self.geometry
            .touches_within(&other.geometry, ADJACENCY_TOLERANCE * extent)
    }

    fn extent(&self) -> f64 {
        self.bounds.width().max(self.bounds.height())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(id: usize, col: usize, row: usize, geometry: CellGeometry) -> GridCell {
        GridCell::new(id, col, row, geometry).unwrap()
    }

    #[test]
    fn test_lattice_neighbors() {
        let origin = cell(0, 0, 0, CellGeometry::square(0.0, 0.0, 1.0));
        let mut around: Vec<_> = origin.lattice_neighbors().collect();
        around.sort_unstable();
        assert_eq!(around, vec![(0, 1), (1, 0), (1, 1)]);

        let inner = cell(1, 3, 5, CellGeometry::square(3.0, 5.0, 1.0));
        assert_eq!(inner.lattice_neighbors().count(), 8);
        assert!(inner.lattice_neighbors().all(|pos| pos != (3, 5)));
    }

    #[test]
    fn test_adjacent_despite_rounded_edge() {
        let side = 32_186.8;
        let below = cell(0, 0, 0, CellGeometry::square(0.0, 0.0, side));
        // Edge a few millimetres short of the shared lattice line.
        let above = cell(
            1,
            0,
            1,
            CellGeometry::Polygon(crate::geometry::rectangle(Bounds::new(
                0.0,
                side + 0.003,
                side,
                2.0 * side,
            ))),
        );
        assert!(below.is_adjacent(&above));
        assert!(above.is_adjacent(&below));
    }

    #[test]
    fn test_not_adjacent() {
        let a = cell(0, 0, 0, CellGeometry::square(0.0, 0.0, 20.0));
        let far = cell(1, 2, 0, CellGeometry::square(40.0, 0.0, 20.0));
        assert!(!a.is_adjacent(&far));
        assert!(!a.is_adjacent(&a));

        // Lattice neighbours whose clipped pieces sit at opposite ends.
        let left_piece = cell(2, 0, 0, CellGeometry::square(0.0, 0.0, 5.0));
        let right_piece = cell(3, 1, 0, CellGeometry::square(35.0, 0.0, 5.0));
        assert!(!left_piece.is_adjacent(&right_piece));
    }
}
