//! Cell geometry shared by the grid builder, aggregator and gap filler.
//!
//! A clipped cell is either one simple polygon or several disjoint pieces
//! (a square cut by a bay or a river boundary). Both shapes are handled through
//! [`CellGeometry::polygons`], so callers never branch on the variant.

use geo::{
    Area, BoundingRect, Contains, Coord, Distance, Euclidean, Geometry, MultiPolygon, Point, Polygon,
};
use serde::{Deserialize, Serialize};

/// Axis-aligned bounds `(min_x, min_y, max_x, max_y)` in projection units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    pub const fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Midpoint of the box. Used as the cell "centroid" for every distance query.
    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }
}

/// Geometry of a clipped grid cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates", rename_all = "snake_case")]
pub enum CellGeometry {
    Polygon(Polygon<f64>),
    MultiPolygon(MultiPolygon<f64>),
}

impl CellGeometry {
    /// Collapses a boolean-op result into the simplest variant.
    ///
    /// Returns `None` when the result has no parts.
    pub fn from_multi(mut multi: MultiPolygon<f64>) -> Option<Self> {
        match multi.0.len() {
            0 => None,
            1 => multi.0.pop().map(CellGeometry::Polygon),
            _ => Some(CellGeometry::MultiPolygon(multi)),
        }
    }

    /// Axis-aligned square with its lower-left corner at `(x, y)`.
    pub fn square(x: f64, y: f64, side: f64) -> Self {
        CellGeometry::Polygon(square(x, y, side))
    }

    /// The constituent simple polygons, one for a polygon, all parts otherwise.
    pub fn polygons(&self) -> std::slice::Iter<'_, Polygon<f64>> {
        match self {
            CellGeometry::Polygon(p) => std::slice::from_ref(p).iter(),
            CellGeometry::MultiPolygon(mp) => mp.0.iter(),
        }
    }

    pub fn area(&self) -> f64 {
        self.polygons().map(|p| p.unsigned_area()).sum()
    }

    pub fn bounds(&self) -> Option<Bounds> {
        let rect = match self {
            CellGeometry::Polygon(p) => p.bounding_rect(),
            CellGeometry::MultiPolygon(mp) => mp.bounding_rect(),
        }?;
        Some(Bounds::new(rect.min().x, rect.min().y, rect.max().x, rect.max().y))
    }

    /// Exact containment: points on the boundary are not inside.
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        let point = Point::new(x, y);
        self.polygons().any(|p| p.contains(&point))
    }

    /// Shortest distance between the two geometries; 0 when they meet.
    pub fn distance(&self, other: &CellGeometry) -> f64 {
        Euclidean::distance(&self.to_geometry(), &other.to_geometry())
    }

    /// Whether the geometries come within `tolerance` of each other. For disjoint
    /// cells this is touching, allowing for edges moved slightly by clipping.
    pub fn touches_within(&self, other: &CellGeometry, tolerance: f64) -> bool {
        self.distance(other) <= tolerance
    }

    fn to_geometry(&self) -> Geometry<f64> {
        match self {
            CellGeometry::Polygon(p) => Geometry::Polygon(p.clone()),
            CellGeometry::MultiPolygon(mp) => Geometry::MultiPolygon(mp.clone()),
        }
    }
}

/// Counter-clockwise square polygon with its lower-left corner at `(x, y)`.
pub fn square(x: f64, y: f64, side: f64) -> Polygon<f64> {
    rectangle(Bounds::new(x, y, x + side, y + side))
}

/// Counter-clockwise rectangle polygon covering `bounds`.
pub fn rectangle(bounds: Bounds) -> Polygon<f64> {
    let Bounds {
        min_x,
        min_y,
        max_x,
        max_y,
    } = bounds;
    Polygon::new(
        vec![
            Coord { x: min_x, y: min_y },
            Coord { x: max_x, y: min_y },
            Coord { x: max_x, y: max_y },
            Coord { x: min_x, y: max_y },
            Coord { x: min_x, y: min_y },
        ]
        .into(),
        vec![],
    )
}
