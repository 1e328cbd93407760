//! Region boundary in the equal-area projection.

use std::path::Path;

use geo::{Area, BooleanOps, BoundingRect, Coord, MapCoords, MultiPolygon, Polygon};
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{GridError, Result};
use crate::geometry::Bounds;
use crate::projection::AlbersEqualArea;

/// Coordinate system the parts of a boundary file are written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryCrs {
    /// Longitude/latitude degrees; projected on load.
    #[default]
    Geographic,
    /// Already in EPSG:5070 metres.
    Projected,
}

/// On-disk boundary document.
///
/// ```json
/// {
///   "crs": "geographic",
///   "parts": [
///     { "exterior": [{"x": -104.05, "y": 41.0}, ...], "interiors": [] }
///   ]
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct BoundaryFile {
    #[serde(default)]
    pub crs: BoundaryCrs,
    pub parts: Vec<Polygon<f64>>,
}

/// The union of all region parts, in projection units. Never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct Boundary {
    shape: MultiPolygon<f64>,
    bounds: Bounds,
}

impl Boundary {
    /// Unions `parts` into a single boundary.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::EmptyBoundary`] when the union has no area.
    pub fn from_parts(parts: Vec<Polygon<f64>>) -> Result<Self> {
        let part_count = parts.len();
        let shape = parts
            .into_iter()
            .fold(MultiPolygon::new(vec![]), |acc, part| {
                acc.union(&MultiPolygon::new(vec![part]))
            });
        debug!(part_count, polygons = shape.0.len(), "Boundary parts unioned");
        Self::new(shape)
    }

    /// Wraps an already-unioned shape.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::EmptyBoundary`] when the shape has no area.
    pub fn new(shape: MultiPolygon<f64>) -> Result<Self> {
        if shape.unsigned_area() <= 0.0 {
            return Err(GridError::EmptyBoundary);
        }
        let rect = shape.bounding_rect().ok_or(GridError::EmptyBoundary)?;
        let bounds = Bounds::new(rect.min().x, rect.min().y, rect.max().x, rect.max().y);
        Ok(Self { shape, bounds })
    }

    /// Projects a document and unions its parts.
    ///
    /// # Errors
    ///
    /// Fails on out-of-range latitudes or an empty union.
    pub fn from_file(file: BoundaryFile, projection: &AlbersEqualArea) -> Result<Self> {
        let parts = match file.crs {
            BoundaryCrs::Projected => file.parts,
            BoundaryCrs::Geographic => file
                .parts
                .iter()
                .map(|part| project_polygon(part, projection))
                .collect::<Result<Vec<_>>>()?,
        };
        Self::from_parts(parts)
    }

    /// Reads and projects a boundary document from disk.
    ///
    /// # Errors
    ///
    /// A missing or unreadable file is [`GridError::BoundaryRead`]; malformed JSON is
    /// [`GridError::BoundaryParse`]. Both are fatal to the caller.
    #[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>, projection: &AlbersEqualArea) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| GridError::BoundaryRead {
            path: path.to_path_buf(),
            source,
        })?;
        let file: BoundaryFile =
            serde_json::from_str(&content).map_err(|source| GridError::BoundaryParse {
                path: path.to_path_buf(),
                source,
            })?;
        let boundary = Self::from_file(file, projection)?;
        info!(area = boundary.area(), "Boundary loaded");
        Ok(boundary)
    }

    pub fn shape(&self) -> &MultiPolygon<f64> {
        &self.shape
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn area(&self) -> f64 {
        self.shape.unsigned_area()
    }
}

fn project_polygon(polygon: &Polygon<f64>, projection: &AlbersEqualArea) -> Result<Polygon<f64>> {
    polygon.try_map_coords(|c| {
        let (x, y) = projection.forward(c.x, c.y)?;
        Ok::<_, GridError>(Coord { x, y })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::square;
    use std::env;
    use std::fs;

    fn temp_path(name: &str) -> String {
        format!("{}/{}", env::temp_dir().display(), name)
    }

    #[test]
    fn test_union_of_adjacent_parts() {
        let boundary =
            Boundary::from_parts(vec![square(0.0, 0.0, 10.0), square(10.0, 0.0, 10.0)]).unwrap();
        assert!((boundary.area() - 200.0).abs() < 1e-9);
        assert_eq!(boundary.bounds(), Bounds::new(0.0, 0.0, 20.0, 10.0));
    }

    #[test]
    fn test_overlapping_parts_are_not_double_counted() {
        let boundary =
            Boundary::from_parts(vec![square(0.0, 0.0, 10.0), square(5.0, 0.0, 10.0)]).unwrap();
        assert!((boundary.area() - 150.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_parts_rejected() {
        let result = Boundary::from_parts(vec![]);
        assert!(matches!(result, Err(GridError::EmptyBoundary)));
    }

    #[test]
    fn test_load_missing_file_is_read_error() {
        let result = Boundary::load(
            temp_path("comfort_grid_no_such_boundary.json"),
            &AlbersEqualArea::conus(),
        );
        assert!(matches!(result, Err(GridError::BoundaryRead { .. })));
    }

    #[test]
    fn test_load_malformed_file_is_parse_error() {
        let path = temp_path("comfort_grid_bad_boundary.json");
        fs::write(&path, "{ not json").unwrap();
        let result = Boundary::load(&path, &AlbersEqualArea::conus());
        assert!(matches!(result, Err(GridError::BoundaryParse { .. })));
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_load_projected_file() {
        let path = temp_path("comfort_grid_projected_boundary.json");
        let doc = r#"{
            "crs": "projected",
            "parts": [{
                "exterior": [
                    {"x": 0.0, "y": 0.0}, {"x": 60.0, "y": 0.0},
                    {"x": 60.0, "y": 60.0}, {"x": 0.0, "y": 60.0},
                    {"x": 0.0, "y": 0.0}
                ],
                "interiors": []
            }]
        }"#;
        fs::write(&path, doc).unwrap();
        let boundary = Boundary::load(&path, &AlbersEqualArea::conus()).unwrap();
        assert!((boundary.area() - 3600.0).abs() < 1e-9);
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_geographic_parts_are_projected() {
        let file = BoundaryFile {
            crs: BoundaryCrs::Geographic,
            parts: vec![square(-97.0, 38.0, 1.0)],
        };
        let boundary = Boundary::from_file(file, &AlbersEqualArea::conus()).unwrap();
        // Roughly 87 km by 111 km at this latitude.
        let area_km2 = boundary.area() / 1.0e6;
        assert!(area_km2 > 8_000.0 && area_km2 < 11_000.0);
    }
}
