//! Output formatting and persistence for aggregation results.
//!
//! Supports pretty-printing, JSON serialization, CSV append, and per-cell exports.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, info};

use crate::aggregate::{AggregationSummary, CellValue};
use crate::grid::GridCell;
use crate::pipeline::RenderedCell;
use csv::WriterBuilder;
use std::fs::{File, OpenOptions};
use std::io::BufWriter;
use std::path::Path;

/// One row of the per-cell CSV export.
#[derive(Debug, Serialize)]
struct CellRow {
    cell_id: usize,
    centroid_x: f64,
    centroid_y: f64,
    area: f64,
    value: Option<f64>,
    source: &'static str,
}

/// Logs a summary using Rust's debug pretty-print format.
pub fn print_pretty(summary: &AggregationSummary) {
    debug!("{:#?}", summary);
}

/// Logs a summary as pretty-printed JSON.
pub fn print_json(summary: &AggregationSummary) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(summary)?);
    Ok(())
}

/// Appends an [`AggregationSummary`] as a row to a CSV file.
///
/// Creates the file with headers if it does not already exist.
pub fn append_summary(path: &str, summary: &AggregationSummary) -> Result<()> {
    let file_exists = Path::new(path).exists();
    debug!(path, file_exists, "Appending CSV record");

    let file = OpenOptions::new().append(true).create(true).open(path)?;

    let mut writer = WriterBuilder::new()
        .has_headers(!file_exists) // IMPORTANT when appending
        .from_writer(file);

    writer.serialize(summary)?;
    writer.flush()?;

    Ok(())
}

/// Writes one row per cell: id, centroid, area, value and how it was obtained.
///
/// Absent values leave the `value` column empty. Overwrites `path`.
pub fn write_cells_csv(path: &str, cells: &[GridCell], values: &[CellValue]) -> Result<()> {
    let mut writer = WriterBuilder::new()
        .from_path(path)
        .with_context(|| format!("failed to create {path}"))?;

    for (cell, value) in cells.iter().zip(values) {
        let (centroid_x, centroid_y) = cell.centroid();
        writer.serialize(CellRow {
            cell_id: cell.id,
            centroid_x,
            centroid_y,
            area: cell.geometry.area(),
            value: value.value,
            source: value.source.label(),
        })?;
    }
    writer.flush()?;

    info!(path, rows = cells.len(), "Cell values written");
    Ok(())
}

/// Writes determined cells with their geometry as a JSON array. Overwrites `path`.
pub fn write_cells_json(path: &str, cells: &[RenderedCell]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("failed to create {path}"))?;
    serde_json::to_writer(BufWriter::new(file), cells)?;
    info!(path, cells = cells.len(), "Cell geometries written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::ValueSource;
    use crate::geometry::CellGeometry;
    use std::env;
    use std::fs;

    fn temp_path(name: &str) -> String {
        format!("{}/{}", env::temp_dir().display(), name)
    }

    fn sample_values() -> Vec<CellValue> {
        vec![
            CellValue::determined(0, 12.5, ValueSource::Samples { count: 3 }),
            CellValue::absent(1),
        ]
    }

    fn sample_cells() -> Vec<GridCell> {
        vec![
            GridCell::new(0, 0, 0, CellGeometry::square(0.0, 0.0, 20.0)).unwrap(),
            GridCell::new(1, 1, 0, CellGeometry::square(20.0, 0.0, 20.0)).unwrap(),
        ]
    }

    #[test]
    fn test_print_pretty_does_not_panic() {
        let summary = AggregationSummary::from_values(&sample_values());
        print_pretty(&summary);
    }

    #[test]
    fn test_print_json_does_not_panic() {
        let summary = AggregationSummary::from_values(&sample_values());
        print_json(&summary).unwrap();
    }

    #[test]
    fn test_append_summary_writes_header_once() {
        let path = temp_path("comfort_grid_test_summary.csv");
        let _ = fs::remove_file(&path);

        let summary = AggregationSummary::from_values(&sample_values());
        append_summary(&path, &summary).unwrap();
        append_summary(&path, &summary).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let header_count = content.lines().filter(|l| l.contains("generated_at")).count();
        assert_eq!(header_count, 1);
        // 1 header + 2 data rows
        assert_eq!(content.lines().count(), 3);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_write_cells_csv() {
        let path = temp_path("comfort_grid_test_cells.csv");
        write_cells_csv(&path, &sample_cells(), &sample_values()).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines[0], "cell_id,centroid_x,centroid_y,area,value,source");
        assert_eq!(lines[1], "0,10.0,10.0,400.0,12.5,samples");
        assert_eq!(lines[2], "1,30.0,10.0,400.0,,absent");

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_write_cells_json() {
        let path = temp_path("comfort_grid_test_cells.json");
        let rendered = vec![RenderedCell {
            cell_id: 0,
            geometry: CellGeometry::square(0.0, 0.0, 20.0),
            value: 12.5,
            source: ValueSource::NearestSample,
        }];
        write_cells_json(&path, &rendered).unwrap();

        let parsed: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed[0]["cell_id"], 0);
        assert_eq!(parsed[0]["value"], 12.5);
        assert_eq!(parsed[0]["source"]["kind"], "nearest_sample");

        fs::remove_file(&path).unwrap();
    }
}
