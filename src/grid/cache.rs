//! Persistence of clipped grid cells, keyed by spacing.
//!
//! Entries are written whole and never expire; a caller that wants fresh cells
//! asks the builder to force a recompute, which overwrites the entry.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::GridCell;

/// Bumped whenever [`CacheEntry`] or [`GridCell`] changes shape.
pub const CACHE_SCHEMA_VERSION: u8 = 2;

/// Storage for clipped cell lists.
///
/// `load` returns `Ok(None)` when nothing is stored under `key` and an error when
/// something is stored but cannot be used.
pub trait CellStore {
    fn load(&self, key: &str) -> Result<Option<Vec<GridCell>>>;
    fn store(&mut self, key: &str, cells: &[GridCell]) -> Result<()>;
}

/// Serialized form of one cache entry.
#[derive(Debug, Serialize, Deserialize)]
pub struct CacheEntry {
    pub schema_version: u8,
    pub spacing_key: String,
    pub created_at: DateTime<Utc>,
    pub cells: Vec<GridCell>,
}

/// Gzip-compressed JSON files, one per spacing key, under a directory.
///
/// There is no locking: two processes building the same key at once may
/// overwrite each other's entry.
#[derive(Debug, Clone)]
pub struct FileCellStore {
    dir: PathBuf,
}

impl FileCellStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File holding the entry for `key`, e.g. `grid_20mi.json.gz`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("grid_{key}.json.gz"))
    }
}

impl CellStore for FileCellStore {
    fn load(&self, key: &str) -> Result<Option<Vec<GridCell>>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }

        let file = File::open(&path)
            .with_context(|| format!("failed to open grid cache {}", path.display()))?;
        let entry: CacheEntry = serde_json::from_reader(BufReader::new(GzDecoder::new(file)))
            .with_context(|| format!("failed to decode grid cache {}", path.display()))?;

        if entry.schema_version != CACHE_SCHEMA_VERSION {
            bail!(
                "grid cache {} has schema version {}, expected {}",
                path.display(),
                entry.schema_version,
                CACHE_SCHEMA_VERSION
            );
        }
        if entry.spacing_key != key {
            bail!(
                "grid cache {} holds spacing '{}', expected '{}'",
                path.display(),
                entry.spacing_key,
                key
            );
        }

        debug!(path = %path.display(), created_at = %entry.created_at, cells = entry.cells.len(), "Grid cache read");
        Ok(Some(entry.cells))
    }

    fn store(&mut self, key: &str, cells: &[GridCell]) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create cache directory {}", self.dir.display()))?;

        let entry = CacheEntry {
            schema_version: CACHE_SCHEMA_VERSION,
            spacing_key: key.to_string(),
            created_at: Utc::now(),
            cells: cells.to_vec(),
        };

        // Write beside the target and rename so a crash never leaves half an entry.
        let path = self.path_for(key);
        let tmp = path.with_extension("gz.tmp");
        {
            let file = File::create(&tmp)
                .with_context(|| format!("failed to create {}", tmp.display()))?;
            let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
            serde_json::to_writer(&mut encoder, &entry)?;
            encoder.finish()?.flush()?;
        }
        fs::rename(&tmp, &path)
            .with_context(|| format!("failed to move grid cache into {}", path.display()))?;

        debug!(path = %path.display(), cells = cells.len(), "Grid cache written");
        Ok(())
    }
}

/// In-process store, used when nothing should touch the disk.
#[derive(Debug, Default, Clone)]
pub struct MemoryCellStore {
    entries: HashMap<String, Vec<GridCell>>,
}

impl MemoryCellStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CellStore for MemoryCellStore {
    fn load(&self, key: &str) -> Result<Option<Vec<GridCell>>> {
        Ok(self.entries.get(key).cloned())
    }

    fn store(&mut self, key: &str, cells: &[GridCell]) -> Result<()> {
        self.entries.insert(key.to_string(), cells.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::CellGeometry;
    use std::env;

    fn temp_dir(name: &str) -> PathBuf {
        env::temp_dir().join(name)
    }

    fn sample_cells() -> Vec<GridCell> {
        vec![
            GridCell::new(0, 0, 0, CellGeometry::square(0.0, 0.0, 1609.34)).unwrap(),
            GridCell::new(1, 1, 0, CellGeometry::square(1609.34, 0.0, 1609.34)).unwrap(),
        ]
    }

    #[test]
    fn test_load_missing_entry_is_none() {
        let dir = temp_dir("comfort_grid_cache_missing");
        let _ = fs::remove_dir_all(&dir);
        let store = FileCellStore::new(&dir);
        assert!(store.load("20mi").unwrap().is_none());
    }

    #[test]
    fn test_store_then_load_round_trip() {
        let dir = temp_dir("comfort_grid_cache_round_trip");
        let _ = fs::remove_dir_all(&dir);
        let mut store = FileCellStore::new(&dir);

        let cells = sample_cells();
        store.store("1mi", &cells).unwrap();
        let loaded = store.load("1mi").unwrap().unwrap();
        assert_eq!(loaded, cells);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_store_overwrites_previous_entry() {
        let dir = temp_dir("comfort_grid_cache_overwrite");
        let _ = fs::remove_dir_all(&dir);
        let mut store = FileCellStore::new(&dir);

        let cells = sample_cells();
        store.store("1mi", &cells).unwrap();
        store.store("1mi", &cells[..1]).unwrap();
        assert_eq!(store.load("1mi").unwrap().unwrap().len(), 1);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_corrupt_entry_is_error() {
        let dir = temp_dir("comfort_grid_cache_corrupt");
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        let store = FileCellStore::new(&dir);
        fs::write(store.path_for("5mi"), b"definitely not gzip").unwrap();

        assert!(store.load("5mi").is_err());

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_schema_mismatch_is_error() {
        let dir = temp_dir("comfort_grid_cache_schema");
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        let store = FileCellStore::new(&dir);

        let entry = CacheEntry {
            schema_version: CACHE_SCHEMA_VERSION + 1,
            spacing_key: "5mi".to_string(),
            created_at: Utc::now(),
            cells: sample_cells(),
        };
        let file = File::create(store.path_for("5mi")).unwrap();
        let mut encoder = GzEncoder::new(file, Compression::default());
        serde_json::to_writer(&mut encoder, &entry).unwrap();
        encoder.finish().unwrap();

        assert!(store.load("5mi").is_err());

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_memory_store() {
        let mut store = MemoryCellStore::new();
        assert!(store.is_empty());
        store.store("20mi", &sample_cells()).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.load("20mi").unwrap().unwrap().len(), 2);
        assert!(store.load("10mi").unwrap().is_none());
    }
}
