use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::aggregate::Fallback;
use crate::projection::{DistanceUnit, GridSpacing};
use crate::score::ScoreKind;

/// Environment variable overriding [`PipelineConfig::cache_dir`].
pub const CACHE_DIR_ENV: &str = "GRID_CACHE_DIR";

/// Settings for a grid run.
///
/// Stored as a plain JSON object on disk; every field is optional:
/// ```json
/// {
///   "spacing": 20.0,
///   "unit": "miles",
///   "cache_dir": "cache/grid",
///   "force_recompute": false,
///   "fallback": "nearest_sample",
///   "score": "total"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub spacing: f64,
    pub unit: DistanceUnit,
    pub cache_dir: PathBuf,
    pub force_recompute: bool,
    pub fallback: Fallback,
    pub score: ScoreKind,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            spacing: 20.0,
            unit: DistanceUnit::Miles,
            cache_dir: PathBuf::from("cache/grid"),
            force_recompute: false,
            fallback: Fallback::NearestSample,
            score: ScoreKind::Total,
        }
    }
}

impl PipelineConfig {
    /// Loads the config from a JSON file at `path`.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {path}"))?;
        let config: Self =
            serde_json::from_str(&content).with_context(|| format!("invalid config {path}"))?;
        Ok(config)
    }

    /// Applies [`CACHE_DIR_ENV`] when set.
    pub fn with_env(mut self) -> Self {
        if let Ok(dir) = std::env::var(CACHE_DIR_ENV) {
            if !dir.is_empty() {
                self.cache_dir = PathBuf::from(dir);
            }
        }
        self
    }

    pub fn grid_spacing(&self) -> GridSpacing {
        GridSpacing::new(self.spacing, self.unit)
    }
}
