//! CLI entry point for the comfort grid tool.
//!
//! Provides subcommands for building the clipped grid, aggregating station
//! scores onto it, and projecting single points.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use comfort_grid::aggregate::Fallback;
use comfort_grid::boundary::Boundary;
use comfort_grid::config::PipelineConfig;
use comfort_grid::grid::{FileCellStore, GridBuilder};
use comfort_grid::output::{
    append_summary, print_json, print_pretty, write_cells_csv, write_cells_json,
};
use comfort_grid::pipeline::Pipeline;
use comfort_grid::projection::{AlbersEqualArea, DistanceUnit};
use comfort_grid::samples::{load_stations, project_stations};
use comfort_grid::score::ScoreKind;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "comfort_grid")]
#[command(about = "Aggregate station comfort scores onto a clipped square grid", long_about = None)]
struct Cli {
    /// Optional JSON config file; flags override its values
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build (or load from cache) the grid clipped to a boundary
    Grid {
        #[command(flatten)]
        grid: GridArgs,
    },
    /// Run the full pipeline over a station CSV
    Aggregate {
        #[command(flatten)]
        grid: GridArgs,

        /// Station CSV to read
        #[arg(short, long)]
        stations: String,

        /// What a cell without stations receives
        #[arg(long, value_enum)]
        fallback: Option<Fallback>,

        /// Which comfort score to aggregate
        #[arg(long, value_enum)]
        score: Option<ScoreKind>,

        /// CSV file to write per-cell values to
        #[arg(short, long, default_value = "cells.csv")]
        output: String,

        /// Optional: JSON file to write cell geometries and values to
        #[arg(long)]
        json: Option<String>,

        /// Optional: CSV file to append the run summary to
        #[arg(long)]
        summary: Option<String>,
    },
    /// Print the projected coordinates of a longitude/latitude
    Project {
        #[arg(long, allow_negative_numbers = true)]
        lon: f64,

        #[arg(long, allow_negative_numbers = true)]
        lat: f64,
    },
}

#[derive(Args)]
struct GridArgs {
    /// Boundary JSON file
    #[arg(short, long)]
    boundary: String,

    /// Grid spacing
    #[arg(long)]
    spacing: Option<f64>,

    /// Unit of the grid spacing
    #[arg(long, value_enum)]
    unit: Option<DistanceUnit>,

    /// Ignore any cached grid and rebuild it
    #[arg(long, default_value_t = false)]
    force: bool,
}

impl GridArgs {
    fn apply(&self, config: &mut PipelineConfig) {
        if let Some(spacing) = self.spacing {
            config.spacing = spacing;
        }
        if let Some(unit) = self.unit {
            config.unit = unit;
        }
        config.force_recompute |= self.force;
    }
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/comfort_grid.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("comfort_grid.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    }
    .with_env();

    match cli.command {
        Commands::Grid { grid } => {
            grid.apply(&mut config);
            let boundary = load_boundary(&grid.boundary)?;

            let mut builder = GridBuilder::new(FileCellStore::new(&config.cache_dir));
            let cells = builder.build(&boundary, config.grid_spacing(), config.force_recompute)?;
            info!(
                cells = cells.len(),
                spacing = %config.grid_spacing().cache_key(),
                cache_dir = %config.cache_dir.display(),
                "Grid ready"
            );
        }
        Commands::Aggregate {
            grid,
            stations,
            fallback,
            score,
            output,
            json,
            summary,
        } => {
            grid.apply(&mut config);
            if let Some(fallback) = fallback {
                config.fallback = fallback;
            }
            if let Some(score) = score {
                config.score = score;
            }
            aggregate(
                &config,
                &grid.boundary,
                &stations,
                &output,
                json.as_deref(),
                summary.as_deref(),
            )?;
        }
        Commands::Project { lon, lat } => {
            let (x, y) = AlbersEqualArea::conus().forward(lon, lat)?;
            info!(lon, lat, x, y, "Projected point");
        }
    }

    Ok(())
}

fn load_boundary(path: &str) -> Result<Boundary> {
    Boundary::load(path, &AlbersEqualArea::conus())
        .with_context(|| format!("failed to load boundary {path}"))
}

/// Loads the boundary and stations, runs the pipeline and writes its outputs.
#[tracing::instrument(skip(config, json, summary), fields(score = ?config.score))]
fn aggregate(
    config: &PipelineConfig,
    boundary: &str,
    stations: &str,
    output: &str,
    json: Option<&str>,
    summary: Option<&str>,
) -> Result<()> {
    let boundary = load_boundary(boundary)?;
    let records = load_stations(stations)?;
    let samples = project_stations(&records, &AlbersEqualArea::conus(), config.score);

    let store = FileCellStore::new(PathBuf::from(&config.cache_dir));
    let mut pipeline = Pipeline::new(store, config.grid_spacing(), config.fallback)
        .force_recompute(config.force_recompute);

    let score = config.score;
    let result = pipeline.run(&boundary, &samples, |reading| score.score(reading))?;

    print_pretty(&result.summary);
    print_json(&result.summary)?;

    write_cells_csv(output, &result.cells, &result.values)?;
    if let Some(path) = json {
        write_cells_json(path, &result.rendered())?;
    }
    if let Some(path) = summary {
        append_summary(path, &result.summary)?;
    }

    Ok(())
}
