//! Batch regridder.
//!
//! Reads a JSON source dataset, resamples it onto a uniform Cartesian
//! volume using a scaled geocentric transform, computes derived fields and
//! writes the result as JSON.

mod config;
mod io;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use config::RunConfig;
use grid_processor::build_session;
use projection::{boundary_segments, GeocentricTransformer};
use volume_common::NativeBounds;

#[derive(Parser, Debug)]
#[command(name = "regridder")]
#[command(about = "Resample gridded reanalysis fields onto a Cartesian volume")]
struct Args {
    /// Run configuration file path (YAML)
    #[arg(short, long, env = "REGRID_CONFIG")]
    config: Option<String>,

    /// Source dataset (JSON)
    #[arg(short, long, env = "REGRID_INPUT")]
    input: String,

    /// Output file (JSON)
    #[arg(short, long, env = "REGRID_OUTPUT", default_value = "regrid.json")]
    output: String,

    /// Native bounds "rmin,rmax,latmin,latmax,lonmin,lonmax", overriding the config
    #[arg(long)]
    bounds: Option<String>,

    /// Log level
    #[arg(long, default_value = "info", env = "LOG_LEVEL")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    // Initialize tracing
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true);
    if args.log_json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }

    info!("Starting regridder");

    // Load configuration
    let mut config = match &args.config {
        Some(path) => RunConfig::from_yaml(path)?,
        None => RunConfig::default(),
    };
    config.apply_env()?;
    if let Some(bounds) = &args.bounds {
        config.bounds = NativeBounds::from_csv_string(bounds)
            .with_context(|| format!("Invalid --bounds: {}", bounds))?;
    }
    config.validate()?;

    info!(
        bounds = ?config.bounds,
        resolution = ?config.processing.resolution,
        scale = config.processing.transformer.radial_scale_factor,
        lookup = %config.processing.resample.lookup,
        "Loaded configuration"
    );

    let dataset = io::read_dataset(&args.input)?;
    info!(
        input = %args.input,
        shape = %dataset.shape(),
        fields = ?dataset.field_names().collect::<Vec<_>>(),
        "Loaded source dataset"
    );

    let (session, report) = build_session(&dataset, &config.bounds, &config.processing)
        .context("Regridding failed")?;

    let overlay = if config.overlay.polylines.is_empty() {
        Vec::new()
    } else {
        let transformer = GeocentricTransformer::new(&config.processing.transformer)?;
        boundary_segments(&transformer, &config.overlay.polylines, config.overlay.radial)?
    };

    let result = io::RegridResult::from_session(
        &session,
        &report,
        &config.processing.transformer,
        &config.output.fields,
        &overlay,
    )?;
    io::write_result(&args.output, &result, config.output.pretty)?;

    info!(
        output = %args.output,
        fields = result.fields.len(),
        cells = report.stats.cells,
        evaluated = report.stats.evaluated,
        matched = report.stats.matched,
        filled = report.stats.filled,
        segments = overlay.len(),
        "Wrote regrid result"
    );

    Ok(())
}
