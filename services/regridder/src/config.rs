//! Regridder run configuration.
//!
//! A run is described by a YAML file holding the native bounds of the
//! region, the processing settings and output options. Environment
//! variables override the file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use grid_processor::GridProcessorConfig;
use projection::Polyline;
use volume_common::NativeBounds;

/// Top-level run configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Native region to render.
    pub bounds: NativeBounds,

    /// Transform, resampling and derived-field settings.
    pub processing: GridProcessorConfig,

    /// Lon/lat polylines projected into line segments alongside the
    /// volume.
    pub overlay: OverlayConfig,

    pub output: OutputConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            bounds: NativeBounds {
                radial: [0.0, 70_000.0],
                latitude: [-1.0, 1.0],
                longitude: [-90.0, -88.0],
            },
            processing: GridProcessorConfig::default(),
            overlay: OverlayConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct OverlayConfig {
    /// Radial value of the overlay lines (0 = surface).
    pub radial: f64,
    pub polylines: Vec<Polyline>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct OutputConfig {
    /// Fields to write; every raw and derived field when empty.
    pub fields: Vec<String>,

    /// Pretty-print the JSON result.
    pub pretty: bool,
}

impl RunConfig {
    /// Load a configuration file.
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_yaml_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: RunConfig = serde_yaml::from_str(content)?;
        Ok(config)
    }

    /// Override settings from environment variables.
    pub fn apply_env(&mut self) -> Result<()> {
        self.processing.apply_env();

        if let Ok(val) = std::env::var("REGRID_BOUNDS") {
            self.bounds = NativeBounds::from_csv_string(&val)
                .with_context(|| format!("Invalid REGRID_BOUNDS: {}", val))?;
        }

        if let Ok(val) = std::env::var("REGRID_OUTPUT_FIELDS") {
            self.output.fields = val
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }

        Ok(())
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        self.bounds.validate().context("Invalid bounds")?;
        self.processing
            .validate()
            .context("Invalid processing configuration")?;

        for (i, line) in self.overlay.polylines.iter().enumerate() {
            if line.longitudes.len() != line.latitudes.len() {
                anyhow::bail!(
                    "overlay polyline {} has {} longitudes and {} latitudes",
                    i,
                    line.longitudes.len(),
                    line.latitudes.len()
                );
            }
        }

        Ok(())
    }
}
