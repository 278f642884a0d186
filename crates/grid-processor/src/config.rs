//! Configuration for the grid processor.

use serde::{Deserialize, Serialize};

use projection::{RadialType, TransformerConfig};

use crate::aggregate::AggregationOp;
use crate::derived::DerivedFieldSpec;
use crate::error::{GridProcessorError, Result};
use crate::types::{AxisNormalization, LookupMethod, VerticalCoordinate};

/// Default render grid resolution per axis.
pub const DEFAULT_RESOLUTION: [usize; 3] = [128, 128, 128];

/// Configuration for a complete regridding pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridProcessorConfig {
    /// Geocentric transform settings.
    pub transformer: TransformerConfig,

    /// Render grid cells along x, y, z.
    pub resolution: [usize; 3],

    /// Vertical coordinate used as the radial native value.
    pub vertical: VerticalCoordinate,

    /// Field whose finiteness decides index membership. All fields when
    /// unset.
    pub mask_field: Option<String>,

    /// Nearest-neighbour settings.
    pub resample: ResampleConfig,

    /// Block refinement of the render grid.
    pub refine: RefineConfig,

    /// Horizontal aggregates added to the source before resampling.
    pub aggregates: Vec<AggregateSpec>,

    /// Derived fields computed after resampling.
    pub derived: Vec<DerivedFieldSpec>,
}

impl Default for GridProcessorConfig {
    fn default() -> Self {
        Self {
            transformer: TransformerConfig::default(),
            resolution: DEFAULT_RESOLUTION,
            vertical: VerticalCoordinate::LevelMean,
            mask_field: None,
            resample: ResampleConfig::default(),
            refine: RefineConfig::default(),
            aggregates: Vec::new(),
            derived: Vec::new(),
        }
    }
}

impl GridProcessorConfig {
    /// Humidity visualization preset: tenfold vertical exaggeration, QV
    /// aggregates and the QV_n, dQV_n and RH_filtered derived fields.
    pub fn humidity() -> Self {
        Self {
            transformer: TransformerConfig {
                radial_scale_factor: 10.0,
                ..TransformerConfig::default()
            },
            aggregates: vec![AggregateSpec {
                field: "QV".to_string(),
                ops: AggregationOp::ALL.to_vec(),
            }],
            derived: vec![
                DerivedFieldSpec::finite_or_zero("QV_n", "QV"),
                DerivedFieldSpec::normalized_fraction("dQV_n", "QV_n", "QV_min", "QV_max"),
                DerivedFieldSpec::floor_protected("RH_filtered", "RH"),
            ],
            ..Self::default()
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Override fields from environment variables that are set.
    pub fn apply_env(&mut self) {
        if let Ok(val) = std::env::var("REGRID_REFERENCE_RADIUS") {
            if let Ok(radius) = val.parse() {
                self.transformer.reference_radius = radius;
            }
        }

        if let Ok(val) = std::env::var("REGRID_RADIAL_SCALE_FACTOR") {
            if let Ok(scale) = val.parse() {
                self.transformer.radial_scale_factor = scale;
            }
        }

        if let Ok(val) = std::env::var("REGRID_USE_NEGATIVE_LONGITUDES") {
            self.transformer.use_negative_longitudes = val.to_lowercase() == "true" || val == "1";
        }

        if let Ok(val) = std::env::var("REGRID_RADIAL_TYPE") {
            self.transformer.radial_type = RadialType::from_str(&val);
        }

        if let Ok(val) = std::env::var("REGRID_RESOLUTION") {
            if let Some(resolution) = parse_resolution(&val) {
                self.resolution = resolution;
            }
        }

        if let Ok(val) = std::env::var("REGRID_VERTICAL") {
            self.vertical = VerticalCoordinate::from_str(&val);
        }

        if let Ok(val) = std::env::var("REGRID_MASK_FIELD") {
            self.mask_field = if val.is_empty() { None } else { Some(val) };
        }

        self.resample.apply_env();
        self.refine.apply_env();
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        self.transformer.validate()?;

        if self.resolution.iter().any(|&n| n == 0) {
            return Err(GridProcessorError::invalid_config(format!(
                "resolution must be > 0 on every axis, got {:?}",
                self.resolution
            )));
        }

        if self.resample.lookup == LookupMethod::Rectilinear && !self.vertical.is_rectilinear() {
            return Err(GridProcessorError::invalid_config(format!(
                "rectilinear lookup needs a level-based vertical coordinate, got {}",
                self.vertical
            )));
        }

        self.resample.validate()?;
        self.refine.validate()?;

        for aggregate in &self.aggregates {
            if aggregate.ops.is_empty() {
                return Err(GridProcessorError::invalid_config(format!(
                    "aggregate for {} lists no operations",
                    aggregate.field
                )));
            }
        }

        for spec in &self.derived {
            spec.validate()?;
        }

        Ok(())
    }
}

/// Parse `"n"` or `"nx,ny,nz"`.
fn parse_resolution(s: &str) -> Option<[usize; 3]> {
    let parts: Vec<usize> = s
        .split(',')
        .map(|p| p.trim().parse().ok())
        .collect::<Option<Vec<_>>>()?;
    match parts.as_slice() {
        [n] => Some([*n; 3]),
        [x, y, z] => Some([*x, *y, *z]),
        _ => None,
    }
}

/// Per-level aggregates of one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateSpec {
    pub field: String,
    pub ops: Vec<AggregationOp>,
}

// ============================================================================
// Resampling Configuration
// ============================================================================

/// Configuration for nearest-neighbour resampling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResampleConfig {
    /// Search strategy.
    pub lookup: LookupMethod,

    /// Axis scaling applied before measuring distances.
    pub normalization: AxisNormalization,

    /// Value for cells outside the source domain or beyond the cutoff.
    pub fill_value: f64,

    /// Matches farther than this (in normalized native units) are treated
    /// as missing. Unbounded when unset.
    pub max_match_distance: Option<f64>,
}

impl Default for ResampleConfig {
    fn default() -> Self {
        Self {
            lookup: LookupMethod::KdTree,
            normalization: AxisNormalization::None,
            fill_value: f64::NAN,
            max_match_distance: None,
        }
    }
}

impl ResampleConfig {
    /// Load resampling configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    fn apply_env(&mut self) {
        if let Ok(val) = std::env::var("REGRID_LOOKUP") {
            self.lookup = LookupMethod::from_str(&val);
        }

        if let Ok(val) = std::env::var("REGRID_NORMALIZATION") {
            self.normalization = AxisNormalization::from_str(&val);
        }

        if let Ok(val) = std::env::var("REGRID_FILL_VALUE") {
            if let Ok(fill) = val.parse() {
                self.fill_value = fill;
            }
        }

        if let Ok(val) = std::env::var("REGRID_MAX_MATCH_DISTANCE") {
            self.max_match_distance = val.parse().ok();
        }
    }

    /// Validate the resampling configuration.
    pub fn validate(&self) -> Result<()> {
        if let Some(cutoff) = self.max_match_distance {
            if !cutoff.is_finite() || cutoff < 0.0 {
                return Err(GridProcessorError::invalid_config(format!(
                    "max_match_distance must be finite and >= 0, got {}",
                    cutoff
                )));
            }
        }
        Ok(())
    }
}

// ============================================================================
// Refinement Configuration
// ============================================================================

/// Configuration for block refinement of the render grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefineConfig {
    /// Whether to skip blocks that lie entirely outside the source domain.
    pub enabled: bool,

    /// Number of parts a partially covered block is split into per axis.
    pub refine_by: usize,

    /// Blocks are not split below this many cells per axis.
    pub min_block_size: usize,

    /// Maximum number of block splits.
    pub max_iterations: usize,
}

impl Default for RefineConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            refine_by: 2,
            min_block_size: 16,
            max_iterations: 2000,
        }
    }
}

impl RefineConfig {
    /// Refinement switched off.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Load refinement configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    fn apply_env(&mut self) {
        if let Ok(val) = std::env::var("REGRID_REFINE_ENABLED") {
            self.enabled = val.to_lowercase() == "true" || val == "1";
        }

        if let Ok(val) = std::env::var("REGRID_REFINE_BY") {
            if let Ok(n) = val.parse() {
                self.refine_by = n;
            }
        }

        if let Ok(val) = std::env::var("REGRID_REFINE_MIN_BLOCK_SIZE") {
            if let Ok(n) = val.parse() {
                self.min_block_size = n;
            }
        }

        if let Ok(val) = std::env::var("REGRID_REFINE_MAX_ITERATIONS") {
            if let Ok(n) = val.parse() {
                self.max_iterations = n;
            }
        }
    }

    /// Validate the refinement configuration.
    pub fn validate(&self) -> Result<()> {
        if self.refine_by < 2 {
            return Err(GridProcessorError::invalid_config(format!(
                "refine_by must be >= 2, got {}",
                self.refine_by
            )));
        }

        if self.min_block_size == 0 {
            return Err(GridProcessorError::invalid_config(
                "min_block_size must be > 0",
            ));
        }

        Ok(())
    }
}
