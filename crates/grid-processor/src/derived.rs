//! Derived fields computed per cell from resampled raw fields.
//!
//! Derived arrays are always rebuilt from scratch; nothing here mutates a
//! raw field. Non-finite raw values are cleaned up here so that every
//! derived array is finite.

use std::collections::BTreeMap;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{GridProcessorError, Result};
use crate::render_grid::RenderGrid;

/// Default floor for [`floor_protected`].
pub const DEFAULT_FLOOR: f64 = 1e-12;

/// Derived arrays by name.
pub type DerivedFields = BTreeMap<String, Vec<f64>>;

/// `(value - min) / (max - min)`, or 0 when the range is not positive.
///
/// Non-finite results and results below 0 become 0. With `clamp_upper`
/// results above 1 become 1.
#[inline]
pub fn normalized_fraction(value: f64, min: f64, max: f64, clamp_upper: bool) -> f64 {
    let range = max - min;
    if range.is_nan() || range <= 0.0 {
        return 0.0;
    }

    let fraction = (value - min) / range;
    if !fraction.is_finite() || fraction < 0.0 {
        0.0
    } else if clamp_upper && fraction > 1.0 {
        1.0
    } else {
        fraction
    }
}

/// Replace non-finite or exactly-zero values with `floor`.
#[inline]
pub fn floor_protected(value: f64, floor: f64) -> f64 {
    if !value.is_finite() || value == 0.0 {
        floor
    } else {
        value
    }
}

/// Replace non-finite values with 0.
#[inline]
pub fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

fn default_floor() -> f64 {
    DEFAULT_FLOOR
}

/// Declaration of one derived field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DerivedFieldSpec {
    /// Copy of `source` with non-finite values set to 0.
    FiniteOrZero { name: String, source: String },

    /// Fraction of `value` within the per-cell `[min, max]` range.
    NormalizedFraction {
        name: String,
        value: String,
        min: String,
        max: String,
        #[serde(default)]
        clamp_upper: bool,
    },

    /// Copy of `source` with zero and non-finite values set to `floor`.
    FloorProtected {
        name: String,
        source: String,
        #[serde(default = "default_floor")]
        floor: f64,
    },
}

impl DerivedFieldSpec {
    pub fn finite_or_zero(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self::FiniteOrZero {
            name: name.into(),
            source: source.into(),
        }
    }

    pub fn normalized_fraction(
        name: impl Into<String>,
        value: impl Into<String>,
        min: impl Into<String>,
        max: impl Into<String>,
    ) -> Self {
        Self::NormalizedFraction {
            name: name.into(),
            value: value.into(),
            min: min.into(),
            max: max.into(),
            clamp_upper: false,
        }
    }

    pub fn floor_protected(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self::FloorProtected {
            name: name.into(),
            source: source.into(),
            floor: DEFAULT_FLOOR,
        }
    }

    /// Name of the output field.
    pub fn name(&self) -> &str {
        match self {
            Self::FiniteOrZero { name, .. }
            | Self::NormalizedFraction { name, .. }
            | Self::FloorProtected { name, .. } => name,
        }
    }

    /// Names of the input fields.
    pub fn inputs(&self) -> Vec<&str> {
        match self {
            Self::FiniteOrZero { source, .. } | Self::FloorProtected { source, .. } => {
                vec![source.as_str()]
            }
            Self::NormalizedFraction {
                value, min, max, ..
            } => vec![value.as_str(), min.as_str(), max.as_str()],
        }
    }

    /// Check the declaration itself, independent of any grid.
    pub fn validate(&self) -> Result<()> {
        if self.name().is_empty() {
            return Err(GridProcessorError::invalid_config(
                "derived field name must not be empty",
            ));
        }
        if let Self::FloorProtected { name, floor, .. } = self {
            if !floor.is_finite() || *floor <= 0.0 {
                return Err(GridProcessorError::invalid_config(format!(
                    "derived field {} needs a positive floor, got {}",
                    name, floor
                )));
            }
        }
        Ok(())
    }

    fn compute<'a, F>(&self, lookup: F) -> Result<Vec<f64>>
    where
        F: Fn(&str) -> Option<&'a [f64]>,
    {
        let get = |name: &str| lookup(name).ok_or_else(|| GridProcessorError::field_not_found(name));

        let out = match self {
            Self::FiniteOrZero { source, .. } => get(source)?
                .par_iter()
                .map(|&v| finite_or_zero(v))
                .collect(),
            Self::FloorProtected { source, floor, .. } => get(source)?
                .par_iter()
                .map(|&v| floor_protected(v, *floor))
                .collect(),
            Self::NormalizedFraction {
                value,
                min,
                max,
                clamp_upper,
                ..
            } => {
                let (value, min, max) = (get(value)?, get(min)?, get(max)?);
                value
                    .par_iter()
                    .zip(min.par_iter())
                    .zip(max.par_iter())
                    .map(|((&v, &lo), &hi)| normalized_fraction(v, lo, hi, *clamp_upper))
                    .collect()
            }
        };
        Ok(out)
    }
}

/// Compute every derived field from the grid's raw fields.
///
/// Specs are evaluated in order; an input may name a raw field or a
/// derived field declared earlier.
pub fn derive_all(grid: &RenderGrid, specs: &[DerivedFieldSpec]) -> Result<DerivedFields> {
    let mut derived = DerivedFields::new();

    for spec in specs {
        let values = spec.compute(|name| {
            grid.field(name)
                .or_else(|| derived.get(name).map(Vec::as_slice))
        })?;
        debug!(field = spec.name(), cells = values.len(), "Computed derived field");
        derived.insert(spec.name().to_string(), values);
    }

    Ok(derived)
}
