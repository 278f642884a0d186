//! Rectilinear source datasets.
//!
//! A [`SourceDataset`] holds reanalysis fields on a `(level, lat, lon)` grid
//! in row-major order, together with the 1-D coordinates and, optionally,
//! the geometric height of every node. It is the input to sample
//! extraction and horizontal aggregation.

use std::collections::BTreeMap;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use volume_common::{GridShape, LongitudeConvention, NativeBounds, NativeCoordinate};

use crate::aggregate::AggregationOp;
use crate::error::{GridProcessorError, Result};
use crate::types::{SampleSet, SourceAxes, SourceSample, VerticalCoordinate};

/// Gridded source fields with their coordinates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceDataset {
    /// Level coordinate values (e.g. pressure in hPa).
    pub levels: Vec<f64>,
    /// Latitudes in degrees.
    pub latitudes: Vec<f64>,
    /// Longitudes in degrees, any convention.
    pub longitudes: Vec<f64>,
    /// Geometric height of each node in meters; empty when unavailable.
    #[serde(default, with = "crate::serde_nan::vec")]
    pub heights: Vec<f64>,
    /// Named fields, each of length `levels * latitudes * longitudes`.
    #[serde(default, with = "crate::serde_nan::map")]
    pub fields: BTreeMap<String, Vec<f64>>,
}

impl SourceDataset {
    /// Create a dataset with coordinates and no fields.
    pub fn new(levels: Vec<f64>, latitudes: Vec<f64>, longitudes: Vec<f64>) -> Self {
        Self {
            levels,
            latitudes,
            longitudes,
            heights: Vec::new(),
            fields: BTreeMap::new(),
        }
    }

    /// Attach geometric heights.
    pub fn with_heights(mut self, heights: Vec<f64>) -> Self {
        self.heights = heights;
        self
    }

    /// Attach a field.
    pub fn with_field(mut self, name: impl Into<String>, values: Vec<f64>) -> Self {
        self.fields.insert(name.into(), values);
        self
    }

    pub fn shape(&self) -> GridShape {
        GridShape::new(self.levels.len(), self.latitudes.len(), self.longitudes.len())
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Check that coordinates are non-empty and every array matches the
    /// grid shape.
    pub fn validate(&self) -> Result<()> {
        let shape = self.shape();
        if shape.is_empty() {
            return Err(GridProcessorError::dimension_mismatch(format!(
                "source grid {} has an empty axis",
                shape
            )));
        }

        if !self.heights.is_empty() && self.heights.len() != shape.len() {
            return Err(GridProcessorError::dimension_mismatch(format!(
                "heights has {} values, grid {} needs {}",
                self.heights.len(),
                shape,
                shape.len()
            )));
        }

        for (name, values) in &self.fields {
            if values.len() != shape.len() {
                return Err(GridProcessorError::dimension_mismatch(format!(
                    "field {} has {} values, grid {} needs {}",
                    name,
                    values.len(),
                    shape,
                    shape.len()
                )));
            }
        }

        Ok(())
    }

    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Result<&[f64]> {
        self.fields
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| GridProcessorError::field_not_found(name))
    }

    /// Insert or replace a field, checking its length.
    pub fn insert_field(&mut self, name: impl Into<String>, values: Vec<f64>) -> Result<()> {
        let name = name.into();
        let expected = self.shape().len();
        if values.len() != expected {
            return Err(GridProcessorError::dimension_mismatch(format!(
                "field {} has {} values, expected {}",
                name,
                values.len(),
                expected
            )));
        }
        self.fields.insert(name, values);
        Ok(())
    }

    /// Horizontal mask, `lat`-major, of the nodes inside the lat/lon extent
    /// of `bounds`. The radial range is ignored.
    pub fn subregion_mask(
        &self,
        bounds: &NativeBounds,
        convention: LongitudeConvention,
    ) -> Result<Vec<bool>> {
        let bounds = bounds.normalized(convention)?;
        let mut mask = Vec::with_capacity(self.latitudes.len() * self.longitudes.len());
        for &lat in &self.latitudes {
            for &lon in &self.longitudes {
                mask.push(bounds.contains_horizontal(lat, lon, convention));
            }
        }
        Ok(mask)
    }

    /// Select the latitudes and longitudes inside `bounds`, keeping every
    /// level.
    pub fn subset(
        &self,
        bounds: &NativeBounds,
        convention: LongitudeConvention,
    ) -> Result<SourceDataset> {
        self.validate()?;
        let bounds = bounds.normalized(convention)?;

        let lat_idx: Vec<usize> = (0..self.latitudes.len())
            .filter(|&j| {
                let lat = self.latitudes[j];
                lat >= bounds.latitude[0] && lat <= bounds.latitude[1]
            })
            .collect();
        let lon_idx: Vec<usize> = (0..self.longitudes.len())
            .filter(|&i| {
                let lon = convention.normalize(self.longitudes[i]);
                lon >= bounds.longitude[0] && lon <= bounds.longitude[1]
            })
            .collect();

        let shape = self.shape();
        let pick = |values: &[f64]| -> Vec<f64> {
            let mut out = Vec::with_capacity(shape.levels * lat_idx.len() * lon_idx.len());
            for level in 0..shape.levels {
                for &lat in &lat_idx {
                    for &lon in &lon_idx {
                        let flat = (level * shape.latitudes + lat) * shape.longitudes + lon;
                        out.push(values[flat]);
                    }
                }
            }
            out
        };

        let heights = if self.heights.is_empty() {
            Vec::new()
        } else {
            pick(&self.heights)
        };

        let fields = self
            .fields
            .iter()
            .map(|(name, values)| (name.clone(), pick(values)))
            .collect();

        Ok(SourceDataset {
            levels: self.levels.clone(),
            latitudes: lat_idx.iter().map(|&j| self.latitudes[j]).collect(),
            longitudes: lon_idx.iter().map(|&i| self.longitudes[i]).collect(),
            heights,
            fields,
        })
    }

    /// Per-level aggregates of `field` over the horizontal subregion of
    /// `bounds`, broadcast to the full grid and named `"{field}_{op}"`.
    ///
    /// The dataset is left untouched.
    pub fn horizontal_aggregates(
        &self,
        field: &str,
        bounds: &NativeBounds,
        ops: &[AggregationOp],
        convention: LongitudeConvention,
    ) -> Result<Vec<(String, Vec<f64>)>> {
        self.validate()?;
        let mask = self.subregion_mask(bounds, convention)?;
        let shape = self.shape();
        let plane = shape.horizontal_len();
        let values = self.field(field)?;

        let selected = mask.iter().filter(|&&m| m).count();
        debug!(
            field = field,
            selected = selected,
            total = plane,
            "Aggregating over horizontal subregion"
        );

        let mut computed = Vec::with_capacity(ops.len());
        for op in ops {
            let mut out = Vec::with_capacity(shape.len());
            for level_values in values.chunks(plane) {
                let reduced = op.reduce(
                    level_values
                        .iter()
                        .zip(&mask)
                        .filter(|(_, inside)| **inside)
                        .map(|(v, _)| *v),
                );
                out.extend(std::iter::repeat(reduced).take(plane));
            }
            computed.push((op.field_name(field), out));
        }
        Ok(computed)
    }

    /// Add the [`horizontal_aggregates`](Self::horizontal_aggregates) of
    /// `field` to the dataset.
    ///
    /// Returns the names of the added fields.
    pub fn add_horizontal_aggregates(
        &mut self,
        field: &str,
        bounds: &NativeBounds,
        ops: &[AggregationOp],
        convention: LongitudeConvention,
    ) -> Result<Vec<String>> {
        let computed = self.horizontal_aggregates(field, bounds, ops, convention)?;
        let names = computed.iter().map(|(name, _)| name.clone()).collect();
        self.fields.extend(computed);
        Ok(names)
    }

    /// Mean geometric height of each level, skipping NaN.
    pub fn level_altitudes(&self) -> Result<Vec<f64>> {
        let shape = self.shape();
        if self.heights.len() != shape.len() {
            return Err(GridProcessorError::field_not_found("heights"));
        }

        let plane = shape.horizontal_len();
        Ok(self
            .heights
            .chunks(plane)
            .map(|level| AggregationOp::Mean.reduce(level.iter().copied()))
            .collect())
    }

    /// Build source samples for every node.
    ///
    /// Samples carry only their coordinate and finiteness. A sample is
    /// finite when its coordinate is finite and either every field (no
    /// `mask_field`) or the named mask field is finite.
    pub fn samples(
        &self,
        vertical: VerticalCoordinate,
        convention: LongitudeConvention,
        mask_field: Option<&str>,
    ) -> Result<SampleSet> {
        self.validate()?;
        let shape = self.shape();

        let checked: Vec<&[f64]> = match mask_field {
            Some(name) => vec![self.field(name)?],
            None => self.fields.values().map(Vec::as_slice).collect(),
        };

        let level_radial = match vertical {
            VerticalCoordinate::LevelMean => Some(self.level_altitudes()?),
            VerticalCoordinate::Level => Some(self.levels.clone()),
            VerticalCoordinate::Geometric => {
                if self.heights.len() != shape.len() {
                    return Err(GridProcessorError::field_not_found("heights"));
                }
                None
            }
        };

        let longitudes: Vec<f64> = self
            .longitudes
            .iter()
            .map(|&lon| convention.normalize(lon))
            .collect();

        let plane = shape.horizontal_len();
        let samples: Vec<SourceSample> = (0..shape.len())
            .into_par_iter()
            .map(|flat| {
                let (level, lat, lon) = (
                    flat / plane,
                    (flat % plane) / shape.longitudes,
                    flat % shape.longitudes,
                );
                let radial = match &level_radial {
                    Some(per_level) => per_level[level],
                    None => self.heights[flat],
                };
                let coordinate = NativeCoordinate::new(radial, self.latitudes[lat], longitudes[lon]);
                SourceSample::new(flat, coordinate).with_values(checked.iter().map(|c| c[flat]))
            })
            .collect();

        let axes = level_radial.map(|radial| SourceAxes {
            radial,
            latitude: self.latitudes.clone(),
            longitude: longitudes.clone(),
        });

        debug!(
            shape = %shape,
            checked_fields = checked.len(),
            vertical = %vertical,
            "Built source samples"
        );

        Ok(SampleSet {
            shape,
            samples,
            axes,
        })
    }
}
