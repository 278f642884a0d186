//! Uniform Cartesian render grid.
//!
//! Cells are laid out x-fastest: the flat index of cell `(i, j, k)` is
//! `(k * ny + j) * nx + i`. Cell centres sit at
//! `min + (index + 0.5) * cell_width` along each axis.

use std::collections::BTreeMap;

use nalgebra::Point3;
use rayon::prelude::*;

use projection::GeocentricTransformer;
use volume_common::{CartesianBounds, NativeBounds};

use crate::error::{GridProcessorError, Result};

/// A uniform grid of cells over a Cartesian box, holding one array per
/// raw field.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderGrid {
    bounds: CartesianBounds,
    resolution: [usize; 3],
    cell_width: [f64; 3],
    fields: BTreeMap<String, Vec<f64>>,
}

impl RenderGrid {
    /// Create an empty grid. Every resolution component must be > 0.
    pub fn new(bounds: CartesianBounds, resolution: [usize; 3]) -> Result<Self> {
        if resolution.iter().any(|&n| n == 0) {
            return Err(GridProcessorError::invalid_config(format!(
                "grid resolution must be > 0 on every axis, got {:?}",
                resolution
            )));
        }

        for axis in 0..3 {
            let width = bounds.width(axis);
            if !width.is_finite() || width < 0.0 {
                return Err(GridProcessorError::invalid_config(format!(
                    "invalid extent {} on axis {}",
                    width, axis
                )));
            }
        }

        let cell_width = [
            bounds.width(0) / resolution[0] as f64,
            bounds.width(1) / resolution[1] as f64,
            bounds.width(2) / resolution[2] as f64,
        ];

        Ok(Self {
            bounds,
            resolution,
            cell_width,
            fields: BTreeMap::new(),
        })
    }

    /// Grid spanning the Cartesian extent of a native box.
    pub fn covering(
        transformer: &GeocentricTransformer,
        native: &NativeBounds,
        resolution: [usize; 3],
    ) -> Result<Self> {
        let bounds = transformer.cartesian_bounds(native)?;
        Self::new(bounds, resolution)
    }

    pub fn bounds(&self) -> &CartesianBounds {
        &self.bounds
    }

    pub fn resolution(&self) -> [usize; 3] {
        self.resolution
    }

    pub fn cell_width(&self) -> [f64; 3] {
        self.cell_width
    }

    /// Total number of cells.
    pub fn len(&self) -> usize {
        self.resolution.iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flat index of cell `(i, j, k)`, or `None` outside the grid.
    #[inline]
    pub fn flat_index(&self, i: usize, j: usize, k: usize) -> Option<usize> {
        let [nx, ny, nz] = self.resolution;
        if i >= nx || j >= ny || k >= nz {
            return None;
        }
        Some((k * ny + j) * nx + i)
    }

    /// Inverse of [`RenderGrid::flat_index`].
    #[inline]
    pub fn unravel(&self, flat: usize) -> Option<[usize; 3]> {
        let [nx, ny, _] = self.resolution;
        if flat >= self.len() {
            return None;
        }
        Some([flat % nx, (flat / nx) % ny, flat / (nx * ny)])
    }

    /// Centre of cell `(i, j, k)`. Indices are not bounds checked.
    #[inline]
    pub fn cell_center(&self, i: usize, j: usize, k: usize) -> Point3<f64> {
        let min = self.bounds.min;
        Point3::new(
            min[0] + (i as f64 + 0.5) * self.cell_width[0],
            min[1] + (j as f64 + 0.5) * self.cell_width[1],
            min[2] + (k as f64 + 0.5) * self.cell_width[2],
        )
    }

    /// Centre of the cell at a flat index.
    pub fn cell_center_flat(&self, flat: usize) -> Option<Point3<f64>> {
        let [i, j, k] = self.unravel(flat)?;
        Some(self.cell_center(i, j, k))
    }

    /// All cell centres in flat order.
    pub fn cell_centers(&self) -> Vec<Point3<f64>> {
        let [nx, ny, _] = self.resolution;
        (0..self.len())
            .into_par_iter()
            .map(|flat| {
                let i = flat % nx;
                let j = (flat / nx) % ny;
                let k = flat / (nx * ny);
                self.cell_center(i, j, k)
            })
            .collect()
    }

    /// Store a raw field, replacing any previous array of the same name.
    pub fn set_field(&mut self, name: impl Into<String>, values: Vec<f64>) -> Result<()> {
        let name = name.into();
        if values.len() != self.len() {
            return Err(GridProcessorError::dimension_mismatch(format!(
                "field {} has {} values, grid has {} cells",
                name,
                values.len(),
                self.len()
            )));
        }
        self.fields.insert(name, values);
        Ok(())
    }

    pub fn field(&self, name: &str) -> Option<&[f64]> {
        self.fields.get(name).map(Vec::as_slice)
    }

    pub fn remove_field(&mut self, name: &str) -> Option<Vec<f64>> {
        self.fields.remove(name)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn fields(&self) -> &BTreeMap<String, Vec<f64>> {
        &self.fields
    }
}
