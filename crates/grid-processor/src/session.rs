//! Caller-owned render session.
//!
//! A session bundles the transformer, the populated render grid and the
//! derived fields computed from it. Derived fields are recomputed whenever
//! a raw field is replaced.

use tracing::debug;

use projection::GeocentricTransformer;
use volume_common::NativeBounds;

use crate::derived::{derive_all, DerivedFieldSpec, DerivedFields};
use crate::error::Result;
use crate::render_grid::RenderGrid;

/// Resampled data ready for a volume renderer.
#[derive(Debug, Clone)]
pub struct RenderSession {
    transformer: GeocentricTransformer,
    native_bounds: NativeBounds,
    grid: RenderGrid,
    derived_specs: Vec<DerivedFieldSpec>,
    derived: DerivedFields,
}

impl RenderSession {
    /// Create a session, computing every derived field from `grid`.
    pub fn new(
        transformer: GeocentricTransformer,
        native_bounds: NativeBounds,
        grid: RenderGrid,
        derived_specs: Vec<DerivedFieldSpec>,
    ) -> Result<Self> {
        let derived = derive_all(&grid, &derived_specs)?;
        Ok(Self {
            transformer,
            native_bounds,
            grid,
            derived_specs,
            derived,
        })
    }

    pub fn transformer(&self) -> &GeocentricTransformer {
        &self.transformer
    }

    pub fn native_bounds(&self) -> &NativeBounds {
        &self.native_bounds
    }

    pub fn grid(&self) -> &RenderGrid {
        &self.grid
    }

    pub fn derived(&self) -> &DerivedFields {
        &self.derived
    }

    pub fn derived_specs(&self) -> &[DerivedFieldSpec] {
        &self.derived_specs
    }

    /// Look up a raw or derived field. Raw fields take precedence.
    pub fn field(&self, name: &str) -> Option<&[f64]> {
        self.grid
            .field(name)
            .or_else(|| self.derived.get(name).map(Vec::as_slice))
    }

    /// Names of all raw fields followed by all derived fields.
    pub fn field_names(&self) -> Vec<&str> {
        self.grid
            .field_names()
            .chain(self.derived.keys().map(String::as_str))
            .collect()
    }

    /// Replace a raw field and recompute all derived fields.
    ///
    /// On error the session is left unchanged.
    pub fn set_raw_field(&mut self, name: &str, values: Vec<f64>) -> Result<()> {
        let previous = self.grid.remove_field(name);
        if let Err(e) = self.grid.set_field(name, values) {
            if let Some(prev) = previous {
                self.grid.set_field(name, prev)?;
            }
            return Err(e);
        }

        match derive_all(&self.grid, &self.derived_specs) {
            Ok(derived) => {
                debug!(field = name, derived = derived.len(), "Recomputed derived fields");
                self.derived = derived;
                Ok(())
            }
            Err(e) => {
                self.grid.remove_field(name);
                if let Some(prev) = previous {
                    self.grid.set_field(name, prev)?;
                }
                Err(e)
            }
        }
    }

    /// Split the session into its grid and derived fields.
    pub fn into_parts(self) -> (RenderGrid, DerivedFields) {
        (self.grid, self.derived)
    }
}
