//! Nearest-neighbour resampling onto the render grid.
//!
//! Every render cell centre is mapped back to native coordinates. Cells
//! outside the native bounds receive the fill value; all others take the
//! field values of the nearest finite source sample. Resampling is
//! piecewise constant, with no blending between neighbours.

use rayon::prelude::*;
use tracing::{debug, info};

use projection::GeocentricTransformer;
use volume_common::{GridShape, NativeBounds, NativeCoordinate};

use crate::config::{GridProcessorConfig, RefineConfig, ResampleConfig};
use crate::error::{GridProcessorError, Result};
use crate::index::SpatialIndex;
use crate::lookup::{NearestLookup, RectilinearLookup};
use crate::refine::{block_coverage, plan_blocks};
use crate::render_grid::RenderGrid;
use crate::source::SourceDataset;
use crate::types::{CellValues, LookupMethod, NearestMatch, SampleSet};

/// Summary of one resampling pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResampleStats {
    /// Cells in the render grid.
    pub cells: usize,
    /// Cells whose centre was mapped back to native coordinates.
    pub evaluated: usize,
    /// Cells whose centre lies inside the native bounds.
    pub inside: usize,
    /// Cells that received source values.
    pub matched: usize,
    /// Cells set to the fill value.
    pub filled: usize,
    /// Blocks resampled (1 without refinement).
    pub blocks: usize,
    /// Refinement splits performed.
    pub iterations: usize,
}

/// Resamples source fields onto render grids.
///
/// Holds the nearest-neighbour lookup and borrows the source field columns,
/// indexed by flat source index. Immutable once built.
pub struct GridResampler<'a> {
    lookup: Box<dyn NearestLookup>,
    field_names: Vec<String>,
    columns: Vec<&'a [f64]>,
    shape: GridShape,
    fill_value: f64,
    max_match_distance: Option<f64>,
}

impl<'a> GridResampler<'a> {
    /// Build the lookup over the finite samples of `set`, resolving values
    /// from `fields` by flat source index.
    ///
    /// Fails with [`GridProcessorError::EmptyIndex`] when no sample is
    /// finite and with [`GridProcessorError::DimensionMismatch`] when a
    /// field does not match the source shape.
    pub fn build<I>(set: SampleSet, fields: I, config: &ResampleConfig) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a [f64])>,
    {
        config.validate()?;

        let shape = set.shape;
        let mut field_names = Vec::new();
        let mut columns = Vec::new();
        for (name, column) in fields {
            if column.len() != shape.len() {
                return Err(GridProcessorError::dimension_mismatch(format!(
                    "field {} has {} values, grid {} needs {}",
                    name,
                    column.len(),
                    shape,
                    shape.len()
                )));
            }
            field_names.push(name.to_string());
            columns.push(column);
        }
        if let Some(sample) = set.samples.iter().find(|s| s.flat_index >= shape.len()) {
            return Err(GridProcessorError::dimension_mismatch(format!(
                "sample index {} outside grid {}",
                sample.flat_index, shape
            )));
        }

        let index = SpatialIndex::build(&set.samples, shape, config.normalization)?;
        let excluded = index.excluded();

        let lookup: Box<dyn NearestLookup> = match config.lookup {
            LookupMethod::KdTree => Box::new(index),
            LookupMethod::Rectilinear => {
                let axes = set.axes.ok_or_else(|| {
                    GridProcessorError::invalid_config(
                        "rectilinear lookup needs level-based source axes",
                    )
                })?;
                Box::new(RectilinearLookup::new(axes, shape, &set.samples, index)?)
            }
        };

        info!(
            lookup = lookup.name(),
            entries = lookup.len(),
            excluded = excluded,
            fields = columns.len(),
            shape = %shape,
            "Built resampler"
        );

        Ok(Self {
            lookup,
            field_names,
            columns,
            shape,
            fill_value: config.fill_value,
            max_match_distance: config.max_match_distance,
        })
    }

    /// Extract samples from a dataset and build a resampler over all of its
    /// fields.
    pub fn from_dataset(dataset: &'a SourceDataset, config: &GridProcessorConfig) -> Result<Self> {
        let set = dataset.samples(
            config.vertical,
            config.transformer.longitude_convention(),
            config.mask_field.as_deref(),
        )?;
        let fields = dataset
            .fields
            .iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()));
        Self::build(set, fields, &config.resample)
    }

    pub fn field_names(&self) -> &[String] {
        &self.field_names
    }

    pub fn fill_value(&self) -> f64 {
        self.fill_value
    }

    pub fn shape(&self) -> GridShape {
        self.shape
    }

    /// Number of samples the lookup can return.
    pub fn len(&self) -> usize {
        self.lookup.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lookup.is_empty()
    }

    pub fn lookup_name(&self) -> &'static str {
        self.lookup.name()
    }

    /// Nearest finite sample within the distance cutoff.
    pub fn nearest(&self, target: &NativeCoordinate) -> Option<NearestMatch> {
        let found = self.lookup.nearest(target)?;
        match self.max_match_distance {
            Some(cutoff) if found.distance > cutoff => None,
            _ => Some(found),
        }
    }

    fn values_at(&self, flat_index: usize) -> Vec<f64> {
        self.columns.iter().map(|c| c[flat_index]).collect()
    }

    /// Field values of the nearest sample for each target.
    ///
    /// `None` marks non-finite targets and matches beyond the cutoff.
    pub fn query_cell_values(&self, targets: &[NativeCoordinate]) -> Vec<Option<CellValues>> {
        targets
            .par_iter()
            .map(|target| {
                self.nearest(target).map(|m| CellValues {
                    flat_index: m.flat_index,
                    distance: m.distance,
                    values: self.values_at(m.flat_index),
                })
            })
            .collect()
    }

    /// Query targets packed as `[radial, lat, lon, radial, lat, lon, ...]`.
    pub fn query_flat(&self, coords: &[f64], n_axes: usize) -> Result<Vec<Option<CellValues>>> {
        if n_axes != 3 {
            return Err(GridProcessorError::dimension_mismatch(format!(
                "query points have {} axes, the index has 3",
                n_axes
            )));
        }
        if coords.len() % n_axes != 0 {
            return Err(GridProcessorError::dimension_mismatch(format!(
                "{} values do not form whole {}-axis points",
                coords.len(),
                n_axes
            )));
        }

        let targets: Vec<NativeCoordinate> = coords
            .chunks_exact(n_axes)
            .map(|c| NativeCoordinate::new(c[0], c[1], c[2]))
            .collect();
        Ok(self.query_cell_values(&targets))
    }

    /// Resample every field onto `grid`, evaluating each cell inside the
    /// native bounds.
    pub fn resample(
        &self,
        grid: &mut RenderGrid,
        transformer: &GeocentricTransformer,
        bounds: &NativeBounds,
    ) -> Result<ResampleStats> {
        self.resample_refined(grid, transformer, bounds, &RefineConfig::disabled())
    }

    /// Resample every field onto `grid`, skipping blocks that lie entirely
    /// outside the native bounds.
    ///
    /// Blocks are classified before any cell is evaluated, so cells of
    /// dropped blocks are never mapped back to native coordinates or
    /// looked up. The result is the same as [`resample`](Self::resample).
    pub fn resample_refined(
        &self,
        grid: &mut RenderGrid,
        transformer: &GeocentricTransformer,
        bounds: &NativeBounds,
        refine: &RefineConfig,
    ) -> Result<ResampleStats> {
        let convention = transformer.convention();
        let bounds = bounds.normalized(convention)?;
        let resolution = grid.resolution();

        let plan = plan_blocks(resolution, refine, |block| {
            block_coverage(grid, transformer, &bounds, block)
        });
        let cells: Vec<usize> = plan
            .blocks
            .iter()
            .flat_map(|b| b.cells(resolution))
            .collect();

        debug!(
            blocks = plan.blocks.len(),
            dropped = plan.dropped,
            iterations = plan.iterations,
            cells = cells.len(),
            "Planned resampling blocks"
        );

        // Inside cells with their match
        let matches: Vec<(usize, Option<NearestMatch>)> = {
            let grid = &*grid;
            cells
                .par_iter()
                .filter_map(|&cell| {
                    let native = transformer.to_native(&grid.cell_center_flat(cell)?);
                    bounds
                        .contains(&native, convention)
                        .then(|| (cell, self.nearest(&native)))
                })
                .collect()
        };

        let mut outputs = vec![vec![self.fill_value; grid.len()]; self.columns.len()];
        outputs
            .par_iter_mut()
            .zip(self.columns.par_iter())
            .for_each(|(out, column)| {
                for &(cell, found) in &matches {
                    if let Some(m) = found {
                        out[cell] = column[m.flat_index];
                    }
                }
            });

        for (name, values) in self.field_names.iter().zip(outputs) {
            grid.set_field(name.clone(), values)?;
        }

        let matched = matches.iter().filter(|(_, m)| m.is_some()).count();
        let stats = ResampleStats {
            cells: grid.len(),
            evaluated: cells.len(),
            inside: matches.len(),
            matched,
            filled: grid.len() - matched,
            blocks: plan.blocks.len(),
            iterations: plan.iterations,
        };

        info!(
            cells = stats.cells,
            evaluated = stats.evaluated,
            inside = stats.inside,
            matched = stats.matched,
            filled = stats.filled,
            blocks = stats.blocks,
            "Resampled fields onto render grid"
        );

        Ok(stats)
    }
}

impl std::fmt::Debug for GridResampler<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GridResampler")
            .field("lookup", &self.lookup.name())
            .field("entries", &self.lookup.len())
            .field("fields", &self.field_names)
            .field("shape", &self.shape)
            .field("fill_value", &self.fill_value)
            .field("max_match_distance", &self.max_match_distance)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{SourceAxes, SourceSample};

    /// 2x2x2 grid with nodes at radial {0, 10}, lat {0, 10}, lon {0, 10}.
    fn cube() -> SampleSet {
        let shape = GridShape::new(2, 2, 2);
        let axis = vec![0.0, 10.0];
        let samples = (0..8)
            .map(|flat| {
                let idx = shape.unravel(flat).unwrap();
                let c = NativeCoordinate::new(axis[idx.level], axis[idx.lat], axis[idx.lon]);
                SourceSample::new(flat, c)
            })
            .collect();
        SampleSet {
            shape,
            samples,
            axes: Some(SourceAxes {
                radial: axis.clone(),
                latitude: axis.clone(),
                longitude: axis,
            }),
        }
    }

    /// Value `flat_index + 1` at every node.
    fn cube_values() -> Vec<f64> {
        (0..8).map(|flat| flat as f64 + 1.0).collect()
    }

    fn build<'a>(
        set: SampleSet,
        values: &'a [f64],
        config: &ResampleConfig,
    ) -> Result<GridResampler<'a>> {
        GridResampler::build(set, [("v", values)], config)
    }

    #[test]
    fn test_exact_node() {
        let values = cube_values();
        let r = build(cube(), &values, &ResampleConfig::default()).unwrap();
        let out = r.query_cell_values(&[NativeCoordinate::new(10.0, 0.0, 10.0)]);
        let cell = out[0].as_ref().unwrap();
        // level 1, lat 0, lon 1
        assert_eq!(cell.flat_index, 5);
        assert_eq!(cell.values, vec![6.0]);
        assert_eq!(cell.distance, 0.0);
    }

    #[test]
    fn test_midpoint_returns_one_neighbour() {
        let values = cube_values();
        let r = build(cube(), &values, &ResampleConfig::default()).unwrap();
        let target = NativeCoordinate::new(0.0, 0.0, 5.0);
        let first = r.query_cell_values(&[target])[0].clone().unwrap();
        assert!(first.flat_index == 0 || first.flat_index == 1);
        assert_eq!(first.distance, 5.0);

        // deterministic
        let again = r.query_cell_values(&[target])[0].clone().unwrap();
        assert_eq!(first.flat_index, again.flat_index);
    }

    #[test]
    fn test_cutoff() {
        let values = cube_values();
        let config = ResampleConfig {
            max_match_distance: Some(1.0),
            ..ResampleConfig::default()
        };
        let r = build(cube(), &values, &config).unwrap();
        let out = r.query_cell_values(&[
            NativeCoordinate::new(0.5, 0.0, 0.0),
            NativeCoordinate::new(5.0, 5.0, 5.0),
        ]);
        assert!(out[0].is_some());
        assert!(out[1].is_none());
    }

    #[test]
    fn test_query_flat_dimension_mismatch() {
        let values = cube_values();
        let r = build(cube(), &values, &ResampleConfig::default()).unwrap();
        assert!(matches!(
            r.query_flat(&[0.0, 0.0], 2),
            Err(GridProcessorError::DimensionMismatch(_))
        ));
        assert!(matches!(
            r.query_flat(&[0.0, 0.0, 0.0, 1.0], 3),
            Err(GridProcessorError::DimensionMismatch(_))
        ));
        let out = r.query_flat(&[0.0, 10.0, 0.0], 3).unwrap();
        assert_eq!(out[0].as_ref().unwrap().flat_index, 2);
    }

    #[test]
    fn test_rectilinear_needs_axes() {
        let values = cube_values();
        let mut set = cube();
        set.axes = None;
        let config = ResampleConfig {
            lookup: LookupMethod::Rectilinear,
            ..ResampleConfig::default()
        };
        assert!(matches!(
            build(set, &values, &config),
            Err(GridProcessorError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_empty_index() {
        let values = cube_values();
        let mut set = cube();
        for s in &mut set.samples {
            s.finite = false;
        }
        assert!(matches!(
            build(set, &values, &ResampleConfig::default()),
            Err(GridProcessorError::EmptyIndex { total: 8 })
        ));
    }

    #[test]
    fn test_field_length_mismatch() {
        let short = vec![1.0; 5];
        assert!(matches!(
            build(cube(), &short, &ResampleConfig::default()),
            Err(GridProcessorError::DimensionMismatch(_))
        ));
    }
}
