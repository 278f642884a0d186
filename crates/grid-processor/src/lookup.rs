//! Nearest-neighbour lookup strategies.

use volume_common::{GridIndex, GridShape, NativeCoordinate};

use crate::error::{GridProcessorError, Result};
use crate::index::SpatialIndex;
use crate::types::{NearestMatch, SourceAxes, SourceSample};

/// Finds the nearest finite source sample for a native coordinate.
///
/// Implementations are immutable after construction and shared read-only
/// across worker threads.
pub trait NearestLookup: Send + Sync {
    /// Nearest finite sample, or `None` for a non-finite target.
    fn nearest(&self, target: &NativeCoordinate) -> Option<NearestMatch>;

    /// Number of samples that can be returned.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Short name for logging.
    fn name(&self) -> &'static str;
}

impl NearestLookup for SpatialIndex {
    fn nearest(&self, target: &NativeCoordinate) -> Option<NearestMatch> {
        SpatialIndex::nearest(self, target)
    }

    fn len(&self) -> usize {
        SpatialIndex::len(self)
    }

    fn name(&self) -> &'static str {
        "kdtree"
    }
}

/// One coordinate axis sorted by value, remembering original positions.
#[derive(Debug, Clone)]
struct SortedAxis {
    entries: Vec<(f64, usize)>,
}

impl SortedAxis {
    fn new(values: &[f64]) -> Self {
        let mut entries: Vec<(f64, usize)> = values
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, v)| v.is_finite())
            .map(|(i, v)| (v, i))
            .collect();
        entries.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        Self { entries }
    }

    /// Position of the value nearest to `x`; the lower position wins ties.
    fn nearest(&self, x: f64) -> Option<usize> {
        let p = self.entries.partition_point(|(v, _)| *v < x);
        let below = p.checked_sub(1).and_then(|i| self.entries.get(i));
        let above = self.entries.get(p);

        match (below, above) {
            (Some(&(vb, ib)), Some(&(va, ia))) => {
                let db = x - vb;
                let da = va - x;
                if db < da || (db == da && ib < ia) {
                    Some(ib)
                } else {
                    Some(ia)
                }
            }
            (Some(&(_, i)), None) | (None, Some(&(_, i))) => Some(i),
            (None, None) => None,
        }
    }
}

/// Per-axis nearest lookup on a rectilinear source grid.
///
/// The nearest node is found independently along the radial, latitude and
/// longitude axes. When that node was excluded from the spatial index the
/// query falls back to the index, so results always refer to finite
/// samples.
#[derive(Debug)]
pub struct RectilinearLookup {
    radial: SortedAxis,
    latitude: SortedAxis,
    longitude: SortedAxis,
    axes: SourceAxes,
    shape: GridShape,
    finite: Vec<bool>,
    fallback: SpatialIndex,
}

impl RectilinearLookup {
    /// Build the lookup from 1-D axes and the samples of the same grid.
    pub fn new(
        axes: SourceAxes,
        shape: GridShape,
        samples: &[SourceSample],
        fallback: SpatialIndex,
    ) -> Result<Self> {
        if axes.radial.len() != shape.levels
            || axes.latitude.len() != shape.latitudes
            || axes.longitude.len() != shape.longitudes
        {
            return Err(GridProcessorError::dimension_mismatch(format!(
                "axes ({}, {}, {}) do not match grid {}",
                axes.radial.len(),
                axes.latitude.len(),
                axes.longitude.len(),
                shape
            )));
        }

        let mut finite = vec![false; shape.len()];
        for s in samples {
            if let Some(slot) = finite.get_mut(s.flat_index) {
                *slot = s.finite;
            }
        }

        Ok(Self {
            radial: SortedAxis::new(&axes.radial),
            latitude: SortedAxis::new(&axes.latitude),
            longitude: SortedAxis::new(&axes.longitude),
            axes,
            shape,
            finite,
            fallback,
        })
    }

    pub fn shape(&self) -> GridShape {
        self.shape
    }

    /// Nearest node per axis, ignoring finiteness.
    pub fn nearest_node(&self, target: &NativeCoordinate) -> Option<GridIndex> {
        if !target.is_finite() {
            return None;
        }
        Some(GridIndex {
            level: self.radial.nearest(target.radial)?,
            lat: self.latitude.nearest(target.latitude)?,
            lon: self.longitude.nearest(target.longitude)?,
        })
    }

    fn distance(&self, target: &NativeCoordinate, node: GridIndex) -> f64 {
        let scale = self.fallback.scale();
        let node = NativeCoordinate::new(
            self.axes.radial[node.level],
            self.axes.latitude[node.lat],
            self.axes.longitude[node.lon],
        );
        let a = scale.apply(target);
        let b = scale.apply(&node);
        let d2: f64 = a.iter().zip(&b).map(|(x, y)| (x - y) * (x - y)).sum();
        d2.sqrt()
    }
}

impl NearestLookup for RectilinearLookup {
    fn nearest(&self, target: &NativeCoordinate) -> Option<NearestMatch> {
        let node = self.nearest_node(target)?;
        let flat_index = self.shape.flat_index(node)?;

        if self.finite.get(flat_index).copied().unwrap_or(false) {
            Some(NearestMatch {
                flat_index,
                distance: self.distance(target, node),
            })
        } else {
            self.fallback.nearest(target)
        }
    }

    fn len(&self) -> usize {
        self.fallback.len()
    }

    fn name(&self) -> &'static str {
        "rectilinear"
    }
}
