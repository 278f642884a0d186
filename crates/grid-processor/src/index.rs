//! Spatial index over finite source samples.
//!
//! The index is an immutable k-d tree bulk-loaded once from the native
//! coordinates of every finite sample. Level-based vertical coordinates put
//! every node of a level on the same radial value, so the tree must cope
//! with long runs of repeated values on one axis.

use kiddo::{ImmutableKdTree, SquaredEuclidean};
use tracing::debug;

use volume_common::{GridIndex, GridShape, NativeCoordinate};

use crate::error::{GridProcessorError, Result};
use crate::types::{AxisNormalization, AxisScale, NearestMatch, SourceSample};

/// Immutable nearest-neighbour index mapping native coordinates to flat
/// source indices.
pub struct SpatialIndex {
    tree: ImmutableKdTree<f64, 3>,
    /// Tree entry -> flat source index.
    flat_indices: Vec<usize>,
    scale: AxisScale,
    shape: GridShape,
    excluded: usize,
}

impl SpatialIndex {
    /// Build the index from the finite samples.
    ///
    /// Fails with [`GridProcessorError::EmptyIndex`] when no sample is
    /// finite.
    pub fn build(
        samples: &[SourceSample],
        shape: GridShape,
        normalization: AxisNormalization,
    ) -> Result<Self> {
        let finite: Vec<&SourceSample> = samples.iter().filter(|s| s.finite).collect();
        if finite.is_empty() {
            return Err(GridProcessorError::EmptyIndex {
                total: samples.len(),
            });
        }

        let scale = AxisScale::fit(normalization, finite.iter().map(|s| &s.coordinate));
        let entries: Vec<[f64; 3]> = finite.iter().map(|s| scale.apply(&s.coordinate)).collect();
        let flat_indices: Vec<usize> = finite.iter().map(|s| s.flat_index).collect();
        let tree = ImmutableKdTree::new_from_slice(&entries);

        let excluded = samples.len() - finite.len();
        debug!(
            entries = flat_indices.len(),
            excluded = excluded,
            normalization = %normalization,
            "Built spatial index"
        );

        Ok(Self {
            tree,
            flat_indices,
            scale,
            shape,
            excluded,
        })
    }

    /// Number of samples in the index.
    pub fn len(&self) -> usize {
        self.flat_indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flat_indices.is_empty()
    }

    /// Number of samples left out because they were not finite.
    pub fn excluded(&self) -> usize {
        self.excluded
    }

    pub fn shape(&self) -> GridShape {
        self.shape
    }

    pub fn scale(&self) -> AxisScale {
        self.scale
    }

    /// Flat source indices held by the index, in entry order.
    pub fn flat_indices(&self) -> &[usize] {
        &self.flat_indices
    }

    /// Nearest finite sample to `target`. Returns `None` for non-finite
    /// targets.
    pub fn nearest(&self, target: &NativeCoordinate) -> Option<NearestMatch> {
        if !target.is_finite() {
            return None;
        }

        let query = self.scale.apply(target);
        let found = self.tree.nearest_one::<SquaredEuclidean>(&query);
        let flat_index = *self.flat_indices.get(found.item as usize)?;

        Some(NearestMatch {
            flat_index,
            distance: found.distance.sqrt(),
        })
    }

    /// Unravel a flat source index into `(level, lat, lon)`.
    pub fn unravel(&self, flat_index: usize) -> Option<GridIndex> {
        self.shape.unravel(flat_index)
    }
}

impl std::fmt::Debug for SpatialIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpatialIndex")
            .field("entries", &self.flat_indices.len())
            .field("excluded", &self.excluded)
            .field("shape", &self.shape)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_samples(values: &[f64]) -> Vec<SourceSample> {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| {
                SourceSample::new(i, NativeCoordinate::new(0.0, 0.0, i as f64)).with_values([v])
            })
            .collect()
    }

    #[test]
    fn test_excludes_non_finite() {
        let mut values = vec![1.0; 10];
        values[2] = f64::NAN;
        values[5] = f64::INFINITY;
        values[8] = f64::NAN;
        let samples = line_samples(&values);

        let index =
            SpatialIndex::build(&samples, GridShape::new(1, 1, 10), AxisNormalization::None)
                .unwrap();
        assert_eq!(index.len(), 7);
        assert_eq!(index.excluded(), 3);

        for i in 0..10 {
            let m = index
                .nearest(&NativeCoordinate::new(0.0, 0.0, i as f64))
                .unwrap();
            assert!(![2, 5, 8].contains(&m.flat_index));
        }
    }

    #[test]
    fn test_empty_index() {
        let samples = line_samples(&[f64::NAN; 4]);
        let err = SpatialIndex::build(&samples, GridShape::new(1, 1, 4), AxisNormalization::None)
            .unwrap_err();
        assert!(matches!(err, GridProcessorError::EmptyIndex { total: 4 }));
    }

    #[test]
    fn test_non_finite_query() {
        let samples = line_samples(&[1.0, 2.0]);
        let index =
            SpatialIndex::build(&samples, GridShape::new(1, 1, 2), AxisNormalization::None)
                .unwrap();
        assert!(index
            .nearest(&NativeCoordinate::new(f64::NAN, 0.0, 0.0))
            .is_none());
    }

    #[test]
    fn test_normalized_distance() {
        // radial spans 1000, longitude spans 1: normalized both to unit extent
        let samples = vec![
            SourceSample::new(0, NativeCoordinate::new(0.0, 0.0, 0.0)),
            SourceSample::new(1, NativeCoordinate::new(1000.0, 0.0, 1.0)),
        ];
        let raw = SpatialIndex::build(&samples, GridShape::new(2, 1, 1), AxisNormalization::None)
            .unwrap();
        let scaled =
            SpatialIndex::build(&samples, GridShape::new(2, 1, 1), AxisNormalization::Extent)
                .unwrap();

        // 400 m up, 0.9 degrees east
        let q = NativeCoordinate::new(400.0, 0.0, 0.9);
        assert_eq!(raw.nearest(&q).unwrap().flat_index, 0);
        assert_eq!(scaled.nearest(&q).unwrap().flat_index, 1);
    }
}
