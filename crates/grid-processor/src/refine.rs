//! Block refinement of the render grid.
//!
//! The grid is recursively split into blocks. Each block is classified from
//! the native envelope of its cell centres before any cell is evaluated:
//! blocks that cannot reach the source domain are dropped, fully covered
//! blocks are kept whole and partially covered blocks are split until they
//! reach the minimum size or the split budget runs out. Only cells of kept
//! blocks are mapped back to native coordinates and resampled.

use std::collections::VecDeque;

use projection::GeocentricTransformer;
use volume_common::{CartesianBounds, NativeBounds};

use crate::config::RefineConfig;
use crate::render_grid::RenderGrid;

/// How much of a block lies inside the source domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coverage {
    Full,
    Partial,
}

/// An axis-aligned block of render grid cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// First cell `(i, j, k)`.
    pub start: [usize; 3],
    /// Cells along each axis.
    pub size: [usize; 3],
    pub coverage: Coverage,
}

impl Block {
    pub fn len(&self) -> usize {
        self.size.iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flat indices of the block's cells in an x-fastest grid of
    /// `resolution`.
    pub fn cells(&self, resolution: [usize; 3]) -> impl Iterator<Item = usize> + '_ {
        let [nx, ny, _] = resolution;
        let [i0, j0, k0] = self.start;
        let [sx, sy, sz] = self.size;
        (k0..k0 + sz).flat_map(move |k| {
            (j0..j0 + sy).flat_map(move |j| (i0..i0 + sx).map(move |i| (k * ny + j) * nx + i))
        })
    }

    /// Box spanned by the centres of the block's cells. `None` for an
    /// empty block.
    pub fn center_bounds(&self, grid: &RenderGrid) -> Option<CartesianBounds> {
        if self.is_empty() {
            return None;
        }
        let [i0, j0, k0] = self.start;
        let [sx, sy, sz] = self.size;
        let lo = grid.cell_center(i0, j0, k0);
        let hi = grid.cell_center(i0 + sx - 1, j0 + sy - 1, k0 + sz - 1);
        Some(CartesianBounds::new([lo.x, lo.y, lo.z], [hi.x, hi.y, hi.z]))
    }
}

/// Blocks selected for resampling.
#[derive(Debug, Clone, Default)]
pub struct RefinePlan {
    pub blocks: Vec<Block>,
    /// Number of splits performed.
    pub iterations: usize,
    /// Number of blocks dropped as fully outside.
    pub dropped: usize,
}

impl RefinePlan {
    /// Cells covered by kept blocks.
    pub fn cell_count(&self) -> usize {
        self.blocks.iter().map(Block::len).sum()
    }
}

/// Classify a block against native `bounds` from the envelope of its cell
/// centres.
///
/// `None` means no cell centre of the block can map inside `bounds`.
/// `bounds` must already be normalized to the transformer's convention.
pub fn block_coverage(
    grid: &RenderGrid,
    transformer: &GeocentricTransformer,
    bounds: &NativeBounds,
    block: &Block,
) -> Option<Coverage> {
    let envelope = transformer.native_envelope(&block.center_bounds(grid)?);
    if !envelope.intersects(bounds) {
        None
    } else if envelope.within(bounds) {
        Some(Coverage::Full)
    } else {
        Some(Coverage::Partial)
    }
}

/// Plan the blocks to resample.
///
/// `classify` returns the coverage of a block, or `None` when none of its
/// cells can lie inside the source domain. When refinement is disabled the
/// whole grid is classified once and kept or dropped as a single block.
pub fn plan_blocks<F>(resolution: [usize; 3], config: &RefineConfig, mut classify: F) -> RefinePlan
where
    F: FnMut(&Block) -> Option<Coverage>,
{
    let mut plan = RefinePlan::default();
    let root = Block {
        start: [0; 3],
        size: resolution,
        coverage: Coverage::Partial,
    };
    if root.is_empty() {
        return plan;
    }

    let mut queue = VecDeque::from([root]);
    while let Some(mut block) = queue.pop_front() {
        let Some(coverage) = classify(&block) else {
            plan.dropped += 1;
            continue;
        };
        block.coverage = coverage;

        if coverage == Coverage::Full
            || !config.enabled
            || plan.iterations >= config.max_iterations
        {
            plan.blocks.push(block);
            continue;
        }

        match split(&block, config) {
            Some(children) => {
                plan.iterations += 1;
                queue.extend(children);
            }
            None => plan.blocks.push(block),
        }
    }

    plan
}

fn split(block: &Block, config: &RefineConfig) -> Option<Vec<Block>> {
    let mut parts = [1usize; 3];
    for axis in 0..3 {
        let size = block.size[axis];
        if size >= 2 * config.min_block_size {
            parts[axis] = config.refine_by.min(size / config.min_block_size);
        }
    }
    if parts.iter().all(|&p| p < 2) {
        return None;
    }

    let ranges: Vec<Vec<(usize, usize)>> = (0..3)
        .map(|axis| {
            let (start, size, n) = (block.start[axis], block.size[axis], parts[axis]);
            (0..n)
                .map(|p| {
                    let lo = start + size * p / n;
                    let hi = start + size * (p + 1) / n;
                    (lo, hi - lo)
                })
                .collect()
        })
        .collect();

    let mut children = Vec::with_capacity(parts.iter().product());
    for &(k0, sz) in &ranges[2] {
        for &(j0, sy) in &ranges[1] {
            for &(i0, sx) in &ranges[0] {
                children.push(Block {
                    start: [i0, j0, k0],
                    size: [sx, sy, sz],
                    coverage: Coverage::Partial,
                });
            }
        }
    }
    Some(children)
}
