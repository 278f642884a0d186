//! Nearest-neighbour regridding of geophysical samples onto uniform
//! Cartesian volumes.
//!
//! Source fields live on a rectilinear `(level, lat, lon)` grid. Each node
//! gets a native coordinate `(radial, latitude, longitude)`; finite nodes
//! go into a spatial index. A render grid of Cartesian cells is laid over
//! the projected domain, every cell centre is mapped back to native
//! coordinates, and the nearest finite node supplies the cell's values.
//!
//! # Architecture
//!
//! ```text
//! SourceDataset
//!      │
//!      ├─► horizontal_aggregates (QV_mean, QV_max, QV_min)
//!      │
//!      ├─► samples() ──► SpatialIndex / RectilinearLookup
//!      │
//!      ▼
//! GridResampler::resample_refined(grid, transformer, bounds)
//!      │
//!      ├─► plan_blocks ──► block envelope misses bounds: fill value
//!      │
//!      ├─► cell centre ──► to_native ──► inside bounds?
//!      │         │
//!      │         ├─► no: fill value
//!      │         │
//!      │         └─► yes: nearest finite sample
//!      │
//!      ▼
//! RenderSession (raw fields + derived fields)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use grid_processor::{build_session, GridProcessorConfig, SourceDataset};
//! use volume_common::NativeBounds;
//!
//! let dataset: SourceDataset = serde_json::from_str(&json)?;
//! let bounds = NativeBounds::new([0.0, 70_000.0], [-20.0, 75.0], [-150.0, 100.0])?;
//! let (session, report) = build_session(&dataset, &bounds, &GridProcessorConfig::humidity())?;
//!
//! let dqv = session.field("dQV_n").unwrap();
//! ```

pub mod aggregate;
pub mod config;
pub mod derived;
pub mod error;
pub mod index;
pub mod lookup;
pub mod pipeline;
pub mod refine;
pub mod render_grid;
pub mod resample;
pub mod serde_nan;
pub mod session;
pub mod source;
pub mod types;

// Re-export commonly used types at crate root
pub use aggregate::AggregationOp;
pub use config::{AggregateSpec, GridProcessorConfig, RefineConfig, ResampleConfig};
pub use derived::{
    derive_all, finite_or_zero, floor_protected, normalized_fraction, DerivedFieldSpec,
    DerivedFields, DEFAULT_FLOOR,
};
pub use error::{GridProcessorError, Result};
pub use index::SpatialIndex;
pub use lookup::{NearestLookup, RectilinearLookup};
pub use pipeline::{build_session, PipelineReport};
pub use refine::{block_coverage, plan_blocks, Block, Coverage, RefinePlan};
pub use render_grid::RenderGrid;
pub use resample::{GridResampler, ResampleStats};
pub use session::RenderSession;
pub use source::SourceDataset;
pub use types::{
    AxisNormalization, AxisScale, CellValues, LookupMethod, NearestMatch, SampleSet, SourceAxes,
    SourceSample, VerticalCoordinate,
};
