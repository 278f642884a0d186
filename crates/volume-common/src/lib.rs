//! Common types and utilities shared across the regridding crates.

pub mod bbox;
pub mod coords;
pub mod grid;

pub use bbox::{BoundsError, CartesianBounds, NativeBounds};
pub use coords::{LongitudeConvention, NativeCoordinate};
pub use grid::{GridShape, GridIndex};
