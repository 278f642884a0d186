//! Coordinate transformations between native geophysical coordinates and
//! the Cartesian rendering frame.
//!
//! The transformer maps `(radial, latitude, longitude)` samples onto a
//! planet-centred `(x, y, z)` frame. The radial axis can be exaggerated by a
//! scale factor without touching the spherical projection itself, and the
//! inverse transform divides the same factor back out.

pub mod error;
pub mod geocentric;
pub mod overlay;

pub use error::{ProjectionError, Result};
pub use geocentric::{
    GeocentricTransformer, NativeEnvelope, RadialType, TransformedCoordinate, TransformerConfig,
    EARTH_RADIUS_M,
};
pub use overlay::{boundary_segments, polyline_segments, LineSegment, Polyline};
