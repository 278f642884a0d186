//! Boundary overlays projected into the rendering frame.
//!
//! Political or coastline boundaries arrive as lon/lat polylines. Each
//! polyline is projected at a fixed radial value and broken into line
//! segments that a renderer can draw on top of the volume.

use nalgebra::Point3;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{ProjectionError, Result};
use crate::geocentric::GeocentricTransformer;

/// A segment between two Cartesian points.
pub type LineSegment = [Point3<f64>; 2];

/// A lon/lat polyline in degrees.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Polyline {
    pub longitudes: Vec<f64>,
    pub latitudes: Vec<f64>,
}

impl Polyline {
    pub fn new(longitudes: Vec<f64>, latitudes: Vec<f64>) -> Self {
        Self {
            longitudes,
            latitudes,
        }
    }
}

/// Project one polyline at `radial` and return its consecutive segments.
///
/// A polyline with fewer than two vertices yields no segments.
pub fn polyline_segments(
    transformer: &GeocentricTransformer,
    longitudes: &[f64],
    latitudes: &[f64],
    radial: f64,
) -> Result<Vec<LineSegment>> {
    if longitudes.len() != latitudes.len() {
        return Err(ProjectionError::LengthMismatch {
            longitudes: longitudes.len(),
            latitudes: latitudes.len(),
        });
    }

    let points: Vec<Point3<f64>> = longitudes
        .iter()
        .zip(latitudes)
        .map(|(&lon, &lat)| transformer.to_transformed(radial, lat, lon))
        .collect();

    Ok(points.windows(2).map(|w| [w[0], w[1]]).collect())
}

/// Project many polylines in parallel and concatenate their segments.
///
/// Segment order follows the input order of the polylines.
pub fn boundary_segments(
    transformer: &GeocentricTransformer,
    polylines: &[Polyline],
    radial: f64,
) -> Result<Vec<LineSegment>> {
    let per_line: Vec<Vec<LineSegment>> = polylines
        .par_iter()
        .map(|line| polyline_segments(transformer, &line.longitudes, &line.latitudes, radial))
        .collect::<Result<_>>()?;

    Ok(per_line.into_iter().flatten().collect())
}
