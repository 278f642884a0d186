//! Native and Cartesian bounding boxes.

use serde::{Deserialize, Serialize};

use crate::coords::{LongitudeConvention, NativeCoordinate};

/// A box in native coordinates.
///
/// Each axis is an inclusive `[min, max]` pair. Longitudes are given in
/// degrees and are wrapped into the active convention before use.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NativeBounds {
    #[serde(alias = "altitude", alias = "depth", alias = "radius")]
    pub radial: [f64; 2],
    pub latitude: [f64; 2],
    pub longitude: [f64; 2],
}

impl NativeBounds {
    /// Create a new box, checking that every range is finite and ordered.
    pub fn new(
        radial: [f64; 2],
        latitude: [f64; 2],
        longitude: [f64; 2],
    ) -> Result<Self, BoundsError> {
        let bounds = Self {
            radial,
            latitude,
            longitude,
        };
        bounds.validate()?;
        Ok(bounds)
    }

    /// Parse a comma-separated string:
    /// `"rmin,rmax,latmin,latmax,lonmin,lonmax"`.
    pub fn from_csv_string(s: &str) -> Result<Self, BoundsError> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 6 {
            return Err(BoundsError::InvalidFormat(s.to_string()));
        }

        let mut values = [0.0f64; 6];
        for (slot, part) in values.iter_mut().zip(&parts) {
            *slot = part
                .parse()
                .map_err(|_| BoundsError::InvalidNumber(part.to_string()))?;
        }

        Self::new(
            [values[0], values[1]],
            [values[2], values[3]],
            [values[4], values[5]],
        )
    }

    /// Check that each range is finite with `min <= max` and latitudes
    /// inside [-90, 90].
    pub fn validate(&self) -> Result<(), BoundsError> {
        for (axis, range) in [
            ("radial", self.radial),
            ("latitude", self.latitude),
            ("longitude", self.longitude),
        ] {
            if !range[0].is_finite() || !range[1].is_finite() {
                return Err(BoundsError::NonFinite(axis));
            }
            if range[0] > range[1] {
                return Err(BoundsError::Inverted {
                    axis,
                    min: range[0],
                    max: range[1],
                });
            }
        }

        if self.latitude[0] < -90.0 || self.latitude[1] > 90.0 {
            return Err(BoundsError::LatitudeOutOfRange(
                self.latitude[0],
                self.latitude[1],
            ));
        }

        Ok(())
    }

    /// Copy with both longitude limits wrapped into `convention`.
    ///
    /// Fails when the wrapped range would cross the convention's seam,
    /// e.g. `[170, 190]` under the signed convention.
    pub fn normalized(&self, convention: LongitudeConvention) -> Result<Self, BoundsError> {
        // A full-circle range covers every longitude in any convention.
        if self.longitude[1] - self.longitude[0] >= 360.0 {
            let full = match convention {
                LongitudeConvention::Signed => [-180.0, 180.0],
                LongitudeConvention::Positive => [0.0, 360.0],
            };
            return Ok(Self {
                longitude: full,
                ..*self
            });
        }

        let span = self.longitude[1] - self.longitude[0];
        let (lower, upper) = match convention {
            LongitudeConvention::Signed => (-180.0, 180.0),
            LongitudeConvention::Positive => (0.0, 360.0),
        };

        let mut lo = convention.normalize(self.longitude[0]);
        if lo + span > upper + 1e-9 && lo - 360.0 >= lower {
            // [-180, x] normalizes its lower edge to 180 under the signed convention
            lo -= 360.0;
        }
        let hi = if lo == self.longitude[0] {
            self.longitude[1]
        } else {
            lo + span
        };
        if hi > upper + 1e-9 {
            return Err(BoundsError::CrossesSeam {
                min: self.longitude[0],
                max: self.longitude[1],
                convention,
            });
        }

        Ok(Self {
            longitude: [lo, hi],
            ..*self
        })
    }

    /// Check whether a native coordinate lies inside the box.
    ///
    /// The coordinate's longitude is wrapped into `convention`; the box is
    /// expected to have been normalized with the same convention.
    pub fn contains(&self, coord: &NativeCoordinate, convention: LongitudeConvention) -> bool {
        let lon = convention.normalize(coord.longitude);
        coord.radial >= self.radial[0]
            && coord.radial <= self.radial[1]
            && coord.latitude >= self.latitude[0]
            && coord.latitude <= self.latitude[1]
            && lon >= self.longitude[0]
            && lon <= self.longitude[1]
    }

    /// Check whether a latitude/longitude pair lies inside the horizontal
    /// extent of the box, ignoring the radial axis.
    pub fn contains_horizontal(
        &self,
        latitude: f64,
        longitude: f64,
        convention: LongitudeConvention,
    ) -> bool {
        let lon = convention.normalize(longitude);
        latitude >= self.latitude[0]
            && latitude <= self.latitude[1]
            && lon >= self.longitude[0]
            && lon <= self.longitude[1]
    }
}

/// An axis-aligned box in Cartesian space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CartesianBounds {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

impl CartesianBounds {
    pub fn new(min: [f64; 3], max: [f64; 3]) -> Self {
        Self { min, max }
    }

    /// Smallest box containing every point. Returns `None` for an empty
    /// iterator.
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = [f64; 3]>,
    {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bounds = Self::new(first, first);
        for p in iter {
            for axis in 0..3 {
                bounds.min[axis] = bounds.min[axis].min(p[axis]);
                bounds.max[axis] = bounds.max[axis].max(p[axis]);
            }
        }
        Some(bounds)
    }

    /// Extent along one axis (0 = x, 1 = y, 2 = z).
    pub fn width(&self, axis: usize) -> f64 {
        self.max[axis] - self.min[axis]
    }

    pub fn center(&self) -> [f64; 3] {
        [
            (self.min[0] + self.max[0]) / 2.0,
            (self.min[1] + self.max[1]) / 2.0,
            (self.min[2] + self.max[2]) / 2.0,
        ]
    }

    pub fn contains(&self, p: [f64; 3]) -> bool {
        (0..3).all(|axis| p[axis] >= self.min[axis] && p[axis] <= self.max[axis])
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BoundsError {
    #[error("Invalid bounds format: {0}. Expected 'rmin,rmax,latmin,latmax,lonmin,lonmax'")]
    InvalidFormat(String),

    #[error("Invalid number in bounds: {0}")]
    InvalidNumber(String),

    #[error("Non-finite {0} bounds")]
    NonFinite(&'static str),

    #[error("Inverted {axis} bounds: min {min} > max {max}")]
    Inverted {
        axis: &'static str,
        min: f64,
        max: f64,
    },

    #[error("Latitude bounds [{0}, {1}] outside [-90, 90]")]
    LatitudeOutOfRange(f64, f64),

    #[error("Longitude bounds [{min}, {max}] cross the {convention} longitude seam")]
    CrossesSeam {
        min: f64,
        max: f64,
        convention: LongitudeConvention,
    },
}
