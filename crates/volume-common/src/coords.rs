//! Native geophysical coordinates and longitude conventions.

use serde::{Deserialize, Serialize};

/// Range convention used for longitudes.
///
/// Every longitude is wrapped into the active convention before it is
/// compared, indexed or projected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LongitudeConvention {
    /// Longitudes in (-180, 180]. Values above 180 map to `value - 360`.
    #[default]
    Signed,
    /// Longitudes in [0, 360).
    Positive,
}

impl LongitudeConvention {
    /// Select the convention from a `use_negative_longitudes` style flag.
    pub fn from_negative_flag(use_negative_longitudes: bool) -> Self {
        if use_negative_longitudes {
            Self::Signed
        } else {
            Self::Positive
        }
    }

    /// Wrap a longitude (degrees) into this convention.
    ///
    /// Values already inside the range are returned unchanged. Non-finite
    /// input is passed through.
    pub fn normalize(&self, lon: f64) -> f64 {
        if !lon.is_finite() || self.contains(lon) {
            return lon;
        }

        let mut wrapped = lon.rem_euclid(360.0);
        // rem_euclid can round up to exactly 360 for tiny negative inputs
        if wrapped >= 360.0 {
            wrapped = 0.0;
        }

        match self {
            Self::Positive => wrapped,
            Self::Signed => {
                if wrapped > 180.0 {
                    wrapped - 360.0
                } else {
                    wrapped
                }
            }
        }
    }

    /// Check whether a longitude already lies in this convention's range.
    pub fn contains(&self, lon: f64) -> bool {
        match self {
            Self::Signed => lon > -180.0 && lon <= 180.0,
            Self::Positive => (0.0..360.0).contains(&lon),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Signed => "signed",
            Self::Positive => "positive",
        }
    }
}

impl std::fmt::Display for LongitudeConvention {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A point in native coordinates: (radial, latitude, longitude).
///
/// `radial` is an altitude, depth or radius depending on how the
/// transformer interprets it. Angles are in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NativeCoordinate {
    pub radial: f64,
    pub latitude: f64,
    pub longitude: f64,
}

impl NativeCoordinate {
    pub fn new(radial: f64, latitude: f64, longitude: f64) -> Self {
        Self {
            radial,
            latitude,
            longitude,
        }
    }

    /// Build from an `[radial, latitude, longitude]` triple.
    pub fn from_array(values: [f64; 3]) -> Self {
        Self::new(values[0], values[1], values[2])
    }

    pub fn to_array(&self) -> [f64; 3] {
        [self.radial, self.latitude, self.longitude]
    }

    /// True when all three components are finite.
    pub fn is_finite(&self) -> bool {
        self.radial.is_finite() && self.latitude.is_finite() && self.longitude.is_finite()
    }

    /// Copy with the longitude wrapped into `convention`.
    pub fn normalized(&self, convention: LongitudeConvention) -> Self {
        Self {
            longitude: convention.normalize(self.longitude),
            ..*self
        }
    }
}
