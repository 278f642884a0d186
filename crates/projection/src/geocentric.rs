//! Scaled geocentric projection.
//!
//! Native coordinates are `(radial, latitude, longitude)` with angles in
//! degrees. The radial value is multiplied by a scale factor, converted to a
//! radius according to [`RadialType`], and projected onto a Cartesian frame
//! centred on the planet:
//!
//! - `x = r cos(lat) cos(lon)`
//! - `y = r cos(lat) sin(lon)`
//! - `z = r sin(lat)`
//!
//! The inverse recovers the radius, latitude and longitude, converts the
//! radius back to the radial value and divides out the scale factor.

use nalgebra::Point3;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use volume_common::{CartesianBounds, LongitudeConvention, NativeBounds, NativeCoordinate};

use crate::error::{ProjectionError, Result};

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A point in the Cartesian rendering frame.
pub type TransformedCoordinate = Point3<f64>;

/// How the radial native value relates to the distance from the centre.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RadialType {
    /// Height above the reference radius: `r = r_o + radial`.
    #[default]
    Altitude,
    /// Depth below the reference radius: `r = r_o - radial`.
    Depth,
    /// Distance from the centre: `r = radial`.
    Radius,
}

impl RadialType {
    /// Parse from string (case-insensitive). Unknown values fall back to
    /// altitude.
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "depth" => Self::Depth,
            "radius" => Self::Radius,
            _ => Self::Altitude,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Altitude => "altitude",
            Self::Depth => "depth",
            Self::Radius => "radius",
        }
    }

    #[inline]
    fn to_radius(self, radial: f64, r_o: f64) -> f64 {
        match self {
            Self::Altitude => r_o + radial,
            Self::Depth => r_o - radial,
            Self::Radius => radial,
        }
    }

    #[inline]
    fn from_radius(self, r: f64, r_o: f64) -> f64 {
        match self {
            Self::Altitude => r - r_o,
            Self::Depth => r_o - r,
            Self::Radius => r,
        }
    }
}

impl std::fmt::Display for RadialType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Angular slack added to envelope limits, in degrees.
const ENVELOPE_PAD_DEG: f64 = 1e-9;

/// Native ranges that enclose every point of a Cartesian box.
///
/// The ranges are conservative: every point of the box maps inside them,
/// but they may be wider than the exact image of the box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NativeEnvelope {
    pub radial: [f64; 2],
    pub latitude: [f64; 2],
    /// Longitude arc `[start, end]` in degrees, spanning less than 180.
    /// `None` when the box touches the polar axis, where every longitude
    /// occurs.
    pub longitude: Option<[f64; 2]>,
}

impl NativeEnvelope {
    /// Whether any point of the envelope may lie in `bounds`.
    ///
    /// `bounds` is expected to be normalized to the transformer's
    /// convention.
    pub fn intersects(&self, bounds: &NativeBounds) -> bool {
        ranges_overlap(self.radial, bounds.radial)
            && ranges_overlap(self.latitude, bounds.latitude)
            && self
                .longitude
                .map_or(true, |arc| arc_overlaps(arc, bounds.longitude))
    }

    /// Whether the whole envelope lies in `bounds`.
    pub fn within(&self, bounds: &NativeBounds) -> bool {
        range_within(self.radial, bounds.radial)
            && range_within(self.latitude, bounds.latitude)
            && match self.longitude {
                Some(arc) => arc_within(arc, bounds.longitude),
                None => is_full_circle(bounds.longitude),
            }
    }
}

fn ranges_overlap(a: [f64; 2], b: [f64; 2]) -> bool {
    a[0] <= b[1] && b[0] <= a[1]
}

fn range_within(inner: [f64; 2], outer: [f64; 2]) -> bool {
    inner[0] >= outer[0] && inner[1] <= outer[1]
}

fn is_full_circle(range: [f64; 2]) -> bool {
    range[1] - range[0] >= 360.0
}

/// Start of `arc` shifted into `[range[0], range[0] + 360)`.
fn arc_start(arc: [f64; 2], range: [f64; 2]) -> f64 {
    range[0] + (arc[0] - range[0]).rem_euclid(360.0)
}

fn arc_overlaps(arc: [f64; 2], range: [f64; 2]) -> bool {
    if is_full_circle(range) {
        return true;
    }
    let start = arc_start(arc, range);
    let end = start + (arc[1] - arc[0]);
    start <= range[1] || end >= range[0] + 360.0
}

fn arc_within(arc: [f64; 2], range: [f64; 2]) -> bool {
    if is_full_circle(range) {
        return true;
    }
    arc_start(arc, range) + (arc[1] - arc[0]) <= range[1]
}

fn norm(v: [f64; 3]) -> f64 {
    v[0].hypot(v[1]).hypot(v[2])
}

/// Configuration for a [`GeocentricTransformer`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformerConfig {
    /// Reference radius `r_o` in meters.
    pub reference_radius: f64,

    /// Multiplier applied to the radial value before projection.
    pub radial_scale_factor: f64,

    /// Report longitudes in (-180, 180] instead of [0, 360).
    pub use_negative_longitudes: bool,

    /// Interpretation of the radial value.
    pub radial_type: RadialType,
}

impl Default for TransformerConfig {
    fn default() -> Self {
        Self {
            reference_radius: EARTH_RADIUS_M,
            radial_scale_factor: 1.0,
            use_negative_longitudes: true,
            radial_type: RadialType::Altitude,
        }
    }
}

impl TransformerConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("REGRID_REFERENCE_RADIUS") {
            if let Ok(radius) = val.parse() {
                config.reference_radius = radius;
            }
        }

        if let Ok(val) = std::env::var("REGRID_RADIAL_SCALE_FACTOR") {
            if let Ok(scale) = val.parse() {
                config.radial_scale_factor = scale;
            }
        }

        if let Ok(val) = std::env::var("REGRID_USE_NEGATIVE_LONGITUDES") {
            config.use_negative_longitudes = val.to_lowercase() == "true" || val == "1";
        }

        if let Ok(val) = std::env::var("REGRID_RADIAL_TYPE") {
            config.radial_type = RadialType::from_str(&val);
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if !self.radial_scale_factor.is_finite() || self.radial_scale_factor <= 0.0 {
            return Err(ProjectionError::invalid_config(format!(
                "radial_scale_factor must be > 0, got {}",
                self.radial_scale_factor
            )));
        }

        if !self.reference_radius.is_finite() || self.reference_radius <= 0.0 {
            return Err(ProjectionError::invalid_config(format!(
                "reference_radius must be > 0, got {}",
                self.reference_radius
            )));
        }

        Ok(())
    }

    /// Longitude convention selected by `use_negative_longitudes`.
    pub fn longitude_convention(&self) -> LongitudeConvention {
        LongitudeConvention::from_negative_flag(self.use_negative_longitudes)
    }
}

/// Geocentric transform with an exaggerated radial axis.
///
/// Immutable after construction, so a single instance can be shared across
/// threads.
#[derive(Debug, Clone)]
pub struct GeocentricTransformer {
    reference_radius: f64,
    radial_scale_factor: f64,
    convention: LongitudeConvention,
    radial_type: RadialType,
}

impl GeocentricTransformer {
    /// Create a transformer, rejecting invalid scale factors or radii.
    pub fn new(config: &TransformerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            reference_radius: config.reference_radius,
            radial_scale_factor: config.radial_scale_factor,
            convention: config.longitude_convention(),
            radial_type: config.radial_type,
        })
    }

    /// Altitude-based transformer with signed longitudes.
    pub fn with_scale(reference_radius: f64, radial_scale_factor: f64) -> Result<Self> {
        Self::new(&TransformerConfig {
            reference_radius,
            radial_scale_factor,
            ..TransformerConfig::default()
        })
    }

    pub fn reference_radius(&self) -> f64 {
        self.reference_radius
    }

    pub fn radial_scale_factor(&self) -> f64 {
        self.radial_scale_factor
    }

    pub fn convention(&self) -> LongitudeConvention {
        self.convention
    }

    pub fn radial_type(&self) -> RadialType {
        self.radial_type
    }

    /// Project a native coordinate into the Cartesian frame.
    ///
    /// Latitude outside [-90, 90] is not validated. NaN inputs give NaN
    /// outputs.
    pub fn to_transformed(&self, radial: f64, latitude: f64, longitude: f64) -> Point3<f64> {
        let lon = self.convention.normalize(longitude).to_radians();
        let lat = latitude.to_radians();
        let r = self
            .radial_type
            .to_radius(radial * self.radial_scale_factor, self.reference_radius);

        let (sin_lat, cos_lat) = lat.sin_cos();
        let (sin_lon, cos_lon) = lon.sin_cos();

        Point3::new(r * cos_lat * cos_lon, r * cos_lat * sin_lon, r * sin_lat)
    }

    /// Project a [`NativeCoordinate`] into the Cartesian frame.
    pub fn to_transformed_coord(&self, coord: &NativeCoordinate) -> Point3<f64> {
        self.to_transformed(coord.radial, coord.latitude, coord.longitude)
    }

    /// Invert the projection.
    ///
    /// The longitude comes back wrapped into the configured convention.
    /// At the origin, latitude and longitude are reported as 0.
    pub fn to_native(&self, point: &Point3<f64>) -> NativeCoordinate {
        let (x, y, z) = (point.x, point.y, point.z);
        let horizontal = x.hypot(y);
        let r = horizontal.hypot(z);

        let latitude = z.atan2(horizontal).to_degrees();
        let longitude = self.convention.normalize(y.atan2(x).to_degrees());
        let radial =
            self.radial_type.from_radius(r, self.reference_radius) / self.radial_scale_factor;

        NativeCoordinate::new(radial, latitude, longitude)
    }

    /// Invert the projection for raw `(x, y, z)` components.
    pub fn to_native_xyz(&self, x: f64, y: f64, z: f64) -> NativeCoordinate {
        self.to_native(&Point3::new(x, y, z))
    }

    /// Project many native coordinates in parallel.
    pub fn to_transformed_many(&self, coords: &[NativeCoordinate]) -> Vec<Point3<f64>> {
        coords
            .par_iter()
            .map(|c| self.to_transformed_coord(c))
            .collect()
    }

    /// Invert many Cartesian points in parallel.
    pub fn to_native_many(&self, points: &[Point3<f64>]) -> Vec<NativeCoordinate> {
        points.par_iter().map(|p| self.to_native(p)).collect()
    }

    /// Exact Cartesian extent of a native box.
    ///
    /// Each Cartesian component is separable in radius, latitude and
    /// longitude, so its extremes lie at the box edges or at the interior
    /// critical angles (latitude 0, longitude multiples of 90).
    pub fn cartesian_bounds(&self, bounds: &NativeBounds) -> Result<CartesianBounds> {
        let bounds = bounds.normalized(self.convention)?;

        let radials = bounds.radial;

        let mut latitudes = vec![bounds.latitude[0], bounds.latitude[1]];
        if bounds.latitude[0] < 0.0 && bounds.latitude[1] > 0.0 {
            latitudes.push(0.0);
        }

        let mut longitudes = vec![bounds.longitude[0], bounds.longitude[1]];
        let first_quadrant = (bounds.longitude[0] / 90.0).ceil() as i64;
        let last_quadrant = (bounds.longitude[1] / 90.0).floor() as i64;
        for q in first_quadrant..=last_quadrant {
            longitudes.push(q as f64 * 90.0);
        }

        let mut corners = Vec::with_capacity(radials.len() * latitudes.len() * longitudes.len());
        for &radial in &radials {
            for &lat in &latitudes {
                for &lon in &longitudes {
                    let p = self.to_transformed(radial, lat, lon);
                    corners.push([p.x, p.y, p.z]);
                }
            }
        }

        CartesianBounds::from_points(corners)
            .ok_or_else(|| ProjectionError::invalid_config("empty native bounds"))
    }

    /// Conservative native ranges covered by a Cartesian box.
    ///
    /// The radius runs from the box point nearest the origin to its
    /// farthest corner. Latitude limits follow from `sin(lat) = z / r`
    /// over those radii, and the longitude arc from the four horizontal
    /// corners. The box is widened by a relative `1e-12` first so that
    /// rounding in [`to_native`](Self::to_native) never leaves the
    /// envelope.
    pub fn native_envelope(&self, cart: &CartesianBounds) -> NativeEnvelope {
        let magnitude = cart
            .min
            .iter()
            .chain(&cart.max)
            .fold(1.0f64, |m, v| m.max(v.abs()));
        let pad = 1e-12 * magnitude;
        let min = cart.min.map(|v| v - pad);
        let max = cart.max.map(|v| v + pad);

        let nearest: [f64; 3] = std::array::from_fn(|a| min[a].max(0.0).min(max[a]));
        let farthest: [f64; 3] = std::array::from_fn(|a| min[a].abs().max(max[a].abs()));
        let r_min = norm(nearest);
        let r_max = norm(farthest);

        let to_radial = |r: f64| {
            self.radial_type.from_radius(r, self.reference_radius) / self.radial_scale_factor
        };
        let (a, b) = (to_radial(r_min), to_radial(r_max));
        let radial = [a.min(b), a.max(b)];

        let latitude = if r_min <= 0.0 {
            [-90.0, 90.0]
        } else {
            let upper = if max[2] >= 0.0 { max[2] / r_min } else { max[2] / r_max };
            let lower = if min[2] <= 0.0 { min[2] / r_min } else { min[2] / r_max };
            [
                lower.clamp(-1.0, 1.0).asin().to_degrees() - ENVELOPE_PAD_DEG,
                upper.clamp(-1.0, 1.0).asin().to_degrees() + ENVELOPE_PAD_DEG,
            ]
        };

        let on_axis = min[0] <= 0.0 && max[0] >= 0.0 && min[1] <= 0.0 && max[1] >= 0.0;
        let longitude = if on_axis {
            None
        } else {
            // The horizontal rectangle misses the origin, so its corners
            // span less than half a turn around the first one.
            let corners = [
                (min[0], min[1]),
                (min[0], max[1]),
                (max[0], min[1]),
                (max[0], max[1]),
            ];
            let reference = corners[0].1.atan2(corners[0].0).to_degrees();
            let (mut lo, mut hi) = (0.0f64, 0.0f64);
            for (x, y) in corners {
                let delta = (y.atan2(x).to_degrees() - reference + 180.0).rem_euclid(360.0) - 180.0;
                lo = lo.min(delta);
                hi = hi.max(delta);
            }
            Some([
                reference + lo - ENVELOPE_PAD_DEG,
                reference + hi + ENVELOPE_PAD_DEG,
            ])
        };

        NativeEnvelope {
            radial,
            latitude,
            longitude,
        }
    }
}
