//! Core types for grid processing.

use serde::{Deserialize, Serialize};

use volume_common::{GridShape, NativeCoordinate};

/// One source grid node: its position and native coordinate.
///
/// Field values stay in the source columns and are read by `flat_index`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceSample {
    /// Position in the `(level, lat, lon)` row-major source arrays.
    pub flat_index: usize,
    /// Native coordinate, longitude already normalized.
    pub coordinate: NativeCoordinate,
    /// Whether the sample may enter the spatial index.
    pub finite: bool,
}

impl SourceSample {
    /// Create a sample, marking it finite when the coordinate is finite.
    pub fn new(flat_index: usize, coordinate: NativeCoordinate) -> Self {
        Self {
            flat_index,
            coordinate,
            finite: coordinate.is_finite(),
        }
    }

    /// Also require every one of `values` to be finite.
    pub fn with_values<I>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = f64>,
    {
        self.finite = self.finite && values.into_iter().all(f64::is_finite);
        self
    }
}

/// 1-D coordinate axes of a rectilinear source grid.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceAxes {
    pub radial: Vec<f64>,
    pub latitude: Vec<f64>,
    pub longitude: Vec<f64>,
}

/// Samples extracted from a source dataset.
#[derive(Debug, Clone)]
pub struct SampleSet {
    /// Shape of the source arrays.
    pub shape: GridShape,
    pub samples: Vec<SourceSample>,
    /// Present when the radial coordinate depends on the level only.
    pub axes: Option<SourceAxes>,
}

impl SampleSet {
    /// Number of samples that may enter the spatial index.
    pub fn finite_count(&self) -> usize {
        self.samples.iter().filter(|s| s.finite).count()
    }
}

/// Result of a nearest-neighbour lookup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearestMatch {
    /// Flat index into the source arrays.
    pub flat_index: usize,
    /// Euclidean distance in (normalized) native space.
    pub distance: f64,
}

/// Field values resolved for one query point.
#[derive(Debug, Clone, PartialEq)]
pub struct CellValues {
    pub flat_index: usize,
    pub distance: f64,
    pub values: Vec<f64>,
}

/// Per-axis scaling applied to native coordinates before distances are
/// measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AxisNormalization {
    /// Raw native units (radial units and degrees).
    #[default]
    None,
    /// Each axis divided by the extent of the finite samples along it.
    Extent,
}

impl AxisNormalization {
    /// Parse from string (case-insensitive).
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "extent" => Self::Extent,
            _ => Self::None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Extent => "extent",
        }
    }
}

impl std::fmt::Display for AxisNormalization {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Multiplicative per-axis scale derived from an [`AxisNormalization`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisScale {
    factors: [f64; 3],
}

impl AxisScale {
    pub fn identity() -> Self {
        Self {
            factors: [1.0; 3],
        }
    }

    /// Compute the scale for a set of coordinates. Degenerate axes keep a
    /// factor of 1.
    pub fn fit<'a, I>(method: AxisNormalization, coords: I) -> Self
    where
        I: IntoIterator<Item = &'a NativeCoordinate>,
    {
        match method {
            AxisNormalization::None => Self::identity(),
            AxisNormalization::Extent => {
                let mut min = [f64::INFINITY; 3];
                let mut max = [f64::NEG_INFINITY; 3];
                for c in coords {
                    for (axis, v) in c.to_array().into_iter().enumerate() {
                        min[axis] = min[axis].min(v);
                        max[axis] = max[axis].max(v);
                    }
                }
                let mut factors = [1.0; 3];
                for axis in 0..3 {
                    let extent = max[axis] - min[axis];
                    if extent.is_finite() && extent > 0.0 {
                        factors[axis] = 1.0 / extent;
                    }
                }
                Self { factors }
            }
        }
    }

    /// Scale a coordinate into index space.
    #[inline]
    pub fn apply(&self, coord: &NativeCoordinate) -> [f64; 3] {
        let v = coord.to_array();
        [
            v[0] * self.factors[0],
            v[1] * self.factors[1],
            v[2] * self.factors[2],
        ]
    }

    pub fn factors(&self) -> [f64; 3] {
        self.factors
    }
}

/// Vertical coordinate used as the radial native value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum VerticalCoordinate {
    /// Mean geometric height of each level.
    #[default]
    LevelMean,
    /// Geometric height of each individual sample.
    Geometric,
    /// The level coordinate values themselves.
    Level,
}

impl VerticalCoordinate {
    /// Parse from string (case-insensitive).
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "geometric" => Self::Geometric,
            "level" => Self::Level,
            _ => Self::LevelMean,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LevelMean => "level_mean",
            Self::Geometric => "geometric",
            Self::Level => "level",
        }
    }

    /// Whether the radial coordinate is a function of the level alone.
    pub fn is_rectilinear(&self) -> bool {
        !matches!(self, Self::Geometric)
    }
}

impl std::fmt::Display for VerticalCoordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Nearest-neighbour search strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LookupMethod {
    /// k-d tree over all finite samples.
    #[default]
    KdTree,
    /// Per-axis search on the 1-D source coordinates.
    Rectilinear,
}

impl LookupMethod {
    /// Parse from string (case-insensitive).
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "rectilinear" | "axis" => Self::Rectilinear,
            _ => Self::KdTree,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::KdTree => "kdtree",
            Self::Rectilinear => "rectilinear",
        }
    }
}

impl std::fmt::Display for LookupMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
