//! Shape and index arithmetic for rectilinear `(level, lat, lon)` arrays.

use serde::{Deserialize, Serialize};

/// Shape of a rectilinear source array stored in `(level, lat, lon)`
/// row-major order (longitude varies fastest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridShape {
    pub levels: usize,
    pub latitudes: usize,
    pub longitudes: usize,
}

/// Per-axis position inside a [`GridShape`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridIndex {
    pub level: usize,
    pub lat: usize,
    pub lon: usize,
}

impl GridShape {
    pub fn new(levels: usize, latitudes: usize, longitudes: usize) -> Self {
        Self {
            levels,
            latitudes,
            longitudes,
        }
    }

    /// Total number of grid points.
    pub fn len(&self) -> usize {
        self.levels * self.latitudes * self.longitudes
    }

    /// Check if any axis is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of points in one horizontal (lat, lon) slice.
    pub fn horizontal_len(&self) -> usize {
        self.latitudes * self.longitudes
    }

    /// Flat index for a per-axis position. Returns `None` when any index
    /// is out of range.
    pub fn flat_index(&self, index: GridIndex) -> Option<usize> {
        if index.level >= self.levels || index.lat >= self.latitudes || index.lon >= self.longitudes
        {
            return None;
        }
        Some((index.level * self.latitudes + index.lat) * self.longitudes + index.lon)
    }

    /// Per-axis position for a flat index. Returns `None` when out of range.
    pub fn unravel(&self, flat: usize) -> Option<GridIndex> {
        if flat >= self.len() {
            return None;
        }
        let lon = flat % self.longitudes;
        let rest = flat / self.longitudes;
        Some(GridIndex {
            level: rest / self.latitudes,
            lat: rest % self.latitudes,
            lon,
        })
    }
}

impl std::fmt::Display for GridShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}x{}", self.levels, self.latitudes, self.longitudes)
    }
}
