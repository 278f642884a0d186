//! Common test fixtures for regridding tests.
//!
//! Bounds are `(radial, latitude, longitude)` ranges given as
//! `[min, max]` pairs.

/// Common native bounding boxes.
pub mod bounds {
    /// Western North America, 0-68 km altitude.
    pub const WESTERN_NORTH_AMERICA: ([f64; 2], [f64; 2], [f64; 2]) =
        ([0.0, 68_000.0], [25.0, 75.0], [-150.0, -100.0]);

    /// A small equatorial column, 0-70 km altitude.
    pub const EQUATORIAL_COLUMN: ([f64; 2], [f64; 2], [f64; 2]) =
        ([0.0, 70_000.0], [-1.0, 1.0], [-90.0, -88.0]);

    /// Whole globe, surface to 80 km.
    pub const GLOBAL: ([f64; 2], [f64; 2], [f64; 2]) =
        ([0.0, 80_000.0], [-90.0, 90.0], [-180.0, 180.0]);
}

/// Field names used by the MERRA-2 pressure-level product.
pub mod fields {
    /// Specific humidity.
    pub const QV: &str = "QV";
    /// Relative humidity.
    pub const RH: &str = "RH";
}

/// Grid sizes.
pub mod grids {
    /// A small render grid used across tests.
    pub const SMALL_RESOLUTION: [usize; 3] = [16, 16, 16];
}
