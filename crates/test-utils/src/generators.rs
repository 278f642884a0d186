//! Generators for synthetic reanalysis-like volumes.
//!
//! All volumes are laid out in `(level, lat, lon)` row-major order with
//! longitude varying fastest, matching the source arrays the resampler
//! consumes.

/// Evenly spaced values from `start` to `end` inclusive.
///
/// # Example
///
/// ```
/// use test_utils::linspace;
///
/// assert_eq!(linspace(0.0, 1.0, 3), vec![0.0, 0.5, 1.0]);
/// ```
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n)
                .map(|i| if i == n - 1 { end } else { start + step * i as f64 })
                .collect()
        }
    }
}

/// Creates a test volume with predictable values.
///
/// Each value is calculated as: `level * 10000 + lat * 100 + lon`
///
/// # Example
///
/// ```
/// use test_utils::create_test_volume;
///
/// let v = create_test_volume(2, 3, 4);
/// assert_eq!(v.len(), 24);
/// assert_eq!(v[0], 0.0);
/// assert_eq!(v[1], 1.0);      // lon = 1
/// assert_eq!(v[4], 100.0);    // lat = 1
/// assert_eq!(v[12], 10000.0); // level = 1
/// ```
pub fn create_test_volume(levels: usize, lats: usize, lons: usize) -> Vec<f64> {
    let mut data = Vec::with_capacity(levels * lats * lons);
    for k in 0..levels {
        for j in 0..lats {
            for i in 0..lons {
                data.push((k * 10000 + j * 100 + i) as f64);
            }
        }
    }
    data
}

/// Creates geometric heights (meters) that rise with level index and vary
/// slightly with horizontal position, like geopotential height surfaces.
///
/// Level `k` sits near `base + k * spacing`, perturbed by up to ±1% of
/// `spacing`.
pub fn create_height_volume(
    levels: usize,
    lats: usize,
    lons: usize,
    base: f64,
    spacing: f64,
) -> Vec<f64> {
    let mut data = Vec::with_capacity(levels * lats * lons);
    for k in 0..levels {
        for j in 0..lats {
            for i in 0..lons {
                let wobble = ((j as f64 * 0.7).sin() + (i as f64 * 0.3).cos()) * 0.005 * spacing;
                data.push(base + k as f64 * spacing + wobble);
            }
        }
    }
    data
}

/// Creates specific humidity values (kg/kg) that decay with level and peak
/// towards the middle of the horizontal grid.
pub fn create_humidity_volume(levels: usize, lats: usize, lons: usize) -> Vec<f64> {
    let mut data = Vec::with_capacity(levels * lats * lons);
    let cy = lats as f64 / 2.0;
    let cx = lons as f64 / 2.0;
    let max_dist = (cx * cx + cy * cy).sqrt().max(1.0);
    for k in 0..levels {
        let vertical = (-(k as f64) / 4.0).exp();
        for j in 0..lats {
            for i in 0..lons {
                let dy = j as f64 - cy;
                let dx = i as f64 - cx;
                let horizontal = 1.0 - (dx * dx + dy * dy).sqrt() / max_dist * 0.5;
                data.push(0.02 * vertical * horizontal);
            }
        }
    }
    data
}

/// Creates a constant volume.
pub fn create_constant_volume(levels: usize, lats: usize, lons: usize, value: f64) -> Vec<f64> {
    vec![value; levels * lats * lons]
}

/// Replaces the given flat positions with NaN.
///
/// Out-of-range positions are ignored.
pub fn with_nans(mut data: Vec<f64>, nan_positions: &[usize]) -> Vec<f64> {
    for &pos in nan_positions {
        if let Some(v) = data.get_mut(pos) {
            *v = f64::NAN;
        }
    }
    data
}
