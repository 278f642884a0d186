//! Shared test utilities for the regridding workspace.
//!
//! This crate provides common testing infrastructure including:
//! - Approximate-equality assertion macros
//! - Synthetic `(level, lat, lon)` volume generators
//! - Common native bounding boxes and field names
//! - Temporary directory helpers
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```
//!
//! Then import in your tests:
//!
//! ```ignore
//! use test_utils::{assert_approx_eq, fixtures};
//! ```

pub mod fixtures;
pub mod generators;
pub mod paths;

// Re-export commonly used items at the crate root
pub use fixtures::*;
pub use generators::*;
pub use paths::*;

/// Macro for approximate floating-point equality assertions.
///
/// # Usage
///
/// ```ignore
/// use test_utils::assert_approx_eq;
///
/// assert_approx_eq!(1.0001_f64, 1.0_f64, 0.001_f64); // passes
/// assert_approx_eq!(1.1_f32, 1.0_f32, 0.001_f32);    // fails
/// ```
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left: f64 = $left as f64;
        let right: f64 = $right as f64;
        let epsilon: f64 = $epsilon as f64;
        let diff = (left - right).abs();
        if diff > epsilon {
            panic!(
                "assertion failed: `(left ≈ right)`\n  left: `{:?}`,\n right: `{:?}`,\n  diff: `{:?}` > epsilon `{:?}`",
                left, right, diff, epsilon
            );
        }
    }};
}

/// Macro for relative floating-point equality assertions.
///
/// The allowed difference is `tolerance * max(|left|, |right|, 1.0)`, so
/// values near zero are compared absolutely.
///
/// # Usage
///
/// ```ignore
/// use test_utils::assert_rel_eq;
///
/// assert_rel_eq!(6_371_000.000_001, 6_371_000.0, 1e-9); // passes
/// ```
#[macro_export]
macro_rules! assert_rel_eq {
    ($left:expr, $right:expr, $tolerance:expr) => {{
        let left: f64 = $left as f64;
        let right: f64 = $right as f64;
        let tolerance: f64 = $tolerance as f64;
        let scale = left.abs().max(right.abs()).max(1.0);
        let diff = (left - right).abs();
        if diff > tolerance * scale {
            panic!(
                "assertion failed: `(left ≈ right)` (relative)\n  left: `{:?}`,\n right: `{:?}`,\n  diff: `{:?}` > `{:?}`",
                left, right, diff, tolerance * scale
            );
        }
    }};
}

/// Macro for approximate equality of coordinate triples.
///
/// # Usage
///
/// ```ignore
/// use test_utils::assert_triple_approx_eq;
///
/// assert_triple_approx_eq!((1.0001, 2.0001, 3.0), (1.0, 2.0, 3.0), 0.001);
/// ```
#[macro_export]
macro_rules! assert_triple_approx_eq {
    (($a1:expr, $b1:expr, $c1:expr), ($a2:expr, $b2:expr, $c2:expr), $epsilon:expr) => {{
        $crate::assert_approx_eq!($a1, $a2, $epsilon);
        $crate::assert_approx_eq!($b1, $b2, $epsilon);
        $crate::assert_approx_eq!($c1, $c2, $epsilon);
    }};
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_assert_approx_eq_passes() {
        assert_approx_eq!(1.0001, 1.0, 0.001);
        assert_approx_eq!(0.0, 0.0, 0.0001);
        assert_approx_eq!(-5.5, -5.500001, 0.0001);
    }

    #[test]
    #[should_panic(expected = "assertion failed")]
    fn test_assert_approx_eq_fails() {
        assert_approx_eq!(1.1, 1.0, 0.001);
    }

    #[test]
    fn test_assert_rel_eq_scales_with_magnitude() {
        assert_rel_eq!(6_371_000.001, 6_371_000.0, 1e-9);
        assert_rel_eq!(1e-12, 0.0, 1e-9);
    }

    #[test]
    #[should_panic(expected = "relative")]
    fn test_assert_rel_eq_fails() {
        assert_rel_eq!(1.001, 1.0, 1e-9);
    }

    #[test]
    fn test_assert_triple_approx_eq_passes() {
        assert_triple_approx_eq!((1.0001, 2.0001, 3.0), (1.0, 2.0, 3.0), 0.001);
    }
}
