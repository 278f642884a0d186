//! Error types for coordinate transformations.

use thiserror::Error;

/// Errors raised while building or applying a coordinate transform.
#[derive(Error, Debug)]
pub enum ProjectionError {
    /// Invalid transformer configuration (non-positive scale or radius).
    #[error("invalid transformer configuration: {0}")]
    InvalidConfig(String),

    /// Paired coordinate arrays have different lengths.
    #[error("coordinate length mismatch: {longitudes} longitudes vs {latitudes} latitudes")]
    LengthMismatch { longitudes: usize, latitudes: usize },

    /// Native bounds could not be normalized or validated.
    #[error("invalid bounds: {0}")]
    Bounds(#[from] volume_common::BoundsError),
}

impl ProjectionError {
    /// Create an InvalidConfig error.
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}

/// Result type for projection operations.
pub type Result<T> = std::result::Result<T, ProjectionError>;
