//! Error types for grid processing.

use thiserror::Error;

/// Errors that can occur while indexing, resampling or deriving fields.
#[derive(Error, Debug)]
pub enum GridProcessorError {
    /// Invalid configuration value.
    #[error("configuration error: {0}")]
    InvalidConfig(String),

    /// No finite samples were available to build the spatial index.
    #[error("spatial index is empty: none of {total} samples are finite")]
    EmptyIndex { total: usize },

    /// Array shapes or axis counts do not agree.
    #[error("dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// A named field is missing from the dataset or grid.
    #[error("field not found: {0}")]
    FieldNotFound(String),

    /// Coordinate transform error.
    #[error(transparent)]
    Projection(#[from] projection::ProjectionError),

    /// Invalid native bounds.
    #[error("invalid bounds: {0}")]
    Bounds(#[from] volume_common::BoundsError),
}

impl GridProcessorError {
    /// Create an InvalidConfig error.
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a DimensionMismatch error.
    pub fn dimension_mismatch(msg: impl Into<String>) -> Self {
        Self::DimensionMismatch(msg.into())
    }

    /// Create a FieldNotFound error.
    pub fn field_not_found(name: impl Into<String>) -> Self {
        Self::FieldNotFound(name.into())
    }
}

/// Result type for grid processor operations.
pub type Result<T> = std::result::Result<T, GridProcessorError>;
