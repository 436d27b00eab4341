use thiserror::Error;

use crate::feature::{FeatureId, LayerId};

/// Top-level error type for gap detection and repair.
#[derive(Debug, Error)]
pub enum GapCheckError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Feature(#[from] FeatureError),

    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Errors raised by the geometry engine.
///
/// Any of these aborts the current detection pass.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("combine failed: {0}")]
    Combine(String),

    #[error("envelope failed: {0}")]
    Envelope(String),

    #[error("buffer failed: {0}")]
    Buffer(String),

    #[error("{operation} does not support {kind} geometries")]
    Unsupported {
        operation: &'static str,
        kind: &'static str,
    },

    #[error("{operation} received non-finite coordinates")]
    NonFinite { operation: &'static str },

    #[error("{operation} received coordinates outside the precision grid range")]
    OutOfRange { operation: &'static str },
}

/// Errors related to feature storage lookups.
#[derive(Debug, Error)]
pub enum FeatureError {
    #[error("unknown layer: {0}")]
    UnknownLayer(LayerId),

    #[error("feature {id:?} not found in layer {layer}")]
    UnknownFeature { layer: LayerId, id: FeatureId },
}

/// Errors related to coordinate transformation.
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("no coordinate transform registered for layer {0}")]
    NoTransform(LayerId),

    #[error("transform matrix is not invertible")]
    NotInvertible,

    #[error("transform produced non-finite coordinates")]
    NonFinite,
}

/// Errors related to gap resolution.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("no neighbor shares a boundary with the gap")]
    NoMergeFound,

    #[error("merge result is degenerate: {0}")]
    DegenerateMergeResult(String),

    #[error("unsupported resolution method: {0}")]
    UnsupportedMethod(String),

    #[error("part index {index} out of range for geometry with {count} parts")]
    PartOutOfRange { index: usize, count: usize },
}

/// Errors related to check configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} must be positive and finite, got {value}")]
    InvalidTolerance { name: &'static str, value: f64 },

    #[error("gap threshold must be non-negative, got {0}")]
    InvalidThreshold(f64),

    #[error("at least one compatible geometry type is required")]
    EmptyGeometryTypes,
}

/// Convenience type alias for results using [`GapCheckError`].
pub type Result<T> = std::result::Result<T, GapCheckError>;
