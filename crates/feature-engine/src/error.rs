//! Feature Extraction Error Types

use thiserror::Error;

/// Errors raised while building a feature stack
#[derive(Debug, Error)]
pub enum FeatureError {
    /// Bad sigma bounds, empty flag set, unusable image shape, etc.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// A per-(channel, scale) task failed; the whole aggregation is aborted
    #[error("Feature task failed (channel {channel}, sigma {sigma}): {source}")]
    TaskFailure {
        channel: usize,
        sigma: f64,
        source: Box<FeatureError>,
    },

    /// Finite differences need at least two samples along the axis
    #[error("Axis {axis} has {len} sample(s), at least 2 are required for derivatives")]
    AxisTooShort { axis: usize, len: usize },

    /// Iterative eigen-decomposition did not converge
    #[error("Symmetric eigen-decomposition did not converge for a {order}x{order} tensor")]
    EigenNoConvergence { order: usize },

    /// An ndarray reshape or stack operation failed
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    /// Configuration could not be loaded or deserialized
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl FeatureError {
    /// Wrap an error raised inside a feature task
    pub fn task(channel: usize, sigma: f64, source: FeatureError) -> Self {
        FeatureError::TaskFailure {
            channel,
            sigma,
            source: Box::new(source),
        }
    }
}

impl From<ndarray::ShapeError> for FeatureError {
    fn from(err: ndarray::ShapeError) -> Self {
        FeatureError::ShapeMismatch(err.to_string())
    }
}
