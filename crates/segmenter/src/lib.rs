//! Trainable Pixel Segmentation
//!
//! Trains a pixel classifier from a partially labeled image and segments new
//! images, using multiscale feature stacks from `feature-engine`.

mod classifier;
mod segment;
mod trainable;

pub use classifier::{Classifier, NearestCentroid};
pub use segment::{fit_segmenter, predict_segmenter};
pub use trainable::{FeatureFn, SegmenterState, TrainableSegmenter};

pub use feature_engine::{FeatureConfig, FeatureError, FeatureStack, Workers};

use thiserror::Error;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Errors during training or segmentation
#[derive(Debug, Error)]
pub enum SegmentError {
    /// Mismatched label/feature shapes, empty training set, missing image, ...
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    /// Prediction requested from a classifier that was never fitted
    #[error("Classifier is not fitted; train it first, e.g. with fit_segmenter")]
    NotFitted,
    /// Feature computation failed
    #[error(transparent)]
    Features(#[from] FeatureError),
    /// The classifier reported a failure of its own
    #[error("Classifier failed: {0}")]
    Classifier(String),
}

/// Install a global `tracing` subscriber writing to stdout
pub fn init_logging(level: Level) -> Result<(), tracing::subscriber::SetGlobalDefaultError> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
}
