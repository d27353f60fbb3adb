//! Multiscale Pixel Feature Engine
//!
//! Computes a dense per-pixel descriptor stack for trainable segmentation:
//! Gaussian-smoothed intensity, Sobel edge magnitude and Hessian eigenvalues,
//! each over a geometric sequence of scales and every image channel.

mod config;
mod error;
mod executor;
mod multiscale;
mod pixel;
mod scales;
mod single_scale;
mod stack;

pub mod filters;
pub mod hessian;

pub use config::{FeatureConfig, FeatureFlags, Workers, ENV_PREFIX};
pub use error::FeatureError;
pub use executor::{ExecutorKind, ParallelExecutor};
pub use hessian::hessian_eigenvalues;
pub use multiscale::{aggregate_features, plan_tasks, ScaleTask};
pub use pixel::{to_float_image, Pixel};
pub use scales::{scale_sequence, validate_sigma_bounds};
pub use single_scale::{extract_single_scale, texture_features, FeatureBundle};
pub use stack::{
    compute_features, feature_layout, FeatureDescriptor, FeatureKind, FeatureStack,
    FeatureStackBuilder,
};
