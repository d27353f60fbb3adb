//! Features of one image channel at one scale

use ndarray::{ArrayD, ArrayViewD};
use tracing::trace;

use crate::config::FeatureFlags;
use crate::error::FeatureError;
use crate::filters::{gaussian, sobel_magnitude};
use crate::hessian::{hessian_eigenvalues, hessian_entries};

/// Arrays produced for one (channel, scale) pair, in the order
/// intensity, edges, texture eigenvalues (ascending)
pub type FeatureBundle = Vec<ArrayD<f32>>;

/// Smooth `image` with a Gaussian of standard deviation `sigma` and derive
/// the enabled descriptors from the smoothed image
pub fn extract_single_scale(
    image: &ArrayViewD<'_, f32>,
    sigma: f64,
    flags: FeatureFlags,
) -> Result<FeatureBundle, FeatureError> {
    let ndim = image.ndim();
    let mut bundle = Vec::with_capacity(flags.per_scale(ndim));

    let blurred = gaussian(image, sigma);

    // derived arrays first, so `blurred` can move into the bundle afterwards
    let edges = flags.edges.then(|| sobel_magnitude(&blurred.view()));
    let texture = if flags.texture {
        texture_features(&blurred.view())?
    } else {
        Vec::new()
    };

    if flags.intensity {
        bundle.push(blurred);
    }
    bundle.extend(edges);
    bundle.extend(texture);

    trace!(sigma, arrays = bundle.len(), "single-scale features done");
    Ok(bundle)
}

/// Ascending Hessian eigenvalues of an already smoothed image
pub fn texture_features(blurred: &ArrayViewD<'_, f32>) -> Result<Vec<ArrayD<f32>>, FeatureError> {
    let entries = hessian_entries(blurred)?;
    hessian_eigenvalues(&entries)
}
