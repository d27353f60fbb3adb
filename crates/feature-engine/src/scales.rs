//! Geometric scale sequence

use crate::error::FeatureError;

/// Absorbs log2 rounding so that e.g. `0.1..=0.8` still yields 4 scales
const LOG2_SLACK: f64 = 1e-9;

/// Check `0 < sigma_min <= sigma_max` (both finite)
pub fn validate_sigma_bounds(sigma_min: f64, sigma_max: f64) -> Result<(), FeatureError> {
    if !sigma_min.is_finite() || sigma_min <= 0.0 {
        return Err(FeatureError::InvalidParameter(format!(
            "sigma_min must be positive and finite, got {sigma_min}"
        )));
    }
    if !sigma_max.is_finite() || sigma_max < sigma_min {
        return Err(FeatureError::InvalidParameter(format!(
            "sigma_max must be finite and >= sigma_min ({sigma_min}), got {sigma_max}"
        )));
    }
    Ok(())
}

/// Smoothing scales between `sigma_min` and `sigma_max`, largest first.
///
/// The values are evenly spaced on the log2 axis, both endpoints included,
/// with `floor(log2(sigma_max) - log2(sigma_min)) + 1` entries.
pub fn scale_sequence(sigma_min: f64, sigma_max: f64) -> Result<Vec<f64>, FeatureError> {
    validate_sigma_bounds(sigma_min, sigma_max)?;

    let lo = sigma_min.log2();
    let hi = sigma_max.log2();
    let count = ((hi - lo) + LOG2_SLACK).floor() as usize + 1;

    if count == 1 {
        return Ok(vec![sigma_min]);
    }

    let step = (hi - lo) / (count - 1) as f64;
    let mut sigmas: Vec<f64> = (0..count)
        .map(|i| match i {
            0 => sigma_min,
            i if i == count - 1 => sigma_max,
            i => (lo + step * i as f64).exp2(),
        })
        .collect();
    sigmas.reverse();
    Ok(sigmas)
}
