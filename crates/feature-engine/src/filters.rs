//! N-dimensional smoothing and derivative filters
//!
//! Every filter works on arrays of any dimensionality by running 1-D passes
//! along each axis. Out-of-range samples are taken from the half-sample
//! reflection of the lane (`d c b a | a b c d | d c b a`).

use ndarray::{ArrayD, ArrayViewD, Axis, Zip};

use crate::error::FeatureError;

/// Gaussian kernels are cut off at this many standard deviations
pub const GAUSSIAN_TRUNCATE: f64 = 4.0;

/// Sobel derivative taps
const SOBEL_EDGE: [f32; 3] = [1.0, 0.0, -1.0];

/// Sobel cross-axis smoothing taps `[1, 2, 1] / 4`
const SOBEL_SMOOTH: [f32; 3] = [0.25, 0.5, 0.25];

/// Map an out-of-range lane index onto `0..len` by half-sample reflection
#[inline]
fn reflect_index(index: isize, len: usize) -> usize {
    let len = len as isize;
    let period = 2 * len;
    let wrapped = index.rem_euclid(period);
    if wrapped >= len {
        (period - 1 - wrapped) as usize
    } else {
        wrapped as usize
    }
}

/// Correlate every lane along `axis` with a centred odd-length kernel
pub fn correlate1d(input: &ArrayViewD<'_, f32>, axis: Axis, weights: &[f32]) -> ArrayD<f32> {
    let len = input.len_of(axis);
    let radius = (weights.len() / 2) as isize;
    let mut output = ArrayD::<f32>::zeros(input.raw_dim());
    if len == 0 {
        return output;
    }
    let mut padded = Vec::with_capacity(len + weights.len());

    Zip::from(input.lanes(axis))
        .and(output.lanes_mut(axis))
        .for_each(|src, mut dst| {
            padded.clear();
            padded.extend((-radius..len as isize + radius).map(|i| src[reflect_index(i, len)]));

            for (i, out) in dst.iter_mut().enumerate() {
                *out = weights
                    .iter()
                    .zip(&padded[i..i + weights.len()])
                    .map(|(w, v)| w * v)
                    .sum();
            }
        });

    output
}

/// Normalised 1-D Gaussian taps for standard deviation `sigma`
pub fn gaussian_kernel(sigma: f64) -> Vec<f32> {
    let radius = (GAUSSIAN_TRUNCATE * sigma + 0.5) as isize;
    let raw: Vec<f64> = (-radius..=radius)
        .map(|x| {
            let t = x as f64 / sigma;
            (-0.5 * t * t).exp()
        })
        .collect();
    let total: f64 = raw.iter().sum();
    raw.iter().map(|w| (w / total) as f32).collect()
}

/// Separable Gaussian smoothing along every axis
pub fn gaussian(input: &ArrayViewD<'_, f32>, sigma: f64) -> ArrayD<f32> {
    let kernel = gaussian_kernel(sigma);
    let mut smoothed = input.to_owned();
    for axis in 0..input.ndim() {
        smoothed = correlate1d(&smoothed.view(), Axis(axis), &kernel);
    }
    smoothed
}

/// Sobel gradient magnitude, `sqrt(sum_axis(response^2) / ndim)`
pub fn sobel_magnitude(input: &ArrayViewD<'_, f32>) -> ArrayD<f32> {
    let ndim = input.ndim();
    let mut magnitude = ArrayD::<f32>::zeros(input.raw_dim());

    for axis in 0..ndim {
        let mut response = correlate1d(input, Axis(axis), &SOBEL_EDGE);
        for other in (0..ndim).filter(|&other| other != axis) {
            response = correlate1d(&response.view(), Axis(other), &SOBEL_SMOOTH);
        }
        magnitude.zip_mut_with(&response, |acc, r| *acc += r * r);
    }

    let scale = ndim.max(1) as f32;
    magnitude.mapv_inplace(|v| (v / scale).sqrt());
    magnitude
}

/// First derivative along `axis`: central differences inside,
/// one-sided differences at both ends
pub fn gradient(input: &ArrayViewD<'_, f32>, axis: usize) -> Result<ArrayD<f32>, FeatureError> {
    let len = input.len_of(Axis(axis));
    if len < 2 {
        return Err(FeatureError::AxisTooShort { axis, len });
    }

    let mut output = ArrayD::<f32>::zeros(input.raw_dim());
    Zip::from(input.lanes(Axis(axis)))
        .and(output.lanes_mut(Axis(axis)))
        .for_each(|src, mut dst| {
            dst[0] = src[1] - src[0];
            dst[len - 1] = src[len - 1] - src[len - 2];
            for i in 1..len - 1 {
                dst[i] = (src[i + 1] - src[i - 1]) * 0.5;
            }
        });

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr1, arr2, Array2, IxDyn};

    #[test]
    fn test_reflect_index() {
        // d c b a | a b c d | d c b a
        assert_eq!(reflect_index(-1, 4), 0);
        assert_eq!(reflect_index(-4, 4), 3);
        assert_eq!(reflect_index(4, 4), 3);
        assert_eq!(reflect_index(7, 4), 0);
        assert_eq!(reflect_index(2, 4), 2);
        assert_eq!(reflect_index(-3, 1), 0);
    }

    #[test]
    fn test_empty_axis_passes_through() {
        let empty = ArrayD::<f32>::zeros(IxDyn(&[0, 4]));
        assert_eq!(correlate1d(&empty.view(), Axis(0), &SOBEL_EDGE).shape(), &[0, 4]);
        assert_eq!(correlate1d(&empty.view(), Axis(1), &SOBEL_EDGE).shape(), &[0, 4]);
        assert_eq!(gaussian(&empty.view(), 1.0).shape(), &[0, 4]);
        assert_eq!(sobel_magnitude(&empty.view()).shape(), &[0, 4]);
    }

    #[test]
    fn test_gaussian_kernel_normalised() {
        for sigma in [0.3, 1.0, 2.5, 16.0] {
            let kernel = gaussian_kernel(sigma);
            let sum: f32 = kernel.iter().sum();
            assert!((sum - 1.0).abs() < 1e-5);
            assert_eq!(kernel.len() % 2, 1);
            let radius = kernel.len() / 2;
            assert_eq!(radius, (4.0 * sigma + 0.5) as usize);
        }
    }

    #[test]
    fn test_gaussian_preserves_constant() {
        let img = ArrayD::<f32>::from_elem(IxDyn(&[6, 5, 4]), 3.0);
        let smoothed = gaussian(&img.view(), 2.0);
        assert!(smoothed.iter().all(|v| (v - 3.0).abs() < 1e-5));
    }

    #[test]
    fn test_gaussian_preserves_mass_with_reflection() {
        let mut img = Array2::<f32>::zeros((9, 9));
        img[[4, 4]] = 81.0;
        let smoothed = gaussian(&img.into_dyn().view(), 1.0);
        let total: f32 = smoothed.sum();
        assert!((total - 81.0).abs() < 1e-3);
        // peak stays at the impulse
        assert!(smoothed[[4, 4]] > smoothed[[4, 5]]);
        assert!((smoothed[[4, 5]] - smoothed[[5, 4]]).abs() < 1e-6);
    }

    #[test]
    fn test_gradient_matches_finite_differences() {
        let signal = arr1(&[1.0f32, 2.0, 4.0, 7.0, 11.0]).into_dyn();
        let grad = gradient(&signal.view(), 0).unwrap();
        assert_eq!(grad.iter().copied().collect::<Vec<_>>(), vec![1.0, 1.5, 2.5, 3.5, 4.0]);
    }

    #[test]
    fn test_gradient_second_axis() {
        let img = arr2(&[[0.0f32, 1.0, 4.0], [0.0, 2.0, 8.0]]).into_dyn();
        let grad = gradient(&img.view(), 1).unwrap();
        assert_eq!(grad[[0, 0]], 1.0);
        assert_eq!(grad[[0, 1]], 2.0);
        assert_eq!(grad[[1, 2]], 6.0);
    }

    #[test]
    fn test_gradient_short_axis() {
        let img = ArrayD::<f32>::zeros(IxDyn(&[1, 5]));
        assert!(matches!(
            gradient(&img.view(), 0),
            Err(FeatureError::AxisTooShort { axis: 0, len: 1 })
        ));
        assert!(gradient(&img.view(), 1).is_ok());
    }

    #[test]
    fn test_sobel_flat_and_ramp() {
        let flat = ArrayD::<f32>::from_elem(IxDyn(&[5, 5]), 2.0);
        assert!(sobel_magnitude(&flat.view()).iter().all(|v| v.abs() < 1e-6));

        // ramp along columns: interior horizontal response is 2 per unit slope
        let ramp = Array2::from_shape_fn((5, 5), |(_, c)| c as f32).into_dyn();
        let mag = sobel_magnitude(&ramp.view());
        let expected = (4.0f32 / 2.0).sqrt();
        assert!((mag[[2, 2]] - expected).abs() < 1e-5);
    }
}
