//! Hessian tensor assembly and per-pixel eigenvalues

use nalgebra::{DMatrix, SymmetricEigen};
use ndarray::{ArrayD, ArrayViewD, IxDyn};

use crate::error::FeatureError;
use crate::filters::gradient;

/// Iteration cap for the general symmetric eigensolver
const MAX_EIGEN_ITERATIONS: usize = 1000;

/// Order `k` of a symmetric tensor stored as `n_entries = k(k+1)/2`
/// upper-triangular entries, if `n_entries` is such a number
pub fn symmetric_order(n_entries: usize) -> Option<usize> {
    let k = (((8 * n_entries + 1) as f64).sqrt() as usize).saturating_sub(1) / 2;
    (k > 0 && k * (k + 1) / 2 == n_entries).then_some(k)
}

/// Position of entry `(row, col)`, `row <= col`, in the
/// combinations-with-replacement ordering `(0,0), (0,1), ..., (k-1,k-1)`
#[inline]
pub fn entry_index(row: usize, col: usize, order: usize) -> usize {
    debug_assert!(row <= col && col < order);
    row * order - row * row.saturating_sub(1) / 2 + col - row
}

/// Second derivatives of `image` for every unordered axis pair, each the
/// gradient of a first-order gradient
pub fn hessian_entries(image: &ArrayViewD<'_, f32>) -> Result<Vec<ArrayD<f32>>, FeatureError> {
    let ndim = image.ndim();
    let first: Vec<ArrayD<f32>> = (0..ndim)
        .map(|axis| gradient(image, axis))
        .collect::<Result<_, _>>()?;

    let mut entries = Vec::with_capacity(ndim * (ndim + 1) / 2);
    for (row, d_row) in first.iter().enumerate() {
        for col in row..ndim {
            entries.push(gradient(&d_row.view(), col)?);
        }
    }
    Ok(entries)
}

/// Eigenvalues of the per-pixel symmetric matrices described by `entries`,
/// sorted ascending by value at every pixel.
///
/// Returns `k` arrays shaped like the inputs.
pub fn hessian_eigenvalues(entries: &[ArrayD<f32>]) -> Result<Vec<ArrayD<f32>>, FeatureError> {
    let order = symmetric_order(entries.len()).ok_or_else(|| {
        FeatureError::InvalidParameter(format!(
            "{} Hessian entries do not form a symmetric tensor",
            entries.len()
        ))
    })?;

    let shape = entries[0].shape().to_vec();
    if let Some(bad) = entries.iter().find(|e| e.shape() != shape.as_slice()) {
        return Err(FeatureError::InvalidParameter(format!(
            "Hessian entry of shape {:?} does not match {:?}",
            bad.shape(),
            shape
        )));
    }

    // logical-order copies so per-pixel access is a plain index
    let flat: Vec<Vec<f32>> = entries.iter().map(|e| e.iter().copied().collect()).collect();
    let n_pixels = flat[0].len();
    let mut eigen: Vec<Vec<f32>> = vec![Vec::with_capacity(n_pixels); order];

    match order {
        1 => eigen[0].extend_from_slice(&flat[0]),
        2 => {
            for px in 0..n_pixels {
                let (low, high) = eigenvalues_2x2(flat[0][px], flat[1][px], flat[2][px]);
                eigen[0].push(low);
                eigen[1].push(high);
            }
        }
        _ => {
            let mut values = Vec::with_capacity(order);
            for px in 0..n_pixels {
                eigenvalues_general(&flat, px, order, &mut values)?;
                for (dst, &v) in eigen.iter_mut().zip(&values) {
                    dst.push(v);
                }
            }
        }
    }

    eigen
        .into_iter()
        .map(|values| ArrayD::from_shape_vec(IxDyn(&shape), values).map_err(FeatureError::from))
        .collect()
}

/// Closed form for `[[a, c], [c, b]]`, returned as (smaller, larger)
#[inline]
pub fn eigenvalues_2x2(a: f32, c: f32, b: f32) -> (f32, f32) {
    let mean = (a + b) * 0.5;
    let radius = ((a - b) * 0.5).hypot(c);
    (mean - radius, mean + radius)
}

fn eigenvalues_general(
    flat: &[Vec<f32>],
    px: usize,
    order: usize,
    out: &mut Vec<f32>,
) -> Result<(), FeatureError> {
    let matrix = DMatrix::<f64>::from_fn(order, order, |r, c| {
        let (row, col) = if r <= c { (r, c) } else { (c, r) };
        flat[entry_index(row, col, order)][px] as f64
    });

    let decomposition = SymmetricEigen::try_new(matrix, f64::EPSILON, MAX_EIGEN_ITERATIONS)
        .ok_or(FeatureError::EigenNoConvergence { order })?;

    out.clear();
    out.extend(decomposition.eigenvalues.iter().map(|&v| v as f32));
    out.sort_by(f32::total_cmp);
    Ok(())
}
