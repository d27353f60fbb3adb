//! Classifier capability and a reference nearest-centroid model

use std::collections::BTreeMap;

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use tracing::{debug, info};

use crate::SegmentError;

/// Anything that can learn pixel classes from feature rows.
///
/// Rows of `x` are samples, columns are features. Class ids are `>= 1`.
pub trait Classifier {
    /// Train on `(x, y)`, replacing any previous fit
    fn fit(&mut self, x: ArrayView2<'_, f32>, y: ArrayView1<'_, u32>) -> Result<(), SegmentError>;

    /// Predict one class per row. Fails with [`SegmentError::NotFitted`]
    /// before a successful `fit`.
    fn predict(&self, x: ArrayView2<'_, f32>) -> Result<Array1<u32>, SegmentError>;
}

impl<C: Classifier + ?Sized> Classifier for Box<C> {
    fn fit(&mut self, x: ArrayView2<'_, f32>, y: ArrayView1<'_, u32>) -> Result<(), SegmentError> {
        (**self).fit(x, y)
    }

    fn predict(&self, x: ArrayView2<'_, f32>) -> Result<Array1<u32>, SegmentError> {
        (**self).predict(x)
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Centroids {
    classes: Vec<u32>,
    /// One row per entry of `classes`
    means: Array2<f32>,
}

/// Assigns each sample to the class with the closest mean feature vector
/// (Euclidean). Ties go to the smaller class id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NearestCentroid {
    centroids: Option<Centroids>,
}

impl NearestCentroid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `fit` has succeeded
    pub fn is_fitted(&self) -> bool {
        self.centroids.is_some()
    }

    /// Known class ids, ascending (empty before fitting)
    pub fn classes(&self) -> &[u32] {
        self.centroids
            .as_ref()
            .map(|c| c.classes.as_slice())
            .unwrap_or(&[])
    }
}

impl Classifier for NearestCentroid {
    fn fit(&mut self, x: ArrayView2<'_, f32>, y: ArrayView1<'_, u32>) -> Result<(), SegmentError> {
        if x.nrows() != y.len() {
            return Err(SegmentError::InvalidParameter(format!(
                "{} samples but {} labels",
                x.nrows(),
                y.len()
            )));
        }
        if x.nrows() == 0 {
            return Err(SegmentError::InvalidParameter(
                "cannot fit on an empty training set".to_string(),
            ));
        }

        // running sums in f64, keyed by class id so classes come out sorted
        let mut sums: BTreeMap<u32, (Array1<f64>, usize)> = BTreeMap::new();
        for (row, &label) in x.axis_iter(Axis(0)).zip(y.iter()) {
            let (sum, count) = sums
                .entry(label)
                .or_insert_with(|| (Array1::zeros(x.ncols()), 0));
            sum.zip_mut_with(&row, |s, &v| *s += v as f64);
            *count += 1;
        }

        let classes: Vec<u32> = sums.keys().copied().collect();
        let mut means = Array2::<f32>::zeros((classes.len(), x.ncols()));
        for (mut mean, (sum, count)) in means.axis_iter_mut(Axis(0)).zip(sums.values()) {
            mean.zip_mut_with(sum, |m, &s| *m = (s / *count as f64) as f32);
        }

        info!(
            "Fitted nearest-centroid classifier: {} samples, {} features, classes {:?}",
            x.nrows(),
            x.ncols(),
            classes
        );
        self.centroids = Some(Centroids { classes, means });
        Ok(())
    }

    fn predict(&self, x: ArrayView2<'_, f32>) -> Result<Array1<u32>, SegmentError> {
        let centroids = self.centroids.as_ref().ok_or(SegmentError::NotFitted)?;
        if x.ncols() != centroids.means.ncols() {
            return Err(SegmentError::InvalidParameter(format!(
                "classifier was fitted on {} features, got {}",
                centroids.means.ncols(),
                x.ncols()
            )));
        }

        debug!("Predicting {} samples", x.nrows());
        let predictions = x
            .axis_iter(Axis(0))
            .map(|row| {
                let mut best = (f32::INFINITY, centroids.classes[0]);
                for (mean, &class) in centroids.means.axis_iter(Axis(0)).zip(&centroids.classes) {
                    let dist: f32 = row
                        .iter()
                        .zip(mean.iter())
                        .map(|(a, b)| (a - b) * (a - b))
                        .sum();
                    if dist < best.0 {
                        best = (dist, class);
                    }
                }
                best.1
            })
            .collect();
        Ok(predictions)
    }
}
