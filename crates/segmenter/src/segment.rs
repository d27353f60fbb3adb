//! Fit and predict on precomputed feature stacks

use feature_engine::FeatureStack;
use ndarray::{ArrayD, ArrayViewD, Axis, IxDyn};
use tracing::{debug, info};

use crate::classifier::Classifier;
use crate::SegmentError;

fn check_shape(labels: &ArrayViewD<'_, u32>, features: &FeatureStack) -> Result<(), SegmentError> {
    if labels.shape() != features.spatial_shape() {
        return Err(SegmentError::InvalidParameter(format!(
            "labels of shape {:?} do not match feature spatial shape {:?}",
            labels.shape(),
            features.spatial_shape()
        )));
    }
    Ok(())
}

/// Train `classifier` in place on the labeled pixels and return `labels`
/// with every unlabeled (`0`) pixel replaced by its prediction
pub(crate) fn fit_in_place<C: Classifier + ?Sized>(
    labels: &ArrayViewD<'_, u32>,
    features: &FeatureStack,
    classifier: &mut C,
) -> Result<ArrayD<u32>, SegmentError> {
    check_shape(labels, features)?;

    let rows = features.pixel_rows();
    let mut output: Vec<u32> = labels.iter().copied().collect();

    let (labeled, unlabeled): (Vec<usize>, Vec<usize>) =
        (0..output.len()).partition(|&px| output[px] > 0);
    if labeled.is_empty() {
        return Err(SegmentError::InvalidParameter(
            "labels contain no training pixels (all are 0)".to_string(),
        ));
    }

    info!(
        "Fitting segmenter: {} labeled / {} unlabeled pixels, {} features",
        labeled.len(),
        unlabeled.len(),
        features.n_features()
    );

    let x_train = rows.select(Axis(0), &labeled);
    let y_train: ndarray::Array1<u32> = labeled.iter().map(|&px| output[px]).collect();
    classifier.fit(x_train.view(), y_train.view())?;

    if !unlabeled.is_empty() {
        let x_unlabeled = rows.select(Axis(0), &unlabeled);
        let predicted = classifier.predict(x_unlabeled.view())?;
        if predicted.len() != unlabeled.len() {
            return Err(SegmentError::Classifier(format!(
                "expected {} predictions, got {}",
                unlabeled.len(),
                predicted.len()
            )));
        }
        for (&px, &class) in unlabeled.iter().zip(predicted.iter()) {
            output[px] = class;
        }
    } else {
        debug!("Every pixel is labeled, nothing to predict");
    }

    ArrayD::from_shape_vec(IxDyn(labels.shape()), output)
        .map_err(|e| SegmentError::InvalidParameter(e.to_string()))
}

/// Train `classifier` on the pixels where `labels > 0` and segment the rest.
///
/// `features` must have spatial shape equal to `labels.shape()`. Labeled
/// pixels are returned unchanged; unlabeled ones carry the prediction.
/// Returns the segmentation together with the fitted classifier.
pub fn fit_segmenter<C: Classifier>(
    labels: &ArrayViewD<'_, u32>,
    features: &FeatureStack,
    mut classifier: C,
) -> Result<(ArrayD<u32>, C), SegmentError> {
    let output = fit_in_place(labels, features, &mut classifier)?;
    Ok((output, classifier))
}

/// Segment every pixel of `features` with an already fitted classifier
pub fn predict_segmenter<C: Classifier + ?Sized>(
    features: &FeatureStack,
    classifier: &C,
) -> Result<ArrayD<u32>, SegmentError> {
    let rows = features.pixel_rows();
    debug!("Predicting {} pixels", rows.nrows());

    let predicted = classifier.predict(rows.view())?;
    if predicted.len() != rows.nrows() {
        return Err(SegmentError::Classifier(format!(
            "expected {} predictions, got {}",
            rows.nrows(),
            predicted.len()
        )));
    }

    ArrayD::from_shape_vec(IxDyn(features.spatial_shape()), predicted.to_vec())
        .map_err(|e| SegmentError::InvalidParameter(e.to_string()))
}
