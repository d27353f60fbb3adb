//! Stateful compute / fit / predict session

use feature_engine::{to_float_image, FeatureConfig, FeatureError, FeatureStack, FeatureStackBuilder, Pixel};
use ndarray::{ArrayD, ArrayViewD};
use tracing::{debug, info, warn};

use crate::classifier::Classifier;
use crate::segment::{fit_in_place, predict_segmenter};
use crate::SegmentError;

/// Maps a float image to its feature stack, same contract as
/// [`FeatureStackBuilder::build`]
pub type FeatureFn =
    Box<dyn Fn(&ArrayViewD<'_, f32>) -> Result<FeatureStack, FeatureError> + Send + Sync>;

/// Progress of a [`TrainableSegmenter`] session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmenterState {
    Uninitialized,
    FeaturesComputed,
    Fitted,
}

/// Holds a classifier and a feature function, caching the features of the
/// last image so `fit` can reuse them.
pub struct TrainableSegmenter<C: Classifier> {
    classifier: C,
    feature_fn: FeatureFn,
    features: Option<FeatureStack>,
    segmented: Option<ArrayD<u32>>,
    state: SegmenterState,
}

impl<C: Classifier> TrainableSegmenter<C> {
    /// Session using the default feature configuration
    pub fn new(classifier: C) -> Result<Self, SegmentError> {
        Self::with_config(classifier, FeatureConfig::default())
    }

    /// Session computing features with `config`
    pub fn with_config(classifier: C, config: FeatureConfig) -> Result<Self, SegmentError> {
        let builder = FeatureStackBuilder::new(config)?;
        debug!(
            "Segmenter feature builder ready ({:?} executor)",
            builder.executor().kind()
        );
        Ok(Self::with_feature_fn(
            classifier,
            Box::new(move |image: &ArrayViewD<'_, f32>| builder.build(image)),
        ))
    }

    /// Session computing features with a caller-supplied function
    pub fn with_feature_fn(classifier: C, feature_fn: FeatureFn) -> Self {
        Self {
            classifier,
            feature_fn,
            features: None,
            segmented: None,
            state: SegmenterState::Uninitialized,
        }
    }

    fn features_of<P: Pixel>(&self, image: &ArrayViewD<'_, P>) -> Result<FeatureStack, SegmentError> {
        let working = to_float_image(image);
        Ok((self.feature_fn)(&working.view())?)
    }

    /// Compute and cache the features of `image`, replacing any previous cache
    pub fn compute_features<P: Pixel>(&mut self, image: &ArrayViewD<'_, P>) -> Result<&FeatureStack, SegmentError> {
        let stack = self.features_of(image)?;
        debug!(
            "Cached {} features over {:?}",
            stack.n_features(),
            stack.spatial_shape()
        );
        self.segmented = None;
        self.state = SegmenterState::FeaturesComputed;
        Ok(self.features.insert(stack))
    }

    /// Train on `labels` (0 = unlabeled) and segment the unlabeled pixels.
    ///
    /// With `Some(image)` the features are recomputed for that image first;
    /// with `None` the cached features are used. The fully labeled result is
    /// returned and kept for [`TrainableSegmenter::segmented_image`].
    pub fn fit<P: Pixel>(
        &mut self,
        labels: &ArrayViewD<'_, u32>,
        image: Option<&ArrayViewD<'_, P>>,
    ) -> Result<&ArrayD<u32>, SegmentError> {
        if let Some(image) = image {
            self.compute_features(image)?;
        }
        let features = self.features.as_ref().ok_or_else(|| {
            SegmentError::InvalidParameter(
                "no cached features: pass an image or call compute_features first".to_string(),
            )
        })?;

        let output = match fit_in_place(labels, features, &mut self.classifier) {
            Ok(output) => output,
            Err(e) => {
                warn!("Segmenter fit failed: {}", e);
                return Err(e);
            }
        };

        info!("Segmenter fitted on image of shape {:?}", labels.shape());
        self.state = SegmenterState::Fitted;
        Ok(self.segmented.insert(output))
    }

    /// Segment every pixel of `image`. Features are always recomputed and the
    /// cache is left untouched.
    pub fn predict<P: Pixel>(&self, image: &ArrayViewD<'_, P>) -> Result<ArrayD<u32>, SegmentError> {
        let features = self.features_of(image)?;
        predict_segmenter(&features, &self.classifier)
    }

    /// Output of the last successful `fit`
    pub fn segmented_image(&self) -> Option<&ArrayD<u32>> {
        self.segmented.as_ref()
    }

    /// Cached features, if any
    pub fn features(&self) -> Option<&FeatureStack> {
        self.features.as_ref()
    }

    /// Current session state
    pub fn state(&self) -> SegmenterState {
        self.state
    }

    /// The classifier, fitted once `fit` has succeeded
    pub fn classifier(&self) -> &C {
        &self.classifier
    }

    /// Consume the session, returning the classifier for reuse elsewhere
    pub fn into_classifier(self) -> C {
        self.classifier
    }
}
