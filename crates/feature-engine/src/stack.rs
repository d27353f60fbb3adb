//! Dense feature stack assembly

use std::fmt;

use ndarray::{Array2, ArrayD, ArrayViewD, Axis};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::{FeatureConfig, FeatureFlags};
use crate::error::FeatureError;
use crate::executor::ParallelExecutor;
use crate::multiscale::aggregate_features;
use crate::pixel::{to_float_image, Pixel};
use crate::scales::scale_sequence;

/// Descriptor family of one feature slice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeatureKind {
    Intensity,
    Edges,
    /// Hessian eigenvalue, 0 = smallest
    Texture(usize),
}

/// Provenance of one slice of a [`FeatureStack`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureDescriptor {
    pub channel: usize,
    pub sigma: f64,
    pub kind: FeatureKind,
}

impl fmt::Display for FeatureDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}/s{:.3}/", self.channel, self.sigma)?;
        match self.kind {
            FeatureKind::Intensity => write!(f, "intensity"),
            FeatureKind::Edges => write!(f, "edges"),
            FeatureKind::Texture(i) => write!(f, "texture{i}"),
        }
    }
}

/// Slice descriptors in stack order: channel, then scale, then flag order
pub fn feature_layout(
    spatial_ndim: usize,
    flags: FeatureFlags,
    sigmas: &[f64],
    n_channels: usize,
) -> Vec<FeatureDescriptor> {
    let mut kinds = Vec::with_capacity(flags.per_scale(spatial_ndim));
    if flags.intensity {
        kinds.push(FeatureKind::Intensity);
    }
    if flags.edges {
        kinds.push(FeatureKind::Edges);
    }
    if flags.texture {
        kinds.extend((0..spatial_ndim).map(FeatureKind::Texture));
    }

    let mut layout = Vec::with_capacity(n_channels * sigmas.len() * kinds.len());
    for channel in 0..n_channels {
        for &sigma in sigmas {
            layout.extend(kinds.iter().map(|&kind| FeatureDescriptor {
                channel,
                sigma,
                kind,
            }));
        }
    }
    layout
}

/// Per-pixel features of shape `(F, *S)`
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureStack {
    data: ArrayD<f32>,
    layout: Vec<FeatureDescriptor>,
}

impl FeatureStack {
    /// Wrap an `(F, *S)` array together with its slice descriptors
    pub fn new(data: ArrayD<f32>, layout: Vec<FeatureDescriptor>) -> Result<Self, FeatureError> {
        Self::check_stack_shape(&data)?;
        if data.len_of(Axis(0)) != layout.len() {
            return Err(FeatureError::InvalidParameter(format!(
                "{} feature slices but {} descriptors",
                data.len_of(Axis(0)),
                layout.len()
            )));
        }
        Ok(Self { data, layout })
    }

    /// Build from feature arrays without provenance (e.g. a custom feature
    /// function); descriptors are left empty
    pub fn from_slices(slices: &[ArrayD<f32>]) -> Result<Self, FeatureError> {
        if slices.is_empty() {
            return Err(FeatureError::InvalidParameter(
                "cannot stack zero feature slices".to_string(),
            ));
        }
        let views: Vec<ArrayViewD<'_, f32>> = slices.iter().map(|s| s.view()).collect();
        let data = ndarray::stack(Axis(0), &views)?;
        Self::check_stack_shape(&data)?;
        Ok(Self {
            data,
            layout: Vec::new(),
        })
    }

    fn check_stack_shape(data: &ArrayD<f32>) -> Result<(), FeatureError> {
        if data.ndim() < 2 {
            return Err(FeatureError::InvalidParameter(format!(
                "feature stack needs a feature axis and at least one spatial axis, got shape {:?}",
                data.shape()
            )));
        }
        Ok(())
    }

    /// Number of features `F`
    pub fn n_features(&self) -> usize {
        self.data.len_of(Axis(0))
    }

    /// Spatial shape `S`
    pub fn spatial_shape(&self) -> &[usize] {
        &self.data.shape()[1..]
    }

    /// Number of pixels, `prod(S)`
    pub fn n_pixels(&self) -> usize {
        self.spatial_shape().iter().product()
    }

    /// The `(F, *S)` array
    pub fn data(&self) -> &ArrayD<f32> {
        &self.data
    }

    /// Consume the stack, keeping only the `(F, *S)` array
    pub fn into_data(self) -> ArrayD<f32> {
        self.data
    }

    /// Slice descriptors (empty when built with [`FeatureStack::from_slices`])
    pub fn layout(&self) -> &[FeatureDescriptor] {
        &self.layout
    }

    /// Human-readable slice names
    pub fn names(&self) -> Vec<String> {
        self.layout.iter().map(ToString::to_string).collect()
    }

    /// Feature slice `index`, shaped like the image
    pub fn feature(&self, index: usize) -> ArrayViewD<'_, f32> {
        self.data.index_axis(Axis(0), index)
    }

    /// One row per pixel, `(prod(S), F)`, pixels in row-major order
    pub fn pixel_rows(&self) -> Array2<f32> {
        let (n_features, n_pixels) = (self.n_features(), self.n_pixels());
        let mut rows = Array2::<f32>::zeros((n_pixels, n_features));
        for (f, slice) in self.data.axis_iter(Axis(0)).enumerate() {
            for (row, &v) in rows.column_mut(f).iter_mut().zip(slice.iter()) {
                *row = v;
            }
        }
        rows
    }
}

/// Computes feature stacks for a fixed configuration, reusing one executor
#[derive(Debug)]
pub struct FeatureStackBuilder {
    config: FeatureConfig,
    executor: ParallelExecutor,
}

impl FeatureStackBuilder {
    /// Validate `config` and select the executor backend
    pub fn new(config: FeatureConfig) -> Result<Self, FeatureError> {
        config.validate()?;
        let executor = ParallelExecutor::new(config.workers)?;
        Ok(Self { config, executor })
    }

    /// Validated configuration this builder runs with
    pub fn config(&self) -> &FeatureConfig {
        &self.config
    }

    /// Executor selected at construction
    pub fn executor(&self) -> &ParallelExecutor {
        &self.executor
    }

    /// Features of `image`, shape `(F, *S)`.
    ///
    /// With `multichannel` set and at least 3 dimensions, the last axis is
    /// read as channels and `S` excludes it; otherwise the whole image is a
    /// single channel.
    pub fn build<P: Pixel>(&self, image: &ArrayViewD<'_, P>) -> Result<FeatureStack, FeatureError> {
        if image.ndim() == 0 {
            return Err(FeatureError::InvalidParameter(
                "image must have at least one axis".to_string(),
            ));
        }
        if image.shape().contains(&0) {
            return Err(FeatureError::InvalidParameter(format!(
                "image has an empty axis: {:?}",
                image.shape()
            )));
        }

        let sigmas = scale_sequence(self.config.sigma_min, self.config.sigma_max)?;
        let flags = self.config.flags();
        let working = to_float_image(image);

        let split_channels = self.config.multichannel && working.ndim() >= 3;
        let channels: Vec<ArrayViewD<'_, f32>> = if split_channels {
            working.axis_iter(Axis(working.ndim() - 1)).collect()
        } else {
            vec![working.view()]
        };
        let spatial: Vec<usize> = channels[0].shape().to_vec();

        info!(
            "Computing features: shape={:?}, channels={}, scales={:?}, workers={}",
            spatial,
            channels.len(),
            sigmas,
            self.executor.workers()
        );

        let slices = aggregate_features(&channels, &sigmas, flags, &self.executor)?;
        let layout = feature_layout(spatial.len(), flags, &sigmas, channels.len());

        let views: Vec<ArrayViewD<'_, f32>> = slices.iter().map(|s| s.view()).collect();
        let data = ndarray::stack(Axis(0), &views)?;

        FeatureStack::new(data, layout)
    }
}

/// One-shot feature computation, see [`FeatureStackBuilder::build`]
pub fn compute_features<P: Pixel>(
    image: &ArrayViewD<'_, P>,
    config: &FeatureConfig,
) -> Result<FeatureStack, FeatureError> {
    FeatureStackBuilder::new(config.clone())?.build(image)
}
