//! Fan-out of single-scale extraction over channels and scales

use ndarray::{ArrayD, ArrayViewD};
use tracing::debug;

use crate::config::FeatureFlags;
use crate::error::FeatureError;
use crate::executor::ParallelExecutor;
use crate::single_scale::extract_single_scale;

/// One unit of work: a (channel, scale) pair
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleTask {
    pub channel: usize,
    pub sigma: f64,
}

/// Tasks in canonical order: channel ascending, then scales as given
/// (largest first when produced by [`crate::scale_sequence`])
pub fn plan_tasks(n_channels: usize, sigmas: &[f64]) -> Vec<ScaleTask> {
    (0..n_channels)
        .flat_map(|channel| sigmas.iter().map(move |&sigma| ScaleTask { channel, sigma }))
        .collect()
}

/// Compute the feature bundle of every (channel, scale) pair and concatenate
/// them channel-major, then by scale, then in flag order.
///
/// All channels must share one spatial shape. A failing task aborts the
/// aggregation with [`FeatureError::TaskFailure`].
pub fn aggregate_features(
    channels: &[ArrayViewD<'_, f32>],
    sigmas: &[f64],
    flags: FeatureFlags,
    executor: &ParallelExecutor,
) -> Result<Vec<ArrayD<f32>>, FeatureError> {
    if let Some(first) = channels.first() {
        if let Some(bad) = channels.iter().find(|c| c.shape() != first.shape()) {
            return Err(FeatureError::InvalidParameter(format!(
                "channel of shape {:?} does not match {:?}",
                bad.shape(),
                first.shape()
            )));
        }
    }

    let tasks = plan_tasks(channels.len(), sigmas);
    debug!(
        "Aggregating {} tasks ({} channels x {} scales) on {} worker(s)",
        tasks.len(),
        channels.len(),
        sigmas.len(),
        executor.workers()
    );

    let bundles = executor.map_indexed(&tasks, |index, task| {
        debug!(index, channel = task.channel, sigma = task.sigma, "feature task");
        extract_single_scale(&channels[task.channel], task.sigma, flags)
            .map_err(|e| FeatureError::task(task.channel, task.sigma, e))
    })?;

    Ok(bundles.into_iter().flatten().collect())
}
