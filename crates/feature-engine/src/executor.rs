//! Worker pool for per-(channel, scale) feature tasks
//!
//! Backends are tried in a fixed rank order when the executor is built:
//! the rayon thread pool (cargo feature `parallel`) and then serial
//! execution. The choice is made once and reported by [`ParallelExecutor::kind`].

use tracing::{debug, warn};

use crate::config::Workers;
use crate::error::FeatureError;

/// Available execution strategies, best first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorKind {
    /// Bounded rayon thread pool
    ThreadPool,
    /// Tasks run one after another on the calling thread
    Serial,
}

impl ExecutorKind {
    /// Preference order used when selecting a backend
    pub const RANKED: [ExecutorKind; 2] = [ExecutorKind::ThreadPool, ExecutorKind::Serial];

    /// Whether this backend was compiled in
    pub fn is_available(self) -> bool {
        match self {
            ExecutorKind::ThreadPool => cfg!(feature = "parallel"),
            ExecutorKind::Serial => true,
        }
    }
}

#[derive(Debug)]
enum Backend {
    #[cfg(feature = "parallel")]
    Pool(rayon::ThreadPool),
    Serial,
}

/// Runs independent tasks and hands results back in task order
#[derive(Debug)]
pub struct ParallelExecutor {
    backend: Backend,
    workers: usize,
}

impl ParallelExecutor {
    /// Select the best available backend for `workers`
    pub fn new(workers: Workers) -> Result<Self, FeatureError> {
        let threads = workers.resolve()?;
        if threads == 1 {
            return Ok(Self::serial());
        }

        for kind in ExecutorKind::RANKED {
            if !kind.is_available() {
                continue;
            }
            match kind {
                ExecutorKind::ThreadPool => {
                    if let Some(backend) = Self::build_pool(threads) {
                        debug!("Feature executor: thread pool with {} workers", threads);
                        return Ok(Self {
                            backend,
                            workers: threads,
                        });
                    }
                }
                ExecutorKind::Serial => break,
            }
        }

        debug!("Feature executor: serial");
        Ok(Self::serial())
    }

    /// Executor that never spawns threads
    pub fn serial() -> Self {
        Self {
            backend: Backend::Serial,
            workers: 1,
        }
    }

    #[cfg(feature = "parallel")]
    fn build_pool(threads: usize) -> Option<Backend> {
        match rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("features-{i}"))
            .build()
        {
            Ok(pool) => Some(Backend::Pool(pool)),
            Err(e) => {
                warn!("Thread pool unavailable ({}), falling back to serial", e);
                None
            }
        }
    }

    #[cfg(not(feature = "parallel"))]
    fn build_pool(_threads: usize) -> Option<Backend> {
        warn!("Built without the `parallel` feature, falling back to serial");
        None
    }

    /// Backend in use
    pub fn kind(&self) -> ExecutorKind {
        match self.backend {
            #[cfg(feature = "parallel")]
            Backend::Pool(_) => ExecutorKind::ThreadPool,
            Backend::Serial => ExecutorKind::Serial,
        }
    }

    /// Number of workers tasks are spread over
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Apply `task` to every element of `inputs`.
    ///
    /// The output vector is indexed like `inputs`, whatever order the tasks
    /// finish in. The first error aborts the run and no results are returned.
    pub fn map_indexed<T, R, E, F>(&self, inputs: &[T], task: F) -> Result<Vec<R>, E>
    where
        T: Sync,
        R: Send,
        E: Send,
        F: Fn(usize, &T) -> Result<R, E> + Sync + Send,
    {
        match &self.backend {
            #[cfg(feature = "parallel")]
            Backend::Pool(pool) => {
                use rayon::prelude::*;

                pool.install(|| {
                    inputs
                        .par_iter()
                        .enumerate()
                        .map(|(index, input)| task(index, input))
                        .collect()
                })
            }
            Backend::Serial => inputs
                .iter()
                .enumerate()
                .map(|(index, input)| task(index, input))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_single_worker_is_serial() {
        let executor = ParallelExecutor::new(Workers::Fixed(1)).unwrap();
        assert_eq!(executor.kind(), ExecutorKind::Serial);
        assert_eq!(executor.workers(), 1);
    }

    #[test]
    fn test_zero_workers_rejected() {
        assert!(matches!(
            ParallelExecutor::new(Workers::Fixed(0)),
            Err(FeatureError::InvalidParameter(_))
        ));
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_pool_selected_when_available() {
        assert!(ExecutorKind::ThreadPool.is_available());
        let executor = ParallelExecutor::new(Workers::Fixed(4)).unwrap();
        assert_eq!(executor.kind(), ExecutorKind::ThreadPool);
        assert_eq!(executor.workers(), 4);
    }

    #[cfg(not(feature = "parallel"))]
    #[test]
    fn test_serial_fallback_without_pool() {
        assert!(!ExecutorKind::ThreadPool.is_available());
        let executor = ParallelExecutor::new(Workers::Fixed(4)).unwrap();
        assert_eq!(executor.kind(), ExecutorKind::Serial);
        assert_eq!(executor.workers(), 1);
    }

    #[test]
    fn test_results_in_task_order() {
        let inputs: Vec<u64> = (0..64).collect();
        for workers in [Workers::Fixed(1), Workers::Fixed(8)] {
            let executor = ParallelExecutor::new(workers).unwrap();
            let out: Vec<u64> = executor
                .map_indexed(&inputs, |index, &value| {
                    // uneven work so completion order differs from task order
                    let spin = (64 - value) * 200;
                    let mut acc = 0u64;
                    for i in 0..spin {
                        acc = acc.wrapping_add(i);
                    }
                    std::hint::black_box(acc);
                    Ok::<_, FeatureError>(index as u64 * 10 + value)
                })
                .unwrap();
            let expected: Vec<u64> = (0..64).map(|v| v * 11).collect();
            assert_eq!(out, expected);
        }
    }

    #[test]
    fn test_failure_aborts_run() {
        let executor = ParallelExecutor::new(Workers::Fixed(4)).unwrap();
        let calls = AtomicUsize::new(0);
        let inputs: Vec<usize> = (0..16).collect();
        let result: Result<Vec<usize>, FeatureError> = executor.map_indexed(&inputs, |_, &v| {
            calls.fetch_add(1, Ordering::Relaxed);
            if v == 5 {
                Err(FeatureError::InvalidParameter("boom".to_string()))
            } else {
                Ok(v)
            }
        });
        assert!(matches!(result, Err(FeatureError::InvalidParameter(_))));
        assert!(calls.load(Ordering::Relaxed) >= 1);
    }
}
