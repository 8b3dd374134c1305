//! Load driver.
//!
//! A fixed pool of workers, each calling a target function in a loop until a
//! shared stop flag is set. Per-call errors are counted and otherwise
//! discarded. [`LoadDriver::stop`] sets the flag and joins every worker, so
//! no request is issued after it returns.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::app::Application;
use crate::error::{ChaosError, Result};

/// Request counters shared by all workers.
#[derive(Debug, Default)]
struct LoadCounters {
    requests: AtomicU64,
    failures: AtomicU64,
}

/// Totals reported when the driver stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadStats {
    /// Number of workers that ran.
    pub workers: usize,
    /// Requests issued across all workers.
    pub requests: u64,
    /// Requests that returned an error (discarded).
    pub failures: u64,
}

/// Handle to a running pool of load workers.
///
/// Dropping the handle without calling [`stop`](Self::stop) aborts the
/// workers at their next suspension point.
#[derive(Debug)]
pub struct LoadDriver {
    stop: Arc<AtomicBool>,
    counters: Arc<LoadCounters>,
    workers: JoinSet<()>,
    worker_count: usize,
}

impl LoadDriver {
    /// Spawn `worker_count` workers that each call `target` until stopped.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start<F, Fut, E>(worker_count: usize, target: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<(), E>> + Send + 'static,
        E: Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let counters = Arc::new(LoadCounters::default());
        let target = Arc::new(target);
        let mut workers = JoinSet::new();

        for worker in 0..worker_count {
            let stop = Arc::clone(&stop);
            let counters = Arc::clone(&counters);
            let target = Arc::clone(&target);

            workers.spawn(async move {
                while !stop.load(Ordering::Acquire) {
                    counters.requests.fetch_add(1, Ordering::Relaxed);
                    if target().await.is_err() {
                        counters.failures.fetch_add(1, Ordering::Relaxed);
                    }
                    // Keep the flag observable when the target completes
                    // without suspending.
                    tokio::task::yield_now().await;
                }
                debug!(worker, "load worker exiting");
            });
        }

        info!(workers = worker_count, "load started");
        Self {
            stop,
            counters,
            workers,
            worker_count,
        }
    }

    /// Drive `/work` requests against `app` from `worker_count` workers.
    pub fn against(worker_count: usize, app: Arc<dyn Application>) -> Self {
        Self::start(worker_count, move || {
            let app = Arc::clone(&app);
            async move { app.trigger_work().await }
        })
    }

    /// Requests issued so far.
    pub fn requests_issued(&self) -> u64 {
        self.counters.requests.load(Ordering::Relaxed)
    }

    /// Signal every worker to stop and wait for all of them to exit.
    ///
    /// A worker that panicked is reported as [`ChaosError::LoadDriver`]
    /// after the remaining workers have been joined.
    pub async fn stop(mut self) -> Result<LoadStats> {
        self.stop.store(true, Ordering::Release);

        let mut failure = None;
        while let Some(joined) = self.workers.join_next().await {
            if let Err(e) = joined {
                warn!(error = %e, "load worker did not exit cleanly");
                failure.get_or_insert_with(|| e.to_string());
            }
        }

        let stats = LoadStats {
            workers: self.worker_count,
            requests: self.counters.requests.load(Ordering::Relaxed),
            failures: self.counters.failures.load(Ordering::Relaxed),
        };
        info!(
            requests = stats.requests,
            failures = stats.failures,
            "load stopped"
        );

        match failure {
            Some(message) => Err(ChaosError::LoadDriver(message)),
            None => Ok(stats),
        }
    }
}
