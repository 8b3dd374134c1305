//! Mock application for testing.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use super::{AppError, Application};
use crate::probe::ProbeOutcome;

/// Scripted application endpoint.
///
/// Probes replay a queue of outcomes; the last one repeats, and an empty
/// queue means always available.
#[derive(Debug, Default, Clone)]
pub struct MockApplication {
    inner: Arc<Mutex<MockApplicationInner>>,
}

#[derive(Debug, Default)]
struct MockApplicationInner {
    probe_script: VecDeque<bool>,
    probes: usize,
    faults_injected: usize,
    work_requests: usize,
    fail_faults: bool,
    fail_work: bool,
    work_latency: Duration,
}

impl MockApplication {
    /// Always-available application that accepts every request.
    pub fn new() -> Self {
        Self::default()
    }

    fn inner(&self) -> MutexGuard<'_, MockApplicationInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue `times` probe results.
    pub fn push_available(&self, available: bool, times: usize) -> &Self {
        let mut inner = self.inner();
        for _ in 0..times {
            inner.probe_script.push_back(available);
        }
        self
    }

    /// Make every fault-injection request fail.
    pub fn fail_faults(&self) {
        self.inner().fail_faults = true;
    }

    /// Make every work request fail.
    pub fn fail_work(&self) {
        self.inner().fail_work = true;
    }

    /// Time each work request takes before answering.
    pub fn set_work_latency(&self, latency: Duration) {
        self.inner().work_latency = latency;
    }

    /// Number of probes served.
    pub fn probes(&self) -> usize {
        self.inner().probes
    }

    /// Number of fault-injection requests received.
    pub fn faults_injected(&self) -> usize {
        self.inner().faults_injected
    }

    /// Number of work requests received.
    pub fn work_requests(&self) -> usize {
        self.inner().work_requests
    }
}

#[async_trait]
impl Application for MockApplication {
    async fn probe(&self) -> ProbeOutcome {
        let mut inner = self.inner();
        inner.probes += 1;
        let available = if inner.probe_script.len() > 1 {
            inner.probe_script.pop_front().unwrap_or(true)
        } else {
            inner.probe_script.front().copied().unwrap_or(true)
        };
        ProbeOutcome {
            available,
            status: Some(if available { 200 } else { 503 }),
            host: None,
        }
    }

    async fn inject_fault(&self) -> Result<(), AppError> {
        let mut inner = self.inner();
        inner.faults_injected += 1;
        if inner.fail_faults {
            return Err(AppError::ConnectionFailed("connection reset".into()));
        }
        Ok(())
    }

    async fn trigger_work(&self) -> Result<(), AppError> {
        let (latency, fail) = {
            let mut inner = self.inner();
            inner.work_requests += 1;
            (inner.work_latency, inner.fail_work)
        };
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        if fail {
            return Err(AppError::Timeout("work request timed out".into()));
        }
        Ok(())
    }
}
