//! HTTP implementation of the application surface.

use std::time::Duration;

use async_trait::async_trait;
use tracing::trace;

use super::{AppError, Application};
use crate::config::HarnessConfig;
use crate::probe::{AvailabilitySampler, ProbeOutcome};

/// Talks to the application through its load balancer URL.
#[derive(Debug, Clone)]
pub struct HttpApplication {
    base_url: String,
    http: reqwest::Client,
    sampler: AvailabilitySampler,
    kill_timeout: Duration,
    work_seconds: u64,
    work_timeout: Duration,
}

impl HttpApplication {
    /// Create a client for `base_url` (already normalized: scheme present,
    /// no trailing slash) using the timeouts from `config`.
    pub fn new(base_url: impl Into<String>, config: &HarnessConfig) -> Self {
        let http = reqwest::Client::new();
        Self {
            base_url: base_url.into(),
            sampler: AvailabilitySampler::with_client(http.clone(), config.probe.timeout()),
            http,
            kill_timeout: config.fault.kill_timeout(),
            work_seconds: config.scaling.work_seconds,
            work_timeout: config.scaling.work_timeout(),
        }
    }

    /// Base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// URL probed for availability.
    pub fn probe_url(&self) -> String {
        format!("{}/", self.base_url)
    }

    /// Fault-injection URL.
    pub fn kill_url(&self) -> String {
        format!("{}/kill", self.base_url)
    }

    /// Work-generation URL.
    pub fn work_url(&self) -> String {
        format!("{}/work?sec={}", self.base_url, self.work_seconds)
    }
}

#[async_trait]
impl Application for HttpApplication {
    async fn probe(&self) -> ProbeOutcome {
        self.sampler.probe(&self.probe_url()).await
    }

    async fn inject_fault(&self) -> Result<(), AppError> {
        // Any response, including an error status, means the request landed
        let response = self
            .http
            .get(self.kill_url())
            .timeout(self.kill_timeout)
            .send()
            .await?;
        trace!(status = response.status().as_u16(), "kill request answered");
        Ok(())
    }

    async fn trigger_work(&self) -> Result<(), AppError> {
        let response = self
            .http
            .get(self.work_url())
            .timeout(self.work_timeout)
            .send()
            .await?;
        response.error_for_status()?;
        Ok(())
    }
}
