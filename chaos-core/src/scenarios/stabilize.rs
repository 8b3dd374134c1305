//! Pre-test stabilization gate.

use chaos_types::HealthySet;
use tracing::info;

use super::{Harness, ScenarioOutcome};
use crate::error::Result;
use crate::poll::Poller;

impl Harness {
    /// Wait until at least `stabilize.min_healthy` targets are healthy.
    ///
    /// Passes with the healthy set that satisfied the gate. Skips when the
    /// gate is not met before `stabilize.deadline_secs`.
    pub async fn stabilize(&self) -> Result<ScenarioOutcome<HealthySet>> {
        let cfg = &self.config.stabilize;
        info!(
            min_healthy = cfg.min_healthy,
            deadline_secs = cfg.deadline_secs,
            "waiting for stable system state"
        );

        let result = Poller::new(cfg.interval(), cfg.deadline())
            .poll_until(move || self.healthy(), |healthy| healthy.len() >= cfg.min_healthy)
            .await?;

        if !result.converged {
            return Ok(ScenarioOutcome::skipped(format!(
                "System is unstable: healthy instances < {} after {}s.",
                cfg.min_healthy, cfg.deadline_secs
            )));
        }

        info!(
            healthy = result.observation.len(),
            elapsed_secs = result.elapsed.as_secs(),
            "system stable"
        );
        Ok(ScenarioOutcome::Passed(result.observation))
    }
}
