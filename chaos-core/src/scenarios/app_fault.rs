//! Scenario A: application fault via `/kill`.
//!
//! Checks that the load balancer's health checks notice a failing
//! application and that the scaling group replaces the instance, measuring
//! availability through both phases.

use std::fmt;
use std::time::Duration;

use chaos_types::{AvailabilityWindow, HealthySet, InstanceId, ScenarioReport};
use tracing::{info, warn};

use super::{id_list, with_availability, Harness, Sampled, ScenarioOutcome};
use crate::error::Result;
use crate::poll::Poller;

/// What a passing application-fault run observed.
#[derive(Debug, Clone, PartialEq)]
pub struct AppFaultReport {
    /// Healthy targets before the fault.
    pub baseline: HealthySet,
    /// Targets that left the healthy set when the fault was detected.
    pub removed: Vec<InstanceId>,
    /// Time from fault injection to detection.
    pub detected_after: Duration,
    /// Healthy targets once recovered.
    pub recovered: HealthySet,
    /// Time from detection to recovery.
    pub recovered_after: Duration,
    /// Probes taken while detecting and recovering.
    pub availability: AvailabilityWindow,
    /// Threshold the availability was held against.
    pub availability_threshold: f64,
}

impl From<&AppFaultReport> for ScenarioReport {
    fn from(r: &AppFaultReport) -> Self {
        let report = ScenarioReport::new(format!(
            "Recovery completed in {}s",
            r.recovered_after.as_secs()
        ))
        .detail(format!("Initial healthy instances: {} {}", r.baseline.len(), r.baseline))
        .detail(format!(
            "Fault detected after {}s, removed {}",
            r.detected_after.as_secs(),
            id_list(&r.removed)
        ))
        .detail(format!("Healthy after recovery: {}", r.recovered));
        with_availability(report, &r.availability, r.availability_threshold)
    }
}

impl fmt::Display for AppFaultReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&ScenarioReport::from(self), f)
    }
}

impl Harness {
    /// Inject an application fault and wait for detection and recovery.
    pub async fn app_fault(&self) -> Result<ScenarioOutcome<AppFaultReport>> {
        info!("scenario A: application fault recovery (/kill)");

        if let Err(outcome) = self.stabilize().await?.passed() {
            return Ok(outcome);
        }

        let fault = &self.config.fault;
        let baseline = self.healthy().await?;
        info!(healthy = baseline.len(), instances = %baseline, "initial healthy instances");

        // The serving instance may die before answering
        if let Err(e) = self.app.inject_fault().await {
            warn!(error = %e, "fault injection request failed, ignoring");
        }

        let mut availability = AvailabilityWindow::new();

        info!(
            deadline_secs = fault.detect_deadline_secs,
            "waiting for load balancer to detect unhealthy target"
        );
        let detect = Poller::new(fault.poll_short(), fault.detect_deadline())
            .poll_until_with(
                move || self.observe_sampled(),
                |obs: &Sampled| obs.healthy.len() < baseline.len(),
                |obs: &Sampled, _| obs.record(&mut availability),
            )
            .await?;

        if !detect.converged {
            return Ok(ScenarioOutcome::failed(format!(
                "ALB did not detect application fault within {}s.",
                fault.detect_deadline_secs
            )));
        }

        let removed = baseline.removed_in(&detect.observation.healthy);
        info!(
            elapsed_secs = detect.elapsed.as_secs(),
            removed = %id_list(&removed),
            "fault detected by load balancer"
        );

        info!(
            deadline_secs = fault.recovery_deadline_secs,
            "waiting for scaling group recovery"
        );
        let recovery = Poller::new(fault.poll_long(), fault.recovery_deadline())
            .poll_until_with(
                move || self.observe_sampled(),
                |obs: &Sampled| obs.healthy.len() >= baseline.len(),
                |obs: &Sampled, _| obs.record(&mut availability),
            )
            .await?;

        if !recovery.converged {
            return Ok(ScenarioOutcome::failed(format!(
                "Service did not recover within {}s.",
                fault.recovery_deadline_secs
            )));
        }

        info!(
            elapsed_secs = recovery.elapsed.as_secs(),
            availability = %availability,
            "recovery completed"
        );
        if !availability.meets(fault.availability_threshold_percent) {
            warn!(availability = %availability, "some requests failed during recovery");
        }

        Ok(ScenarioOutcome::Passed(AppFaultReport {
            baseline,
            removed,
            detected_after: detect.elapsed,
            recovered: recovery.observation.healthy,
            recovered_after: recovery.elapsed,
            availability,
            availability_threshold: fault.availability_threshold_percent,
        }))
    }
}
