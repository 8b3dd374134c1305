//! Scenario B: infrastructure fault by instance termination.

use std::fmt;
use std::time::Duration;

use chaos_types::{AvailabilityWindow, HealthySet, InstanceId, ScenarioReport};
use tracing::info;

use super::{id_list, with_availability, Harness, Sampled, ScenarioOutcome};
use crate::error::Result;
use crate::poll::Poller;

/// What a passing infrastructure-fault run observed.
#[derive(Debug, Clone, PartialEq)]
pub struct InfraFaultReport {
    /// Healthy targets before termination.
    pub baseline: HealthySet,
    /// The terminated instance.
    pub victim: InstanceId,
    /// Healthy targets once self-healing completed.
    pub recovered: HealthySet,
    /// Targets that joined in place of the victim.
    pub replacements: Vec<InstanceId>,
    /// Time from termination to recovery.
    pub recovered_after: Duration,
    /// Probes taken while recovering.
    pub availability: AvailabilityWindow,
    /// Threshold the availability was held against.
    pub availability_threshold: f64,
}

impl From<&InfraFaultReport> for ScenarioReport {
    fn from(r: &InfraFaultReport) -> Self {
        let report = ScenarioReport::new(format!(
            "Self-healing completed in {}s",
            r.recovered_after.as_secs()
        ))
        .detail(format!("Terminated instance: {}", r.victim))
        .detail(format!("Healthy before: {}", r.baseline))
        .detail(format!(
            "Healthy after: {} (replacements {})",
            r.recovered,
            id_list(&r.replacements)
        ));
        with_availability(report, &r.availability, r.availability_threshold)
    }
}

impl fmt::Display for InfraFaultReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&ScenarioReport::from(self), f)
    }
}

impl Harness {
    /// Terminate one healthy instance (without lowering desired capacity)
    /// and wait for the scaling group to replace it.
    ///
    /// The victim is the lowest instance identifier in the baseline.
    pub async fn infra_fault(&self) -> Result<ScenarioOutcome<InfraFaultReport>> {
        info!("scenario B: infrastructure fault recovery (terminate instance)");

        if let Err(outcome) = self.stabilize().await?.passed() {
            return Ok(outcome);
        }

        let fault = &self.config.fault;
        let baseline = self.healthy().await?;
        let Some(victim) = baseline.first().cloned() else {
            return Ok(ScenarioOutcome::skipped(
                "No healthy instance available to terminate.",
            ));
        };

        info!(victim = %victim, healthy = baseline.len(), "terminating instance");
        self.state
            .control_plane()
            .terminate_instance(&victim, false)
            .await?;

        let mut availability = AvailabilityWindow::new();
        info!(
            deadline_secs = fault.recovery_deadline_secs,
            "monitoring recovery and availability"
        );
        let recovery = Poller::new(fault.poll_short(), fault.recovery_deadline())
            .poll_until_with(
                move || self.observe_sampled(),
                |obs: &Sampled| {
                    !obs.healthy.contains(&victim) && obs.healthy.len() >= baseline.len()
                },
                |obs: &Sampled, _| obs.record(&mut availability),
            )
            .await?;

        if !recovery.converged {
            return Ok(ScenarioOutcome::failed(format!(
                "Infrastructure recovery failed within {}s.",
                fault.recovery_deadline_secs
            )));
        }

        let recovered = recovery.observation.healthy;
        let replacements = baseline.added_in(&recovered);
        info!(
            elapsed_secs = recovery.elapsed.as_secs(),
            replacements = %id_list(&replacements),
            availability = %availability,
            "self-healing completed"
        );

        Ok(ScenarioOutcome::Passed(InfraFaultReport {
            baseline,
            victim,
            recovered,
            replacements,
            recovered_after: recovery.elapsed,
            availability,
            availability_threshold: fault.availability_threshold_percent,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::harness;
    use super::*;
    use crate::app::MockApplication;
    use crate::control_plane::MockControlPlane;
    use crate::{ChaosError, HarnessConfig};

    #[tokio::test(start_paused = true)]
    async fn replaces_terminated_victim() {
        let plane = MockControlPlane::new();
        // stabilize, baseline
        plane.push_healthy(&["i-b", "i-a"], 2);
        // victim gone, replacement not yet healthy
        plane.push_healthy(&["i-b"], 1);
        plane.push_healthy(&["i-b", "i-c"], 1);

        let app = MockApplication::new();
        app.push_available(true, 1);

        let outcome = harness(&plane, &app).infra_fault().await.unwrap();
        let report = outcome.report().expect("scenario should pass");

        assert_eq!(report.victim, InstanceId::from("i-a"));
        assert_eq!(plane.terminated(), vec![(InstanceId::from("i-a"), false)]);
        assert!(!report.recovered.contains(&report.victim));
        assert_eq!(report.recovered.len(), 2);
        assert_eq!(report.replacements, vec![InstanceId::from("i-c")]);
        assert_eq!(report.recovered_after, Duration::from_secs(5));
        assert_eq!(report.availability.checks(), 1);
        assert_eq!(report.availability.successes(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn victim_still_healthy_is_not_recovery() {
        let plane = MockControlPlane::new();
        plane.push_healthy(&["i-a", "i-b"], 2);
        // Count restored but the victim never left
        plane.push_healthy(&["i-a", "i-b", "i-c"], 1);

        let outcome = harness(&plane, &MockApplication::new())
            .infra_fault()
            .await
            .unwrap();

        assert_eq!(
            outcome,
            ScenarioOutcome::failed("Infrastructure recovery failed within 600s.")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn fewer_targets_than_baseline_is_not_recovery() {
        let plane = MockControlPlane::new();
        plane.push_healthy(&["i-a", "i-b", "i-c"], 2);
        plane.push_healthy(&["i-b", "i-c"], 1);

        let outcome = harness(&plane, &MockApplication::new())
            .infra_fault()
            .await
            .unwrap();
        assert!(outcome.is_failed());
    }

    #[tokio::test(start_paused = true)]
    async fn termination_failure_aborts() {
        let plane = MockControlPlane::new();
        plane.push_healthy(&["i-a", "i-b"], 1);
        plane.fail_next_terminate("ValidationError");

        let err = harness(&plane, &MockApplication::new())
            .infra_fault()
            .await
            .unwrap_err();
        assert!(matches!(err, ChaosError::ControlPlane(_)));
        assert!(plane.terminated().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn empty_baseline_skips() {
        let plane = MockControlPlane::new();
        let mut config = HarnessConfig::default();
        config.stabilize.min_healthy = 0;
        let harness = harness(&plane, &MockApplication::new());
        let harness = Harness { config, ..harness };

        let outcome = harness.infra_fault().await.unwrap();
        assert!(outcome.is_skipped());
        assert!(plane.terminated().is_empty());
    }
}
