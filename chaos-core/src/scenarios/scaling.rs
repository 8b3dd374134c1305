//! Scaling lifecycle: scale out under load, scale back in once it stops.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chaos_types::{HealthySet, InstanceId, ScenarioReport};
use tracing::info;

use super::{id_list, Harness, ScenarioOutcome};
use crate::error::Result;
use crate::load::{LoadDriver, LoadStats};
use crate::poll::Poller;

/// What a passing scaling run observed.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalingReport {
    /// Desired capacity before load.
    pub initial_capacity: u32,
    /// Desired capacity once scale-out was decided.
    pub scale_out_capacity: u32,
    /// Desired capacity once scale-in was decided.
    pub scale_in_capacity: u32,
    /// Healthy targets before load.
    pub initial_healthy: HealthySet,
    /// Healthy targets after scale-out.
    pub scale_out_healthy: HealthySet,
    /// Healthy targets after scale-in.
    pub scale_in_healthy: HealthySet,
    /// Targets that joined during scale-out.
    pub added: Vec<InstanceId>,
    /// Targets that left during scale-in.
    pub removed: Vec<InstanceId>,
    /// Time from load start to the scale-out decision.
    pub scale_out_after: Duration,
    /// Time from load stop to the scale-in decision.
    pub scale_in_after: Duration,
    /// Load generated while scaling out.
    pub load: LoadStats,
}

impl From<&ScalingReport> for ScenarioReport {
    fn from(r: &ScalingReport) -> Self {
        ScenarioReport::new(format!(
            "Capacity {} -> {} -> {}",
            r.initial_capacity, r.scale_out_capacity, r.scale_in_capacity
        ))
        .detail(format!(
            "Scale-out decision after {}s ({} -> {}), new healthy targets {}",
            r.scale_out_after.as_secs(),
            r.initial_capacity,
            r.scale_out_capacity,
            id_list(&r.added)
        ))
        .detail(format!(
            "Scale-in decision after {}s ({} -> {}), removed targets {}",
            r.scale_in_after.as_secs(),
            r.scale_out_capacity,
            r.scale_in_capacity,
            id_list(&r.removed)
        ))
        .detail(format!(
            "Load: {} requests from {} workers ({} failed)",
            r.load.requests, r.load.workers, r.load.failures
        ))
    }
}

impl fmt::Display for ScalingReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&ScenarioReport::from(self), f)
    }
}

/// State reached by the scale-out phases.
struct ScaledOut {
    capacity: u32,
    healthy: HealthySet,
    after: Duration,
}

impl Harness {
    /// Drive load until the scaling group scales out, stop it, then wait
    /// for scale-in.
    ///
    /// Scale-in is decided against the capacity reached by scale-out, not
    /// the initial capacity. Load is stopped whichever way the scale-out
    /// phases end.
    pub async fn scaling(&self) -> Result<ScenarioOutcome<ScalingReport>> {
        info!("scenario: scaling group lifecycle");

        let Some(group) = self.scaling_group.as_deref() else {
            return Ok(ScenarioOutcome::skipped("ASG name is not configured."));
        };
        let scaling = &self.config.scaling;

        let initial_capacity = self.state.desired_capacity(group).await?;
        let initial_healthy = self.healthy().await?;
        info!(
            capacity = initial_capacity,
            healthy = %initial_healthy,
            "initial state"
        );

        let load = LoadDriver::against(scaling.workers, Arc::clone(&self.app));
        let phase = self
            .scale_out(group, initial_capacity, &initial_healthy)
            .await;
        info!("stopping load generation");
        let stopped = load.stop().await;

        let scaled_out = match phase? {
            Ok(scaled_out) => scaled_out,
            Err(reason) => return Ok(ScenarioOutcome::failed(reason)),
        };
        let load = stopped?;

        info!(
            deadline_secs = scaling.scale_in_deadline_secs,
            "waiting for scale-in decision"
        );
        let state = &self.state;
        let decision = Poller::new(scaling.scale_in_interval(), scaling.scale_in_deadline())
            .poll_until(
                move || state.desired_capacity(group),
                |capacity: &u32| *capacity < scaled_out.capacity,
            )
            .await?;

        if !decision.converged {
            return Ok(ScenarioOutcome::failed(format!(
                "Scale-in decision was not detected within {}s.",
                scaling.scale_in_deadline_secs
            )));
        }
        info!(
            from = scaled_out.capacity,
            to = decision.observation,
            "scale-in decision detected"
        );

        let drained = Poller::new(scaling.scale_in_interval(), scaling.scale_in_deadline())
            .poll_until(
                move || self.healthy(),
                |healthy: &HealthySet| healthy.len() < scaled_out.healthy.len(),
            )
            .await?;

        if !drained.converged {
            return Ok(ScenarioOutcome::failed(format!(
                "Scale-in decision happened, but healthy targets did not decrease within {}s.",
                scaling.scale_in_deadline_secs
            )));
        }

        let removed = scaled_out.healthy.removed_in(&drained.observation);
        info!(removed = %id_list(&removed), "scale-in completed");

        Ok(ScenarioOutcome::Passed(ScalingReport {
            initial_capacity,
            scale_out_capacity: scaled_out.capacity,
            scale_in_capacity: decision.observation,
            added: initial_healthy.added_in(&scaled_out.healthy),
            initial_healthy,
            scale_out_healthy: scaled_out.healthy,
            scale_in_healthy: drained.observation,
            removed,
            scale_out_after: scaled_out.after,
            scale_in_after: decision.elapsed,
            load,
        }))
    }

    /// Scale-out decision, then new healthy targets. `Ok(Err(reason))`
    /// when either does not happen in time.
    async fn scale_out(
        &self,
        group: &str,
        initial_capacity: u32,
        initial_healthy: &HealthySet,
    ) -> Result<std::result::Result<ScaledOut, String>> {
        let scaling = &self.config.scaling;
        let poller = Poller::new(scaling.scale_out_interval(), scaling.scale_out_deadline());

        info!(
            deadline_secs = scaling.scale_out_deadline_secs,
            "waiting for scale-out decision"
        );
        let state = &self.state;
        let decision = poller
            .poll_until(
                move || state.desired_capacity(group),
                |capacity: &u32| *capacity > initial_capacity,
            )
            .await?;

        if !decision.converged {
            return Ok(Err(format!(
                "Scale-out not detected within {}s (current={})",
                scaling.scale_out_deadline_secs, decision.observation
            )));
        }
        info!(
            from = initial_capacity,
            to = decision.observation,
            "scale-out decision detected"
        );

        let joined = poller
            .poll_until(
                move || self.healthy(),
                |healthy: &HealthySet| healthy.len() > initial_healthy.len(),
            )
            .await?;

        if !joined.converged {
            return Ok(Err(format!(
                "Scale-out detected but no new healthy targets joined ALB within {}s",
                scaling.scale_out_deadline_secs
            )));
        }
        info!(
            added = %id_list(&initial_healthy.added_in(&joined.observation)),
            "new healthy targets detected"
        );

        Ok(Ok(ScaledOut {
            capacity: decision.observation,
            healthy: joined.observation,
            after: decision.elapsed,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::harness;
    use super::*;
    use crate::app::MockApplication;
    use crate::control_plane::MockControlPlane;
    use crate::ChaosError;

    fn loaded_app() -> MockApplication {
        let app = MockApplication::new();
        app.set_work_latency(Duration::from_secs(1));
        app
    }

    #[tokio::test(start_paused = true)]
    async fn detects_scale_out_then_scale_in() {
        let plane = MockControlPlane::new();
        // initial read, then [2, 2, 3] during scale-out, [3, 3, 2] during scale-in
        plane
            .push_capacity(Some(2), 3)
            .push_capacity(Some(3), 3)
            .push_capacity(Some(2), 1);
        plane
            .push_healthy(&["i-a", "i-b"], 2)
            .push_healthy(&["i-a", "i-b", "i-c"], 2)
            .push_healthy(&["i-a", "i-b"], 1);
        let app = loaded_app();

        let outcome = harness(&plane, &app)
            .with_scaling_group("web-asg")
            .scaling()
            .await
            .unwrap();
        let report = outcome.report().expect("scenario should pass");

        assert_eq!(
            (report.initial_capacity, report.scale_out_capacity),
            (2, 3)
        );
        assert_eq!(
            (report.scale_out_capacity, report.scale_in_capacity),
            (3, 2)
        );
        assert_eq!(report.scale_out_after, Duration::from_secs(30));
        assert_eq!(report.scale_in_after, Duration::from_secs(60));
        assert_eq!(report.added, vec![InstanceId::from("i-c")]);
        assert_eq!(report.removed, vec![InstanceId::from("i-c")]);
        assert_eq!(plane.capacity_calls(), 7);
        assert!(report.load.requests > 0);
        assert_eq!(report.load.workers, 6);
    }

    #[tokio::test(start_paused = true)]
    async fn scale_in_is_measured_against_peak_capacity() {
        let plane = MockControlPlane::new();
        // 2 -> 4, then back down only to 3: above the initial capacity
        plane
            .push_capacity(Some(2), 1)
            .push_capacity(Some(4), 2)
            .push_capacity(Some(3), 1);
        plane
            .push_healthy(&["i-a", "i-b"], 1)
            .push_healthy(&["i-a", "i-b", "i-c", "i-d"], 2)
            .push_healthy(&["i-a", "i-b", "i-c"], 1);

        let outcome = harness(&plane, &loaded_app())
            .with_scaling_group("web-asg")
            .scaling()
            .await
            .unwrap();
        let report = outcome.report().expect("scenario should pass");

        assert_eq!(report.scale_in_capacity, 3);
        assert!(report.scale_in_capacity > report.initial_capacity);
        assert_eq!(report.removed, vec![InstanceId::from("i-d")]);
    }

    #[tokio::test(start_paused = true)]
    async fn skips_without_scaling_group() {
        let plane = MockControlPlane::new();
        let app = loaded_app();

        let outcome = harness(&plane, &app).scaling().await.unwrap();

        assert_eq!(
            outcome,
            ScenarioOutcome::skipped("ASG name is not configured.")
        );
        assert_eq!(plane.capacity_calls(), 0);
        assert_eq!(app.work_requests(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn load_stops_when_scale_out_never_happens() {
        let plane = MockControlPlane::new();
        plane.push_capacity(Some(2), 1);
        plane.push_healthy(&["i-a", "i-b"], 1);
        let app = loaded_app();

        let outcome = harness(&plane, &app)
            .with_scaling_group("web-asg")
            .scaling()
            .await
            .unwrap();

        assert_eq!(
            outcome,
            ScenarioOutcome::failed("Scale-out not detected within 600s (current=2)")
        );

        let issued = app.work_requests();
        assert!(issued > 0);
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(app.work_requests(), issued);
    }

    #[tokio::test(start_paused = true)]
    async fn fails_when_no_new_targets_join() {
        let plane = MockControlPlane::new();
        plane.push_capacity(Some(2), 1).push_capacity(Some(3), 1);
        plane.push_healthy(&["i-a", "i-b"], 1);

        let outcome = harness(&plane, &loaded_app())
            .with_scaling_group("web-asg")
            .scaling()
            .await
            .unwrap();

        assert_eq!(
            outcome,
            ScenarioOutcome::failed(
                "Scale-out detected but no new healthy targets joined ALB within 600s"
            )
        );
    }

    #[tokio::test(start_paused = true)]
    async fn fails_when_scale_in_never_decided() {
        let plane = MockControlPlane::new();
        plane.push_capacity(Some(2), 1).push_capacity(Some(3), 1);
        plane
            .push_healthy(&["i-a", "i-b"], 1)
            .push_healthy(&["i-a", "i-b", "i-c"], 1);

        let outcome = harness(&plane, &loaded_app())
            .with_scaling_group("web-asg")
            .scaling()
            .await
            .unwrap();

        assert_eq!(
            outcome,
            ScenarioOutcome::failed("Scale-in decision was not detected within 1500s.")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn fails_when_targets_never_drain() {
        let plane = MockControlPlane::new();
        plane
            .push_capacity(Some(2), 1)
            .push_capacity(Some(3), 1)
            .push_capacity(Some(2), 1);
        plane
            .push_healthy(&["i-a", "i-b"], 1)
            .push_healthy(&["i-a", "i-b", "i-c"], 1);

        let outcome = harness(&plane, &loaded_app())
            .with_scaling_group("web-asg")
            .scaling()
            .await
            .unwrap();

        assert!(outcome.is_failed());
    }

    #[tokio::test(start_paused = true)]
    async fn control_plane_error_before_load() {
        let plane = MockControlPlane::new();
        plane.fail_next_describe("AutoScalingGroup not found");
        let app = loaded_app();

        let err = harness(&plane, &app)
            .with_scaling_group("web-asg")
            .scaling()
            .await
            .unwrap_err();

        assert!(matches!(err, ChaosError::ControlPlane(_)));
        assert_eq!(app.work_requests(), 0);
    }
}
