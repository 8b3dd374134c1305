//! Scenario orchestrators.
//!
//! Each scenario is a fixed sequence of phases, every phase one
//! [`Poller`](crate::poll::Poller) call:
//!
//! ```text
//! stabilize -> baseline -> inject (kill / terminate / load) -> detect -> recover -> verdict
//! ```
//!
//! A phase that does not converge in time ends the scenario as
//! [`ScenarioOutcome::Failed`]; an unmet setup precondition ends it as
//! [`ScenarioOutcome::Skipped`]. Control-plane errors abort with
//! [`ChaosError`](crate::ChaosError). Nothing injected is rolled back.

mod app_fault;
mod infra_fault;
mod scaling;
mod stabilize;

pub use app_fault::AppFaultReport;
pub use infra_fault::InfraFaultReport;
pub use scaling::ScalingReport;

use std::sync::Arc;

use chaos_types::{AvailabilityWindow, HealthySet, InstanceId, ScenarioReport};

use crate::app::Application;
use crate::config::HarnessConfig;
use crate::control_plane::ControlPlaneError;
use crate::probe::ProbeOutcome;
use crate::state::StateReader;

pub use chaos_types::ScenarioOutcome;

/// Everything a scenario needs: where the stack lives and how to reach it.
#[derive(Clone)]
pub struct Harness {
    state: StateReader,
    app: Arc<dyn Application>,
    target_group: String,
    scaling_group: Option<String>,
    config: HarnessConfig,
}

impl std::fmt::Debug for Harness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Harness")
            .field("target_group", &self.target_group)
            .field("scaling_group", &self.scaling_group)
            .finish_non_exhaustive()
    }
}

impl Harness {
    /// Harness for the stack behind `target_group`.
    pub fn new(
        state: StateReader,
        app: Arc<dyn Application>,
        target_group: impl Into<String>,
        config: HarnessConfig,
    ) -> Self {
        Self {
            state,
            app,
            target_group: target_group.into(),
            scaling_group: None,
            config,
        }
    }

    /// Name the scaling group; without one the scaling scenario skips.
    pub fn with_scaling_group(mut self, name: impl Into<String>) -> Self {
        self.scaling_group = Some(name.into());
        self
    }

    /// Tuning in effect.
    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Target group under test.
    pub fn target_group(&self) -> &str {
        &self.target_group
    }

    /// Scaling group under test, if configured.
    pub fn scaling_group(&self) -> Option<&str> {
        self.scaling_group.as_deref()
    }

    async fn healthy(&self) -> Result<HealthySet, ControlPlaneError> {
        self.state.healthy_instances(&self.target_group).await
    }

    async fn observe_sampled(&self) -> Result<Sampled, ControlPlaneError> {
        let healthy = self.healthy().await?;
        let probe = self.app.probe().await;
        Ok(Sampled { healthy, probe })
    }
}

/// One fault-phase observation: healthy targets plus one availability probe.
#[derive(Debug, Clone)]
struct Sampled {
    healthy: HealthySet,
    probe: ProbeOutcome,
}

impl Sampled {
    fn record(&self, window: &mut AvailabilityWindow) {
        window.record_from(self.probe.available, self.probe.host.as_deref());
    }
}

/// `[i-a, i-b]`
fn id_list(ids: &[InstanceId]) -> String {
    let ids: Vec<&str> = ids.iter().map(InstanceId::as_str).collect();
    format!("[{}]", ids.join(", "))
}

/// Append the availability figure and, below `threshold`, a warning.
/// A window with no checks adds nothing.
fn with_availability(
    mut report: ScenarioReport,
    window: &AvailabilityWindow,
    threshold: f64,
) -> ScenarioReport {
    if window.checks() == 0 {
        return report;
    }

    report = report.detail(format!("Availability during recovery: {}", window));
    let hosts: Vec<&str> = window.hosts().collect();
    if !hosts.is_empty() {
        report = report.detail(format!("Served by: {}", hosts.join(", ")));
    }
    if !window.meets(threshold) {
        report = report.warning("Some requests failed during recovery.");
    }
    report
}

#[cfg(test)]
mod test_support {
    use super::*;
    use crate::app::MockApplication;
    use crate::control_plane::MockControlPlane;

    pub(super) fn harness(plane: &MockControlPlane, app: &MockApplication) -> Harness {
        Harness::new(
            StateReader::new(Arc::new(plane.clone())),
            Arc::new(app.clone()),
            "arn:aws:elasticloadbalancing:tg/web",
            HarnessConfig::default(),
        )
    }
}
