//! State reader: the two observations every scenario polls.
//!
//! Both reads are idempotent and never cached. Control-plane failures are
//! returned as errors, not retried.

use std::sync::Arc;

use chaos_types::HealthySet;

use crate::control_plane::{ControlPlane, ControlPlaneError, TargetState};

/// Reads healthy targets and desired capacity from a control plane.
#[derive(Clone)]
pub struct StateReader {
    plane: Arc<dyn ControlPlane>,
}

impl std::fmt::Debug for StateReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateReader").finish_non_exhaustive()
    }
}

impl StateReader {
    /// Wrap a control plane.
    pub fn new(plane: Arc<dyn ControlPlane>) -> Self {
        Self { plane }
    }

    /// The underlying control plane (for actions such as termination).
    pub fn control_plane(&self) -> &Arc<dyn ControlPlane> {
        &self.plane
    }

    /// Instances in `target_group` whose health state is healthy.
    ///
    /// Empty when nothing is registered or nothing is healthy.
    pub async fn healthy_instances(
        &self,
        target_group: &str,
    ) -> Result<HealthySet, ControlPlaneError> {
        let targets = self.plane.describe_target_health(target_group).await?;
        Ok(targets
            .into_iter()
            .filter(|t| t.state == TargetState::Healthy)
            .map(|t| t.instance)
            .collect())
    }

    /// Desired capacity of `group_name`, or 0 if the group does not exist.
    pub async fn desired_capacity(&self, group_name: &str) -> Result<u32, ControlPlaneError> {
        let group = self.plane.describe_scaling_group(group_name).await?;
        Ok(group.map_or(0, |g| g.desired_capacity))
    }
}
