//! Mock control plane for testing.
//!
//! Replays scripted observations and records actions for verification.
//! Each script is a queue; the last entry repeats once the queue drains, so
//! a scenario can poll indefinitely past the end of its script.

use super::{ControlPlane, ControlPlaneError, ScalingGroup, TargetHealth, TargetState};
use async_trait::async_trait;
use chaos_types::InstanceId;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Scripted control plane.
#[derive(Debug, Default, Clone)]
pub struct MockControlPlane {
    inner: Arc<Mutex<MockControlPlaneInner>>,
}

#[derive(Debug, Default)]
struct MockControlPlaneInner {
    health_script: VecDeque<Vec<TargetHealth>>,
    capacity_script: VecDeque<Option<u32>>,
    health_calls: usize,
    capacity_calls: usize,
    terminated: Vec<(InstanceId, bool)>,
    fail_next_describe: Option<String>,
    fail_next_terminate: Option<String>,
}

impl MockControlPlane {
    /// Create an empty mock: no targets, no scaling group.
    pub fn new() -> Self {
        Self::default()
    }

    fn inner(&self) -> MutexGuard<'_, MockControlPlaneInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue `times` observations in which exactly `ids` are healthy.
    pub fn push_healthy(&self, ids: &[&str], times: usize) -> &Self {
        let entries: Vec<TargetHealth> = ids
            .iter()
            .map(|id| TargetHealth::new(*id, TargetState::Healthy))
            .collect();
        self.push_targets(entries, times)
    }

    /// Queue `times` observations of an arbitrary target list.
    pub fn push_targets(&self, targets: Vec<TargetHealth>, times: usize) -> &Self {
        let mut inner = self.inner();
        for _ in 0..times {
            inner.health_script.push_back(targets.clone());
        }
        self
    }

    /// Queue `times` observations of the scaling group's desired capacity.
    /// `None` means the group does not exist.
    pub fn push_capacity(&self, capacity: Option<u32>, times: usize) -> &Self {
        let mut inner = self.inner();
        for _ in 0..times {
            inner.capacity_script.push_back(capacity);
        }
        self
    }

    /// Cause the next describe call (either kind) to fail.
    pub fn fail_next_describe(&self, error: &str) {
        self.inner().fail_next_describe = Some(error.to_string());
    }

    /// Cause the next terminate call to fail.
    pub fn fail_next_terminate(&self, error: &str) {
        self.inner().fail_next_terminate = Some(error.to_string());
    }

    /// Number of target-health queries served.
    pub fn health_calls(&self) -> usize {
        self.inner().health_calls
    }

    /// Number of scaling-group queries served.
    pub fn capacity_calls(&self) -> usize {
        self.inner().capacity_calls
    }

    /// Instances terminated so far, with their decrement flag.
    pub fn terminated(&self) -> Vec<(InstanceId, bool)> {
        self.inner().terminated.clone()
    }
}

fn next_scripted<T: Clone>(script: &mut VecDeque<T>) -> Option<T> {
    if script.len() > 1 {
        script.pop_front()
    } else {
        script.front().cloned()
    }
}

#[async_trait]
impl ControlPlane for MockControlPlane {
    async fn describe_target_health(
        &self,
        _target_group: &str,
    ) -> Result<Vec<TargetHealth>, ControlPlaneError> {
        let mut inner = self.inner();
        if let Some(message) = inner.fail_next_describe.take() {
            return Err(ControlPlaneError::Api {
                operation: "DescribeTargetHealth",
                message,
            });
        }
        inner.health_calls += 1;
        Ok(next_scripted(&mut inner.health_script).unwrap_or_default())
    }

    async fn describe_scaling_group(
        &self,
        _group_name: &str,
    ) -> Result<Option<ScalingGroup>, ControlPlaneError> {
        let mut inner = self.inner();
        if let Some(message) = inner.fail_next_describe.take() {
            return Err(ControlPlaneError::Api {
                operation: "DescribeAutoScalingGroups",
                message,
            });
        }
        inner.capacity_calls += 1;
        Ok(next_scripted(&mut inner.capacity_script)
            .flatten()
            .map(|desired_capacity| ScalingGroup { desired_capacity }))
    }

    async fn terminate_instance(
        &self,
        instance: &InstanceId,
        decrement_desired_capacity: bool,
    ) -> Result<(), ControlPlaneError> {
        let mut inner = self.inner();
        if let Some(message) = inner.fail_next_terminate.take() {
            return Err(ControlPlaneError::Api {
                operation: "TerminateInstanceInAutoScalingGroup",
                message,
            });
        }
        inner
            .terminated
            .push((instance.clone(), decrement_desired_capacity));
        Ok(())
    }
}
