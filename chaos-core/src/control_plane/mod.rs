//! Control-plane abstraction.
//!
//! The harness only ever needs three calls from the cloud provider:
//! - describe target health for a target group
//! - describe a scaling group (for its desired capacity)
//! - terminate one instance inside a scaling group
//!
//! [`AwsControlPlane`] talks to ELBv2 and Auto Scaling. [`MockControlPlane`]
//! replays scripted observations for tests.

mod aws;
mod mock;

pub use aws::AwsControlPlane;
pub use mock::MockControlPlane;

use async_trait::async_trait;
use chaos_types::InstanceId;
use thiserror::Error;

/// Control-plane errors. Never retried by the harness.
#[derive(Debug, Error)]
pub enum ControlPlaneError {
    /// The provider rejected or failed the call (authorization, unknown
    /// identifier, service error).
    #[error("{operation} failed: {message}")]
    Api {
        /// API operation name.
        operation: &'static str,
        /// Provider error, with its context chain.
        message: String,
    },

    /// The provider response was missing a field the harness needs.
    #[error("{operation} returned an incomplete response: {detail}")]
    Malformed {
        /// API operation name.
        operation: &'static str,
        /// What was missing.
        detail: String,
    },
}

/// Health state of one registered target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetState {
    /// Passing health checks.
    Healthy,
    /// Failing health checks.
    Unhealthy,
    /// Registered, first checks not yet complete.
    Initial,
    /// Deregistration in progress.
    Draining,
    /// Registered to a group with no traffic, or otherwise not checked.
    Unused,
    /// Any state the harness does not distinguish.
    Other,
}

/// One entry of a target-health description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetHealth {
    /// Registered instance.
    pub instance: InstanceId,
    /// Its current health state.
    pub state: TargetState,
}

impl TargetHealth {
    /// Convenience constructor.
    pub fn new(instance: impl Into<InstanceId>, state: TargetState) -> Self {
        Self {
            instance: instance.into(),
            state,
        }
    }
}

/// The subset of a scaling group description the harness reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScalingGroup {
    /// Target instance count. Negative values from the provider are
    /// clamped to zero.
    pub desired_capacity: u32,
}

/// Control-plane query and action surface.
#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// List every target registered to `target_group` with its health state.
    async fn describe_target_health(
        &self,
        target_group: &str,
    ) -> Result<Vec<TargetHealth>, ControlPlaneError>;

    /// Describe the scaling group named `group_name`, or `None` if no such
    /// group exists.
    async fn describe_scaling_group(
        &self,
        group_name: &str,
    ) -> Result<Option<ScalingGroup>, ControlPlaneError>;

    /// Terminate `instance` through its scaling group.
    ///
    /// With `decrement_desired_capacity = false` the group replaces it.
    async fn terminate_instance(
        &self,
        instance: &InstanceId,
        decrement_desired_capacity: bool,
    ) -> Result<(), ControlPlaneError>;
}
