//! AWS control plane: ELBv2 target health and Auto Scaling groups.

use async_trait::async_trait;
use aws_config::meta::region::RegionProviderChain;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_autoscaling as autoscaling;
use aws_sdk_elasticloadbalancingv2 as elbv2;
use autoscaling::operation::describe_auto_scaling_groups::DescribeAutoScalingGroupsOutput;
use elbv2::error::DisplayErrorContext;
use elbv2::operation::describe_target_health::DescribeTargetHealthOutput;
use elbv2::types::TargetHealthStateEnum;
use tracing::debug;

use super::{ControlPlane, ControlPlaneError, ScalingGroup, TargetHealth, TargetState};
use chaos_types::InstanceId;

/// Control plane backed by the AWS SDK.
#[derive(Debug, Clone)]
pub struct AwsControlPlane {
    elbv2: elbv2::Client,
    autoscaling: autoscaling::Client,
}

impl AwsControlPlane {
    /// Build clients from an already-loaded SDK configuration.
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            elbv2: elbv2::Client::new(config),
            autoscaling: autoscaling::Client::new(config),
        }
    }

    /// Load credentials and region from the environment.
    ///
    /// Region resolution: `region` if given, then the SDK default chain
    /// (`AWS_REGION`, profile), then `fallback_region`.
    pub async fn from_env(region: Option<String>, fallback_region: &str) -> Self {
        let region = RegionProviderChain::first_try(region.map(Region::new))
            .or_default_provider()
            .or_else(Region::new(fallback_region.to_string()));

        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(region)
            .load()
            .await;

        debug!(region = ?config.region(), "aws control plane configured");
        Self::new(&config)
    }
}

#[async_trait]
impl ControlPlane for AwsControlPlane {
    async fn describe_target_health(
        &self,
        target_group: &str,
    ) -> Result<Vec<TargetHealth>, ControlPlaneError> {
        let output = self
            .elbv2
            .describe_target_health()
            .target_group_arn(target_group)
            .send()
            .await
            .map_err(|e| api_error("DescribeTargetHealth", e))?;

        target_healths(&output)
    }

    async fn describe_scaling_group(
        &self,
        group_name: &str,
    ) -> Result<Option<ScalingGroup>, ControlPlaneError> {
        let output = self
            .autoscaling
            .describe_auto_scaling_groups()
            .auto_scaling_group_names(group_name)
            .send()
            .await
            .map_err(|e| api_error("DescribeAutoScalingGroups", e))?;

        scaling_group(&output, group_name)
    }

    async fn terminate_instance(
        &self,
        instance: &InstanceId,
        decrement_desired_capacity: bool,
    ) -> Result<(), ControlPlaneError> {
        self.autoscaling
            .terminate_instance_in_auto_scaling_group()
            .instance_id(instance.as_str())
            .should_decrement_desired_capacity(decrement_desired_capacity)
            .send()
            .await
            .map_err(|e| api_error("TerminateInstanceInAutoScalingGroup", e))?;
        Ok(())
    }
}

fn api_error<E>(operation: &'static str, err: E) -> ControlPlaneError
where
    E: std::error::Error + 'static,
{
    ControlPlaneError::Api {
        operation,
        message: DisplayErrorContext(&err).to_string(),
    }
}

fn target_healths(
    output: &DescribeTargetHealthOutput,
) -> Result<Vec<TargetHealth>, ControlPlaneError> {
    let mut targets = Vec::new();
    for description in output.target_health_descriptions() {
        let Some(target) = description.target() else {
            continue;
        };
        let id = target.id().ok_or_else(|| ControlPlaneError::Malformed {
            operation: "DescribeTargetHealth",
            detail: "target without id".into(),
        })?;

        let state = description
            .target_health()
            .and_then(|h| h.state())
            .map(target_state)
            .unwrap_or(TargetState::Other);

        targets.push(TargetHealth::new(id, state));
    }
    Ok(targets)
}

/// Negative capacities clamp to zero.
fn scaling_group(
    output: &DescribeAutoScalingGroupsOutput,
    group_name: &str,
) -> Result<Option<ScalingGroup>, ControlPlaneError> {
    let Some(group) = output.auto_scaling_groups().first() else {
        return Ok(None);
    };

    let desired = group
        .desired_capacity()
        .ok_or_else(|| ControlPlaneError::Malformed {
            operation: "DescribeAutoScalingGroups",
            detail: format!("group {} has no desired capacity", group_name),
        })?;

    Ok(Some(ScalingGroup {
        desired_capacity: u32::try_from(desired).unwrap_or(0),
    }))
}

fn target_state(state: &TargetHealthStateEnum) -> TargetState {
    match state {
        TargetHealthStateEnum::Healthy => TargetState::Healthy,
        TargetHealthStateEnum::Unhealthy => TargetState::Unhealthy,
        TargetHealthStateEnum::Initial => TargetState::Initial,
        TargetHealthStateEnum::Draining => TargetState::Draining,
        TargetHealthStateEnum::Unused => TargetState::Unused,
        _ => TargetState::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autoscaling::types::AutoScalingGroup;
    use elbv2::types::{TargetDescription, TargetHealthDescription};

    fn described(id: Option<&str>, state: Option<TargetHealthStateEnum>) -> TargetHealthDescription {
        let mut target = TargetDescription::builder().port(80);
        if let Some(id) = id {
            target = target.id(id);
        }
        let mut health = elbv2::types::TargetHealth::builder();
        if let Some(state) = state {
            health = health.state(state);
        }
        TargetHealthDescription::builder()
            .target(target.build())
            .target_health(health.build())
            .build()
    }

    fn groups(desired: Option<i32>) -> DescribeAutoScalingGroupsOutput {
        let mut group = AutoScalingGroup::builder().auto_scaling_group_name("web-asg");
        if let Some(desired) = desired {
            group = group.desired_capacity(desired);
        }
        DescribeAutoScalingGroupsOutput::builder()
            .auto_scaling_groups(group.build())
            .build()
    }

    #[test]
    fn converts_target_health_descriptions() {
        let output = DescribeTargetHealthOutput::builder()
            .target_health_descriptions(described(Some("i-a"), Some(TargetHealthStateEnum::Healthy)))
            .target_health_descriptions(described(Some("i-b"), Some(TargetHealthStateEnum::Draining)))
            .target_health_descriptions(described(Some("i-c"), None))
            .target_health_descriptions(TargetHealthDescription::builder().build())
            .build();

        let targets = target_healths(&output).unwrap();
        assert_eq!(
            targets,
            vec![
                TargetHealth::new("i-a", TargetState::Healthy),
                TargetHealth::new("i-b", TargetState::Draining),
                TargetHealth::new("i-c", TargetState::Other),
            ]
        );
    }

    #[test]
    fn target_without_id_is_malformed() {
        let output = DescribeTargetHealthOutput::builder()
            .target_health_descriptions(described(None, Some(TargetHealthStateEnum::Healthy)))
            .build();

        let err = target_healths(&output).unwrap_err();
        assert!(matches!(
            err,
            ControlPlaneError::Malformed {
                operation: "DescribeTargetHealth",
                ..
            }
        ));
    }

    #[test]
    fn converts_scaling_group() {
        let group = scaling_group(&groups(Some(3)), "web-asg").unwrap();
        assert_eq!(group, Some(ScalingGroup { desired_capacity: 3 }));
    }

    #[test]
    fn negative_capacity_clamps_to_zero() {
        let group = scaling_group(&groups(Some(-2)), "web-asg").unwrap();
        assert_eq!(group, Some(ScalingGroup { desired_capacity: 0 }));
    }

    #[test]
    fn missing_group_and_missing_capacity() {
        let empty = DescribeAutoScalingGroupsOutput::builder().build();
        assert_eq!(scaling_group(&empty, "web-asg").unwrap(), None);

        let err = scaling_group(&groups(None), "web-asg").unwrap_err();
        assert!(err.to_string().contains("web-asg"));
    }

    #[test]
    fn maps_target_states() {
        assert_eq!(target_state(&TargetHealthStateEnum::Healthy), TargetState::Healthy);
        assert_eq!(
            target_state(&TargetHealthStateEnum::Unhealthy),
            TargetState::Unhealthy
        );
        assert_eq!(target_state(&TargetHealthStateEnum::Initial), TargetState::Initial);
        assert_eq!(
            target_state(&TargetHealthStateEnum::Draining),
            TargetState::Draining
        );
        assert_eq!(
            target_state(&TargetHealthStateEnum::Unavailable),
            TargetState::Other
        );
    }
}
