//! Show the current state of the stack without injecting anything.

use std::fmt::Write as _;
use std::sync::Arc;

use anyhow::{Context, Result};
use chaos_core::control_plane::AwsControlPlane;
use chaos_core::probe::AvailabilitySampler;
use chaos_core::state::StateReader;
use chaos_core::HarnessConfig;

use crate::target::Targets;

/// Run the status command.
pub async fn run(targets: &Targets, config: &HarnessConfig, region: Option<String>) -> Result<()> {
    let tg_arn = targets
        .tg_arn
        .as_deref()
        .context("Target group ARN is not configured (--tg-arn, TG_ARN or infra_config.json)")?;

    let plane = AwsControlPlane::from_env(region, &config.aws.region).await;
    let reader = StateReader::new(Arc::new(plane));
    let sampler = AvailabilitySampler::new(config.probe.timeout());

    let text = render(&reader, &sampler, targets, tg_arn).await?;
    print!("{}", text);
    Ok(())
}

async fn render(
    reader: &StateReader,
    sampler: &AvailabilitySampler,
    targets: &Targets,
    tg_arn: &str,
) -> Result<String> {
    let mut out = String::from("=== infra-chaos status ===\n\n");

    let healthy = reader
        .healthy_instances(tg_arn)
        .await
        .context("Failed to describe target health")?;
    writeln!(out, "Target group:")?;
    writeln!(out, "  ARN:     {}", tg_arn)?;
    writeln!(out, "  Healthy: {} {}", healthy.len(), healthy)?;

    writeln!(out)?;
    match targets.asg_name.as_deref() {
        Some(asg) => {
            let capacity = reader
                .desired_capacity(asg)
                .await
                .context("Failed to describe scaling group")?;
            writeln!(out, "Scaling group:")?;
            writeln!(out, "  Name:             {}", asg)?;
            writeln!(out, "  Desired capacity: {}", capacity)?;
        }
        None => writeln!(out, "Scaling group: NOT CONFIGURED")?,
    }

    writeln!(out)?;
    match targets.alb_url.as_deref() {
        Some(url) => {
            let probe = sampler.probe(&format!("{}/", url)).await;
            let state = if probe.available { "available" } else { "unavailable" };
            writeln!(out, "Load balancer:")?;
            writeln!(out, "  URL:    {}", url)?;
            match (probe.status, probe.host) {
                (Some(status), Some(host)) => {
                    writeln!(out, "  Probe:  {} (HTTP {}, served by {})", state, status, host)?
                }
                (Some(status), None) => writeln!(out, "  Probe:  {} (HTTP {})", state, status)?,
                (None, _) => writeln!(out, "  Probe:  {} (no response)", state)?,
            }
        }
        None => writeln!(out, "Load balancer: NOT CONFIGURED")?,
    }

    Ok(out)
}
