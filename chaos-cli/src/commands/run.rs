//! Run scenarios and print the summary.

use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use chaos_core::app::HttpApplication;
use chaos_core::control_plane::AwsControlPlane;
use chaos_core::scenarios::Harness;
use chaos_core::state::StateReader;
use chaos_core::HarnessConfig;
use chaos_types::{ScenarioOutcome, ScenarioReport};
use tracing::{error, info, warn};

use crate::target::Targets;

/// A runnable scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scenario {
    AppFault,
    InfraFault,
    Scaling,
}

impl Scenario {
    /// Every scenario, fault scenarios first.
    pub const ALL: [Scenario; 3] = [Scenario::AppFault, Scenario::InfraFault, Scenario::Scaling];

    pub fn name(self) -> &'static str {
        match self {
            Scenario::AppFault => "app-fault",
            Scenario::InfraFault => "infra-fault",
            Scenario::Scaling => "scaling",
        }
    }
}

/// How one scenario ended, including aborted runs.
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub scenario: Scenario,
    /// `Err` holds the error that aborted the scenario.
    pub outcome: std::result::Result<ScenarioOutcome<ScenarioReport>, String>,
}

impl Verdict {
    pub fn label(&self) -> &'static str {
        match &self.outcome {
            Ok(outcome) => outcome.label(),
            Err(_) => "ERROR",
        }
    }

    /// Failed or errored. Skips do not count.
    pub fn is_failure(&self) -> bool {
        match &self.outcome {
            Ok(outcome) => outcome.is_failed(),
            Err(_) => true,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<5} {}: ", self.label(), self.scenario.name())?;
        match &self.outcome {
            Ok(ScenarioOutcome::Passed(report)) => write!(f, "{}", report),
            Ok(ScenarioOutcome::Failed { reason }) | Ok(ScenarioOutcome::Skipped { reason }) => {
                f.write_str(reason)
            }
            Err(message) => f.write_str(message),
        }
    }
}

/// Run `selection` one at a time against the configured stack.
///
/// Returns true when nothing failed or errored.
pub async fn run(
    targets: &Targets,
    config: HarnessConfig,
    region: Option<String>,
    selection: &[Scenario],
) -> Result<bool> {
    let verdicts = match targets.required() {
        Ok((alb_url, tg_arn)) => {
            info!(alb = alb_url, target_group = tg_arn, "target stack");
            let plane = AwsControlPlane::from_env(region, &config.aws.region).await;
            let app = HttpApplication::new(alb_url, &config);
            let mut harness = Harness::new(
                StateReader::new(Arc::new(plane)),
                Arc::new(app),
                tg_arn,
                config,
            );
            if let Some(asg) = &targets.asg_name {
                harness = harness.with_scaling_group(asg.as_str());
            }
            run_scenarios(&harness, selection).await
        }
        Err(reason) => {
            warn!(%reason, "skipping all scenarios");
            skip_all(selection, &reason)
        }
    };

    println!();
    print!("{}", summary(&verdicts));
    Ok(!verdicts.iter().any(Verdict::is_failure))
}

/// Run each scenario in order and record its verdict.
pub async fn run_scenarios(harness: &Harness, selection: &[Scenario]) -> Vec<Verdict> {
    let mut verdicts = Vec::with_capacity(selection.len());

    for &scenario in selection {
        let outcome = match scenario {
            Scenario::AppFault => harness
                .app_fault()
                .await
                .map(|o| o.map(|r| ScenarioReport::from(&r))),
            Scenario::InfraFault => harness
                .infra_fault()
                .await
                .map(|o| o.map(|r| ScenarioReport::from(&r))),
            Scenario::Scaling => harness
                .scaling()
                .await
                .map(|o| o.map(|r| ScenarioReport::from(&r))),
        };

        let verdict = Verdict {
            scenario,
            outcome: outcome.map_err(|e| e.to_string()),
        };
        match &verdict.outcome {
            Ok(outcome) => info!(scenario = scenario.name(), verdict = outcome.label(), "scenario finished"),
            Err(e) => error!(scenario = scenario.name(), error = %e, "scenario aborted"),
        }
        verdicts.push(verdict);
    }

    verdicts
}

/// Skip every scenario in `selection` for the same reason.
pub fn skip_all(selection: &[Scenario], reason: &str) -> Vec<Verdict> {
    selection
        .iter()
        .map(|&scenario| Verdict {
            scenario,
            outcome: Ok(ScenarioOutcome::skipped(reason)),
        })
        .collect()
}

/// One line (plus report details) per verdict, then a totals line.
pub fn summary(verdicts: &[Verdict]) -> String {
    let mut out = String::from("=== infra-chaos summary ===\n");
    for verdict in verdicts {
        out.push_str(&verdict.to_string());
        out.push('\n');
    }

    let count = |label: &str| verdicts.iter().filter(|v| v.label() == label).count();
    out.push_str(&format!(
        "{} passed, {} failed, {} skipped, {} errors\n",
        count("PASS"),
        count("FAIL"),
        count("SKIP"),
        count("ERROR")
    ));
    out
}
