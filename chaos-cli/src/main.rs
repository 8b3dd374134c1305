//! # infra-chaos
//!
//! Resilience scenarios against a deployed load balancer, target group and
//! scaling group.
//!
//! ## Commands
//!
//! - `app-fault`: make the application fail (`/kill`) and wait for replacement
//! - `infra-fault`: terminate an instance and wait for self-healing
//! - `scaling`: drive load until scale-out, stop it, wait for scale-in
//! - `all`: the three above, one at a time
//! - `status`: print healthy targets and desired capacity
//!
//! ## Example
//!
//! ```bash
//! # Targets from terraform outputs
//! terraform output -json > infra_config.json
//! infra-chaos all
//!
//! # Or explicitly
//! infra-chaos --alb-url web-alb.example.com --tg-arn arn:... --asg-name web-asg scaling
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use chaos_core::HarnessConfig;
use clap::{Parser, Subcommand};
use tracing::Instrument;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

mod commands;
mod target;

use commands::run::Scenario;
use commands::{run, status};
use target::{TargetFlags, Targets, DEFAULT_INFRA_CONFIG};

/// Resilience scenarios for an ALB + target group + ASG stack.
#[derive(Parser, Debug)]
#[command(name = "infra-chaos")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Load balancer URL or DNS name (else ALB_URL, else infra config)
    #[arg(long, global = true)]
    alb_url: Option<String>,

    /// Auto Scaling group name (else ASG_NAME, else infra config)
    #[arg(long, global = true)]
    asg_name: Option<String>,

    /// Target group ARN (else TG_ARN, else infra config)
    #[arg(long, global = true)]
    tg_arn: Option<String>,

    /// Terraform outputs JSON with alb_dns_name, asg_name, target_group_arn
    #[arg(long, global = true, default_value = DEFAULT_INFRA_CONFIG)]
    infra_config: PathBuf,

    /// AWS region (else the SDK default chain, else the harness config)
    #[arg(long, global = true)]
    region: Option<String>,

    /// Harness tuning file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Application fault recovery via /kill
    AppFault,

    /// Infrastructure fault recovery via instance termination
    InfraFault,

    /// Scale-out under load, then scale-in
    Scaling,

    /// Run every scenario, fault scenarios first
    All,

    /// Show healthy targets and desired capacity
    Status,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match &cli.config {
        Some(path) => HarnessConfig::from_file(path)
            .with_context(|| format!("Failed to load harness config {}", path.display()))?,
        None => HarnessConfig::default(),
    };

    let flags = TargetFlags {
        alb_url: cli.alb_url,
        asg_name: cli.asg_name,
        tg_arn: cli.tg_arn,
    };
    let targets = Targets::resolve(&flags, |key| std::env::var(key).ok(), &cli.infra_config);

    let selection: &[Scenario] = match cli.command {
        Commands::Status => {
            status::run(&targets, &config, cli.region).await?;
            return Ok(ExitCode::SUCCESS);
        }
        Commands::AppFault => &[Scenario::AppFault],
        Commands::InfraFault => &[Scenario::InfraFault],
        Commands::Scaling => &[Scenario::Scaling],
        Commands::All => &Scenario::ALL,
    };

    let span = tracing::info_span!("run", id = %Uuid::new_v4());
    let passed = run::run(&targets, config, cli.region, selection)
        .instrument(span)
        .await?;

    Ok(if passed {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// `RUST_LOG` wins; otherwise `info`, or debug for the harness with `-v`.
fn init_tracing(verbose: bool) {
    let default = if verbose {
        "info,infra_chaos=debug,infra_chaos_core=debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "infra-chaos",
            "scaling",
            "--asg-name",
            "web-asg",
            "-v",
        ])
        .unwrap();

        assert!(matches!(cli.command, Commands::Scaling));
        assert_eq!(cli.asg_name.as_deref(), Some("web-asg"));
        assert!(cli.verbose);
        assert_eq!(cli.infra_config, PathBuf::from(DEFAULT_INFRA_CONFIG));
    }

    #[test]
    fn subcommand_names() {
        for name in ["app-fault", "infra-fault", "scaling", "all", "status"] {
            assert!(Cli::try_parse_from(["infra-chaos", name]).is_ok(), "{}", name);
        }
    }
}
