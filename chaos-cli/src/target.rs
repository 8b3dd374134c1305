//! Resolution of the stack under test.
//!
//! Each value is taken from the first source that has it:
//! command-line flag, then environment variable, then the infra outputs
//! file (Terraform `output -json` shape, `{"key": {"value": ...}}`).
//! Empty strings count as unset.

use std::path::Path;

use serde_json::{Map, Value};
use tracing::debug;

/// Default infra outputs file, relative to the working directory.
pub const DEFAULT_INFRA_CONFIG: &str = "infra_config.json";

/// Values given on the command line.
#[derive(Debug, Clone, Default)]
pub struct TargetFlags {
    /// `--alb-url`, as typed.
    pub alb_url: Option<String>,
    /// `--asg-name`.
    pub asg_name: Option<String>,
    /// `--tg-arn`.
    pub tg_arn: Option<String>,
}

/// The stack under test. Any value may be unconfigured.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Targets {
    /// Load balancer base URL, normalized.
    pub alb_url: Option<String>,
    /// Scaling group name.
    pub asg_name: Option<String>,
    /// Target group ARN.
    pub tg_arn: Option<String>,
}

impl Targets {
    /// Resolve every value from flags, then `env`, then `infra_config`.
    pub fn resolve(
        flags: &TargetFlags,
        env: impl Fn(&str) -> Option<String>,
        infra_config: &Path,
    ) -> Self {
        let outputs = InfraOutputs::load(infra_config);
        let pick = |flag: &Option<String>, var: &str, key: &str| {
            non_empty(flag.clone())
                .or_else(|| non_empty(env(var)))
                .or_else(|| outputs.get(key))
        };

        Self {
            alb_url: pick(&flags.alb_url, "ALB_URL", "alb_dns_name").map(|u| normalize_url(&u)),
            asg_name: pick(&flags.asg_name, "ASG_NAME", "asg_name"),
            tg_arn: pick(&flags.tg_arn, "TG_ARN", "target_group_arn"),
        }
    }

    /// The load balancer URL and target group ARN, which every scenario
    /// needs, or a reason naming what is missing.
    pub fn required(&self) -> Result<(&str, &str), String> {
        match (self.alb_url.as_deref(), self.tg_arn.as_deref()) {
            (Some(alb), Some(tg)) => Ok((alb, tg)),
            (None, Some(_)) => Err("ALB URL is not configured.".into()),
            (Some(_), None) => Err("Target group ARN is not configured.".into()),
            (None, None) => Err("ALB URL and target group ARN are not configured.".into()),
        }
    }
}

/// Prefix `http://` when no scheme is given and drop trailing slashes.
pub fn normalize_url(url: &str) -> String {
    let url = if url.starts_with("http") {
        url.to_string()
    } else {
        format!("http://{}", url)
    };
    url.trim_end_matches('/').to_string()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Parsed infra outputs file. Missing or unreadable files are empty.
#[derive(Debug, Default)]
struct InfraOutputs(Map<String, Value>);

impl InfraOutputs {
    fn load(path: &Path) -> Self {
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "no infra outputs file");
                return Self::default();
            }
        };

        match serde_json::from_str::<Value>(&contents) {
            Ok(Value::Object(map)) => Self(map),
            Ok(_) => {
                debug!(path = %path.display(), "infra outputs file is not an object");
                Self::default()
            }
            Err(e) => {
                debug!(path = %path.display(), error = %e, "malformed infra outputs file");
                Self::default()
            }
        }
    }

    fn get(&self, key: &str) -> Option<String> {
        let value = self.0.get(key)?.get("value")?.as_str()?;
        non_empty(Some(value.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn env_of(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    const OUTPUTS: &str = r#"{
        "alb_dns_name": {"value": "web-alb-123.ap-northeast-2.elb.amazonaws.com", "type": "string"},
        "asg_name": {"value": "web-asg"},
        "target_group_arn": {"value": "arn:aws:elasticloadbalancing:tg/web/abc"}
    }"#;

    #[test]
    fn normalizes_urls() {
        assert_eq!(normalize_url("alb.example.com"), "http://alb.example.com");
        assert_eq!(normalize_url("alb.example.com/"), "http://alb.example.com");
        assert_eq!(normalize_url("https://alb.example.com//"), "https://alb.example.com");
        assert_eq!(normalize_url("http://alb.example.com"), "http://alb.example.com");
    }

    #[test]
    fn reads_infra_outputs_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("infra_config.json");
        std::fs::write(&path, OUTPUTS).unwrap();

        let targets = Targets::resolve(&TargetFlags::default(), env_of(&[]), &path);

        assert_eq!(
            targets,
            Targets {
                alb_url: Some("http://web-alb-123.ap-northeast-2.elb.amazonaws.com".into()),
                asg_name: Some("web-asg".into()),
                tg_arn: Some("arn:aws:elasticloadbalancing:tg/web/abc".into()),
            }
        );
    }

    #[test]
    fn flag_beats_env_beats_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("infra_config.json");
        std::fs::write(&path, OUTPUTS).unwrap();

        let flags = TargetFlags {
            alb_url: Some("https://flag.example.com/".into()),
            ..Default::default()
        };
        let env = env_of(&[("ALB_URL", "env.example.com"), ("ASG_NAME", "env-asg")]);

        let targets = Targets::resolve(&flags, env, &path);
        assert_eq!(targets.alb_url.as_deref(), Some("https://flag.example.com"));
        assert_eq!(targets.asg_name.as_deref(), Some("env-asg"));
        assert_eq!(
            targets.tg_arn.as_deref(),
            Some("arn:aws:elasticloadbalancing:tg/web/abc")
        );
    }

    #[test]
    fn empty_values_fall_through() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("infra_config.json");
        std::fs::write(&path, r#"{"asg_name": {"value": ""}}"#).unwrap();

        let flags = TargetFlags {
            asg_name: Some(String::new()),
            ..Default::default()
        };
        let targets = Targets::resolve(&flags, env_of(&[("ASG_NAME", "")]), &path);
        assert_eq!(targets.asg_name, None);
    }

    #[test]
    fn missing_or_malformed_file_is_unconfigured() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope.json");
        assert_eq!(
            Targets::resolve(&TargetFlags::default(), env_of(&[]), &missing),
            Targets::default()
        );

        let malformed = dir.path().join("bad.json");
        std::fs::write(&malformed, "{ not json").unwrap();
        assert_eq!(
            Targets::resolve(&TargetFlags::default(), env_of(&[]), &malformed),
            Targets::default()
        );

        let wrong_shape = dir.path().join("flat.json");
        std::fs::write(&wrong_shape, r#"{"asg_name": "web-asg"}"#).unwrap();
        assert_eq!(
            Targets::resolve(&TargetFlags::default(), env_of(&[]), &wrong_shape).asg_name,
            None
        );
    }

    #[test]
    fn required_names_what_is_missing() {
        let mut targets = Targets::default();
        assert_eq!(
            targets.required().unwrap_err(),
            "ALB URL and target group ARN are not configured."
        );

        targets.tg_arn = Some("arn".into());
        assert_eq!(targets.required().unwrap_err(), "ALB URL is not configured.");

        targets.alb_url = Some("http://alb".into());
        assert_eq!(targets.required().unwrap(), ("http://alb", "arn"));
    }
}
