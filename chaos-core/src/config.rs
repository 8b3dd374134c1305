//! Harness tuning configuration.
//!
//! Every timeout, interval and threshold the scenarios use lives here.
//! Optionally loaded from a TOML file (`--config harness.toml`); missing
//! sections and fields fall back to their defaults.

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration for a harness run.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HarnessConfig {
    /// Cloud client configuration.
    #[serde(default)]
    pub aws: AwsConfig,
    /// Availability probe configuration.
    #[serde(default)]
    pub probe: ProbeConfig,
    /// Pre-test stabilization gate.
    #[serde(default)]
    pub stabilize: StabilizeConfig,
    /// Fault scenarios (application kill, instance termination).
    #[serde(default)]
    pub fault: FaultConfig,
    /// Scaling lifecycle scenario.
    #[serde(default)]
    pub scaling: ScalingConfig,
}

/// Cloud client configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AwsConfig {
    /// Region used when neither the CLI nor the environment names one
    /// (default: ap-northeast-2).
    #[serde(default = "default_region")]
    pub region: String,
}

/// Availability probe configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ProbeConfig {
    /// Probe request timeout in seconds (default: 2).
    #[serde(default = "default_probe_timeout")]
    pub timeout_secs: u64,
}

/// Stabilization gate configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StabilizeConfig {
    /// Minimum healthy targets before a fault scenario may start (default: 2).
    #[serde(default = "default_min_healthy")]
    pub min_healthy: usize,
    /// How long to wait for the minimum in seconds (default: 300).
    #[serde(default = "default_stabilize_deadline")]
    pub deadline_secs: u64,
    /// Poll interval in seconds (default: 10).
    #[serde(default = "default_poll_long")]
    pub interval_secs: u64,
}

/// Fault scenario configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct FaultConfig {
    /// Timeout for the `/kill` request in seconds (default: 1).
    #[serde(default = "default_kill_timeout")]
    pub kill_timeout_secs: u64,
    /// Deadline for the load balancer to notice the fault (default: 180).
    #[serde(default = "default_detect_deadline")]
    pub detect_deadline_secs: u64,
    /// Deadline for the healthy count to come back (default: 600).
    #[serde(default = "default_recovery_deadline")]
    pub recovery_deadline_secs: u64,
    /// Interval while watching for state changes (default: 5).
    #[serde(default = "default_poll_short")]
    pub poll_short_secs: u64,
    /// Interval while waiting on slow recovery (default: 10).
    #[serde(default = "default_poll_long")]
    pub poll_long_secs: u64,
    /// Availability below this percentage is reported as a warning (default: 95).
    #[serde(default = "default_availability_threshold")]
    pub availability_threshold_percent: f64,
}

/// Scaling scenario configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ScalingConfig {
    /// Concurrent load workers (default: 6).
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Synthetic work duration passed as `/work?sec=N` (default: 60).
    #[serde(default = "default_work_seconds")]
    pub work_seconds: u64,
    /// Timeout for each `/work` request in seconds (default: 8).
    #[serde(default = "default_work_timeout")]
    pub work_timeout_secs: u64,
    /// Deadline for each scale-out phase in seconds (default: 600).
    #[serde(default = "default_scale_out_deadline")]
    pub scale_out_deadline_secs: u64,
    /// Deadline for each scale-in phase in seconds (default: 1500).
    #[serde(default = "default_scale_in_deadline")]
    pub scale_in_deadline_secs: u64,
    /// Poll interval during scale-out in seconds (default: 15).
    #[serde(default = "default_scale_out_interval")]
    pub scale_out_interval_secs: u64,
    /// Poll interval during scale-in in seconds (default: 30).
    #[serde(default = "default_scale_in_interval")]
    pub scale_in_interval_secs: u64,
}

// Default value functions
fn default_region() -> String {
    "ap-northeast-2".to_string()
}

fn default_probe_timeout() -> u64 {
    2
}

fn default_min_healthy() -> usize {
    2
}

fn default_stabilize_deadline() -> u64 {
    300 // 5 min
}

fn default_kill_timeout() -> u64 {
    1
}

fn default_detect_deadline() -> u64 {
    180 // 3 min
}

fn default_recovery_deadline() -> u64 {
    600 // 10 min
}

fn default_poll_short() -> u64 {
    5
}

fn default_poll_long() -> u64 {
    10
}

fn default_availability_threshold() -> f64 {
    95.0
}

fn default_workers() -> usize {
    6
}

fn default_work_seconds() -> u64 {
    60
}

fn default_work_timeout() -> u64 {
    8
}

fn default_scale_out_deadline() -> u64 {
    600 // 10 min
}

fn default_scale_in_deadline() -> u64 {
    1500 // 25 min
}

fn default_scale_out_interval() -> u64 {
    15
}

fn default_scale_in_interval() -> u64 {
    30
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            region: default_region(),
        }
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_probe_timeout(),
        }
    }
}

impl Default for StabilizeConfig {
    fn default() -> Self {
        Self {
            min_healthy: default_min_healthy(),
            deadline_secs: default_stabilize_deadline(),
            interval_secs: default_poll_long(),
        }
    }
}

impl Default for FaultConfig {
    fn default() -> Self {
        Self {
            kill_timeout_secs: default_kill_timeout(),
            detect_deadline_secs: default_detect_deadline(),
            recovery_deadline_secs: default_recovery_deadline(),
            poll_short_secs: default_poll_short(),
            poll_long_secs: default_poll_long(),
            availability_threshold_percent: default_availability_threshold(),
        }
    }
}

impl Default for ScalingConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            work_seconds: default_work_seconds(),
            work_timeout_secs: default_work_timeout(),
            scale_out_deadline_secs: default_scale_out_deadline(),
            scale_in_deadline_secs: default_scale_in_deadline(),
            scale_out_interval_secs: default_scale_out_interval(),
            scale_in_interval_secs: default_scale_in_interval(),
        }
    }
}

impl ProbeConfig {
    /// Probe timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl StabilizeConfig {
    /// Gate deadline.
    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.deadline_secs)
    }

    /// Gate poll interval.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl FaultConfig {
    /// `/kill` request timeout.
    pub fn kill_timeout(&self) -> Duration {
        Duration::from_secs(self.kill_timeout_secs)
    }

    /// Fault detection deadline.
    pub fn detect_deadline(&self) -> Duration {
        Duration::from_secs(self.detect_deadline_secs)
    }

    /// Recovery deadline.
    pub fn recovery_deadline(&self) -> Duration {
        Duration::from_secs(self.recovery_deadline_secs)
    }

    /// Fast poll interval.
    pub fn poll_short(&self) -> Duration {
        Duration::from_secs(self.poll_short_secs)
    }

    /// Slow poll interval.
    pub fn poll_long(&self) -> Duration {
        Duration::from_secs(self.poll_long_secs)
    }
}

impl ScalingConfig {
    /// `/work` request timeout.
    pub fn work_timeout(&self) -> Duration {
        Duration::from_secs(self.work_timeout_secs)
    }

    /// Scale-out phase deadline.
    pub fn scale_out_deadline(&self) -> Duration {
        Duration::from_secs(self.scale_out_deadline_secs)
    }

    /// Scale-in phase deadline.
    pub fn scale_in_deadline(&self) -> Duration {
        Duration::from_secs(self.scale_in_deadline_secs)
    }

    /// Scale-out poll interval.
    pub fn scale_out_interval(&self) -> Duration {
        Duration::from_secs(self.scale_out_interval_secs)
    }

    /// Scale-in poll interval.
    pub fn scale_in_interval(&self) -> Duration {
        Duration::from_secs(self.scale_in_interval_secs)
    }
}

impl HarnessConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make a poller spin or a ratio meaningless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let intervals = [
            ("stabilize.interval_secs", self.stabilize.interval_secs),
            ("fault.poll_short_secs", self.fault.poll_short_secs),
            ("fault.poll_long_secs", self.fault.poll_long_secs),
            ("scaling.scale_out_interval_secs", self.scaling.scale_out_interval_secs),
            ("scaling.scale_in_interval_secs", self.scaling.scale_in_interval_secs),
        ];
        for (name, value) in intervals {
            if value == 0 {
                return Err(ConfigError::Invalid(format!("{} must be > 0", name)));
            }
        }

        if self.probe.timeout_secs == 0 {
            return Err(ConfigError::Invalid("probe.timeout_secs must be > 0".into()));
        }

        if self.scaling.workers == 0 {
            return Err(ConfigError::Invalid("scaling.workers must be > 0".into()));
        }

        let threshold = self.fault.availability_threshold_percent;
        if !(0.0..=100.0).contains(&threshold) {
            return Err(ConfigError::Invalid(format!(
                "fault.availability_threshold_percent must be within 0..=100, got {}",
                threshold
            )));
        }

        Ok(())
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
    /// Configuration parsed but is not usable.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
