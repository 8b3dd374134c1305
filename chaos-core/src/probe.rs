//! Availability sampler.
//!
//! One bounded-timeout GET against the public endpoint, reduced to a binary
//! observation. Every failure mode (connect error, timeout, non-200, body
//! read error) is folded into `false`; nothing escapes as an error and
//! nothing is retried here. Retrying is the poller's job.

use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use tracing::trace;

/// Default probe timeout.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Result of one detailed probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutcome {
    /// True iff a complete response with status 200 arrived in time.
    pub available: bool,
    /// Status code, when a response arrived at all.
    pub status: Option<u16>,
    /// Backend that served the response, when the body names one.
    pub host: Option<String>,
}

impl ProbeOutcome {
    fn unreachable() -> Self {
        Self {
            available: false,
            status: None,
            host: None,
        }
    }
}

/// Issues single availability probes.
#[derive(Debug, Clone)]
pub struct AvailabilitySampler {
    http: reqwest::Client,
    timeout: Duration,
}

impl Default for AvailabilitySampler {
    fn default() -> Self {
        Self::new(DEFAULT_PROBE_TIMEOUT)
    }
}

impl AvailabilitySampler {
    /// Create a sampler with its own HTTP client.
    pub fn new(timeout: Duration) -> Self {
        Self::with_client(reqwest::Client::new(), timeout)
    }

    /// Create a sampler sharing an existing HTTP client.
    pub fn with_client(http: reqwest::Client, timeout: Duration) -> Self {
        Self { http, timeout }
    }

    /// Probe `endpoint` once. Total: never errors, never panics.
    pub async fn sample(&self, endpoint: &str) -> bool {
        self.probe(endpoint).await.available
    }

    /// Probe `endpoint` once, keeping the status and serving host.
    pub async fn probe(&self, endpoint: &str) -> ProbeOutcome {
        let response = match self.http.get(endpoint).timeout(self.timeout).send().await {
            Ok(response) => response,
            Err(e) => {
                trace!(endpoint, error = %e, "probe failed");
                return ProbeOutcome::unreachable();
            }
        };

        let status = response.status().as_u16();
        if status != 200 {
            trace!(endpoint, status, "probe got non-200");
            return ProbeOutcome {
                available: false,
                status: Some(status),
                host: None,
            };
        }

        match response.text().await {
            Ok(body) => ProbeOutcome {
                available: true,
                status: Some(status),
                host: extract_response_host(&body),
            },
            Err(e) => {
                trace!(endpoint, error = %e, "probe body read failed");
                ProbeOutcome {
                    available: false,
                    status: Some(status),
                    host: None,
                }
            }
        }
    }
}

/// Serving host as printed by the application: `Host: <name>` or
/// `Hostname: <name>`, ending at `<`, whitespace, or end of input.
const HOST_PATTERN: &str = r"(?:Host|Hostname):\s*(.*?)(?:<|\s|$)";

fn host_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(HOST_PATTERN).ok()).as_ref()
}

/// Extract the serving host from a response body. An empty value is `None`.
pub fn extract_response_host(body: &str) -> Option<String> {
    let captures = host_pattern()?.captures(body)?;
    let host = captures.get(1)?.as_str();
    (!host.is_empty()).then(|| host.to_string())
}
