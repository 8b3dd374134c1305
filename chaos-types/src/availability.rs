//! Availability accounting over one monitoring window.

use std::collections::BTreeSet;
use std::fmt;

/// Running tally of availability probes.
///
/// `checks` only ever grows, and `successes <= checks` always holds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AvailabilityWindow {
    successes: u64,
    checks: u64,
    hosts: BTreeSet<String>,
}

impl AvailabilityWindow {
    /// Empty window.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one probe result.
    pub fn record(&mut self, available: bool) {
        self.checks += 1;
        if available {
            self.successes += 1;
        }
    }

    /// Record one probe result along with the backend that answered it.
    pub fn record_from(&mut self, available: bool, host: Option<&str>) {
        self.record(available);
        if let (true, Some(host)) = (available, host) {
            self.hosts.insert(host.to_string());
        }
    }

    /// Successful probes so far.
    pub fn successes(&self) -> u64 {
        self.successes
    }

    /// Total probes so far.
    pub fn checks(&self) -> u64 {
        self.checks
    }

    /// Distinct hosts that served a successful probe.
    pub fn hosts(&self) -> impl Iterator<Item = &str> {
        self.hosts.iter().map(String::as_str)
    }

    /// Availability in percent, or `None` before the first probe.
    pub fn percent(&self) -> Option<f64> {
        if self.checks == 0 {
            return None;
        }
        Some(self.successes as f64 / self.checks as f64 * 100.0)
    }

    /// Whether availability is at least `threshold_percent`.
    ///
    /// An empty window has nothing to hold against the threshold.
    pub fn meets(&self, threshold_percent: f64) -> bool {
        self.percent().map_or(true, |p| p >= threshold_percent)
    }
}

impl fmt::Display for AvailabilityWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.percent() {
            Some(p) => write!(f, "{:.1}% ({}/{})", p, self.successes, self.checks),
            None => f.write_str("n/a (no checks)"),
        }
    }
}
