//! Terminal result of a scenario run.

use std::fmt;

/// How one scenario ended. Produced once per run, never persisted.
///
/// `R` is the scenario-specific report carried by a pass.
#[derive(Debug, Clone, PartialEq)]
pub enum ScenarioOutcome<R> {
    /// The system under test behaved as expected.
    Passed(R),
    /// The system under test did not converge in time, or misbehaved.
    Failed {
        /// Human-readable reason, usually a deadline-exceeded message.
        reason: String,
    },
    /// The environment was not ready; nothing was asserted.
    Skipped {
        /// Why the scenario did not run.
        reason: String,
    },
}

impl<R> ScenarioOutcome<R> {
    /// Build a failure.
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
        }
    }

    /// Build a skip.
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped {
            reason: reason.into(),
        }
    }

    /// True for [`ScenarioOutcome::Passed`].
    pub fn is_passed(&self) -> bool {
        matches!(self, Self::Passed(_))
    }

    /// True for [`ScenarioOutcome::Failed`].
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// True for [`ScenarioOutcome::Skipped`].
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped { .. })
    }

    /// The pass report, if any.
    pub fn report(&self) -> Option<&R> {
        match self {
            Self::Passed(r) => Some(r),
            _ => None,
        }
    }

    /// Short verdict label used in summaries.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Passed(_) => "PASS",
            Self::Failed { .. } => "FAIL",
            Self::Skipped { .. } => "SKIP",
        }
    }

    /// The pass report, or the non-passing outcome retyped so a later
    /// stage can return it unchanged.
    pub fn passed<S>(self) -> Result<R, ScenarioOutcome<S>> {
        match self {
            Self::Passed(r) => Ok(r),
            Self::Failed { reason } => Err(ScenarioOutcome::Failed { reason }),
            Self::Skipped { reason } => Err(ScenarioOutcome::Skipped { reason }),
        }
    }

    /// Transform the pass report, keeping failures and skips as they are.
    pub fn map<S>(self, f: impl FnOnce(R) -> S) -> ScenarioOutcome<S> {
        match self {
            Self::Passed(r) => ScenarioOutcome::Passed(f(r)),
            Self::Failed { reason } => ScenarioOutcome::Failed { reason },
            Self::Skipped { reason } => ScenarioOutcome::Skipped { reason },
        }
    }
}

/// Rendered form of any scenario report, for summaries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScenarioReport {
    /// One-line headline.
    pub summary: String,
    /// Supporting facts, one per line.
    pub details: Vec<String>,
    /// Non-fatal concerns (e.g. availability below threshold).
    pub warnings: Vec<String>,
}

impl ScenarioReport {
    /// Report with a headline and nothing else.
    pub fn new(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            ..Default::default()
        }
    }

    /// Add a supporting fact.
    pub fn detail(mut self, line: impl Into<String>) -> Self {
        self.details.push(line.into());
        self
    }

    /// Add a warning.
    pub fn warning(mut self, line: impl Into<String>) -> Self {
        self.warnings.push(line.into());
        self
    }
}

impl fmt::Display for ScenarioReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.summary)?;
        for line in &self.details {
            write!(f, "\n    {}", line)?;
        }
        for line in &self.warnings {
            write!(f, "\n    [WARN] {}", line)?;
        }
        Ok(())
    }
}

impl<R: fmt::Display> fmt::Display for ScenarioOutcome<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Passed(r) => write!(f, "PASS {}", r),
            Self::Failed { reason } => write!(f, "FAIL {}", reason),
            Self::Skipped { reason } => write!(f, "SKIP {}", reason),
        }
    }
}
