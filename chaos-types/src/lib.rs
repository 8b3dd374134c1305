//! # chaos-types
//!
//! Observation and outcome types for the infra-chaos resilience harness.
//!
//! This crate provides the data model shared by the engine and the CLI:
//! - [`InstanceId`], [`HealthySet`] - What the control plane reports
//! - [`AvailabilityWindow`] - Probe successes over a monitoring window
//! - [`ScenarioOutcome`], [`ScenarioReport`] - Terminal result of one scenario

#![warn(missing_docs)]
#![warn(clippy::all)]

mod availability;
mod ids;
mod outcome;

pub use availability::AvailabilityWindow;
pub use ids::{HealthySet, InstanceId};
pub use outcome::{ScenarioOutcome, ScenarioReport};
