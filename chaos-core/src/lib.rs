//! # chaos-core
//!
//! Resilience harness engine for a load-balanced, auto-scaled service.
//!
//! The harness injects faults and load into a deployed stack (load balancer,
//! target group, scaling group), then polls control-plane and data-plane
//! state until the expected convergence happens or a deadline passes:
//! - [`probe`] - Single bounded HTTP availability probe
//! - [`app`] - Application endpoints: probe, `/kill`, `/work`
//! - [`control_plane`] - Target health, scaling groups, termination
//! - [`state`] - Healthy targets and desired capacity, read fresh each poll
//! - [`poll`] - Fixed-interval convergence poller with a pluggable predicate
//! - [`load`] - Concurrent load workers sharing one stop signal
//! - [`scenarios`] - Fault and scaling scenarios built from the above

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod app;
pub mod config;
pub mod control_plane;
pub mod error;
pub mod load;
pub mod poll;
pub mod probe;
pub mod scenarios;
pub mod state;

pub use config::HarnessConfig;
pub use error::{ChaosError, Result};
