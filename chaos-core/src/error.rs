//! Error types for the harness engine.
//!
//! Only infrastructure-level problems are errors. Failed probes, failed load
//! requests and convergence timeouts are ordinary outcomes and never surface
//! here.

use crate::control_plane::ControlPlaneError;

/// Main error type for harness operations.
#[derive(Debug, thiserror::Error)]
pub enum ChaosError {
    /// A control-plane query or action failed. Not retried.
    #[error("control plane error: {0}")]
    ControlPlane(#[from] ControlPlaneError),

    /// A load worker did not exit cleanly.
    #[error("load driver error: {0}")]
    LoadDriver(String),
}

/// Result type alias for harness operations.
pub type Result<T> = std::result::Result<T, ChaosError>;
