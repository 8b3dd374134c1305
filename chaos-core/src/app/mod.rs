//! Application HTTP surface.
//!
//! The application under test exposes three things the harness uses:
//! - `GET {base}/`: health probe, 200 when serving
//! - `GET {base}/kill`: makes the serving instance fail its health checks
//! - `GET {base}/work?sec=N`: burns CPU for N seconds to drive scaling
//!
//! Fault injection and work requests are fire-and-forget: they return a
//! `Result` and the caller decides to drop the error. The probe is total.

mod http;
mod mock;

pub use http::HttpApplication;
pub use mock::MockApplication;

use async_trait::async_trait;
use thiserror::Error;

use crate::probe::ProbeOutcome;

/// Errors from a fault-injection or work request.
#[derive(Debug, Error)]
pub enum AppError {
    /// The request did not complete before its timeout.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// Could not connect to the endpoint.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Any other HTTP failure.
    #[error("http error: {0}")]
    Http(String),
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            AppError::Timeout(e.to_string())
        } else if e.is_connect() {
            AppError::ConnectionFailed(e.to_string())
        } else {
            AppError::Http(e.to_string())
        }
    }
}

/// The application endpoints reachable through the load balancer.
#[async_trait]
pub trait Application: Send + Sync {
    /// One availability probe against the public endpoint.
    async fn probe(&self) -> ProbeOutcome;

    /// Ask whichever instance answers to fail (`/kill`).
    async fn inject_fault(&self) -> Result<(), AppError>;

    /// Trigger one unit of synthetic work (`/work?sec=N`).
    async fn trigger_work(&self) -> Result<(), AppError>;
}
