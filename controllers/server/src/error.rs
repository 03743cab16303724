//! Controller-specific error types.
//!
//! Errors that escape a reconcile pass land in the watcher's error policy.
//! Some failure modes still want a specific retry interval (a transient
//! provider failure keeps its 2 minute backoff even though it is surfaced as
//! an error), so those variants carry a retry hint the policy honors.

use bmc_client::BmcError;
use kube::Error as KubeError;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur in the BMC server controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] KubeError),

    /// BMC API transport or authentication error
    #[error("BMC error: {0}")]
    Bmc(#[from] BmcError),

    /// JSON serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Transient provider failure; retried at the classifier's interval
    #[error("transient failure during server {operation}: {message}")]
    TransientFailure {
        /// Operation that failed (create/poll/delete)
        operation: &'static str,
        /// Human-readable failure description
        message: String,
        /// Interval to retry at, when the classifier table prescribes one
        retry_after: Option<Duration>,
    },

    /// Response status code outside the classifier's table
    #[error("unexpected response during server {operation}: {code}")]
    UnexpectedResponse {
        /// Operation the response belongs to
        operation: &'static str,
        /// The unclassifiable HTTP status code
        code: u16,
        /// Interval to retry at, when the classifier table prescribes one
        retry_after: Option<Duration>,
    },

    /// Response body did not parse as a server status payload
    #[error("malformed response during server {operation}: {message}")]
    MalformedResponse {
        /// Operation the response belongs to
        operation: &'static str,
        /// Parse failure description
        message: String,
        /// Interval to retry at, when the classifier table prescribes one
        retry_after: Option<Duration>,
    },

    /// Resource watch failed
    #[error("Resource watch failed: {0}")]
    Watch(String),
}

impl ControllerError {
    /// Retry interval this error prescribes, if any. `None` defers to the
    /// watcher's generic error-retry policy.
    #[must_use]
    pub fn retry_hint(&self) -> Option<Duration> {
        match self {
            Self::TransientFailure { retry_after, .. }
            | Self::UnexpectedResponse { retry_after, .. }
            | Self::MalformedResponse { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}
