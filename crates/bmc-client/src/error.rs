//! BMC client errors

use thiserror::Error;

/// Errors that can occur when interacting with the BMC provisioning API.
#[derive(Debug, Error)]
pub enum BmcError {
    /// HTTP request/response error (transport level, no status code obtained)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Client-credential exchange against the token endpoint failed
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Incomplete or invalid connection configuration
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// Transport failure without a `reqwest` source, produced by test
    /// doubles standing in for the real client
    #[error("transport failure: {0}")]
    Transport(String),
}
