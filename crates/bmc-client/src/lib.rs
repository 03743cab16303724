//! BMC Provisioning API Client
//!
//! A client library for the BMC server provisioning API, authenticating via
//! an OAuth2 client-credentials exchange. The client deliberately returns
//! raw status codes and bodies: the controller owns the code-to-outcome
//! classification tables and the status payload type, so the client stays a
//! thin, well-typed transport.
//!
//! # Example
//!
//! ```no_run
//! use bmc_client::{BmcApi, BmcClient, BmcConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = BmcConfig::from_env()?;
//! let client = BmcClient::new(&config)?;
//! client.validate_credentials().await?;
//!
//! let response = client.get_server("srv-1").await?;
//! println!("status code: {}", response.code);
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
#[path = "trait.rs"]
pub mod bmc_trait;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;

pub use bmc_trait::BmcApi;
pub use client::BmcClient;
pub use config::{
    BmcConfig, ENV_BMC_CLIENT_ID, ENV_BMC_CLIENT_SECRET, ENV_BMC_ENDPOINT_URL, ENV_BMC_TOKEN_URL,
};
pub use error::BmcError;
pub use models::ApiResponse;
#[cfg(any(test, feature = "test-util"))]
pub use mock::{MockBmcClient, MockCall};
