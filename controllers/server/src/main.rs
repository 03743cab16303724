//! BMC Server Controller
//!
//! Drives bare-metal servers on the BMC provisioning API to match
//! declarative `Server` records: creates the machine when a record appears,
//! polls it until it settles, and deallocates it when the record is deleted.

mod classifier;
mod controller;
mod error;
mod reconciler;
mod transition;
mod watcher;

#[cfg(test)]
mod test_utils;
#[cfg(test)]
mod transition_test;

use crate::controller::Controller;
use crate::error::ControllerError;
use bmc_client::BmcConfig;
use std::env;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    tracing_subscriber::fmt::init();

    info!("Starting BMC Server Controller");

    // Load configuration from environment variables. A missing connection
    // parameter is fatal; the error names every absent variable.
    let config = BmcConfig::from_env().map_err(ControllerError::Bmc)?;
    let namespace = env::var("WATCH_NAMESPACE").ok();

    info!("Configuration:");
    info!("  BMC endpoint: {}", config.endpoint_url);
    info!("  Token URL: {}", config.token_url);
    info!("  Namespace: {}", namespace.as_deref().unwrap_or("default"));

    let controller = Controller::new(config, namespace).await?;
    controller.run().await?;

    Ok(())
}
