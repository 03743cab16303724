//! Main controller implementation.
//!
//! This module contains the `Controller` struct that orchestrates
//! reconciliation and resource watching for the BMC Server Controller.

use crate::error::ControllerError;
use crate::reconciler::Reconciler;
use crate::watcher::Watcher;
use bmc_client::{BmcClient, BmcConfig};
use crds::Server;
use kube::runtime::events::{Recorder, Reporter};
use kube::{Api, Client};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

/// Main controller for BMC server management.
pub struct Controller {
    server_watcher: JoinHandle<Result<(), ControllerError>>,
}

impl Controller {
    /// Creates a new controller instance.
    ///
    /// Credentials are validated with a token exchange before any watcher
    /// starts, so a misconfigured deployment fails at startup rather than
    /// on every reconcile pass.
    pub async fn new(
        config: BmcConfig,
        namespace: Option<String>,
    ) -> Result<Self, ControllerError> {
        info!("Initializing BMC Server Controller");

        let kube_client = Client::try_default()
            .await
            .map_err(ControllerError::Kube)?;

        let bmc_client = BmcClient::new(&config)?;
        bmc_client.validate_credentials().await?;
        info!("BMC credentials validated");

        let ns = namespace.as_deref().unwrap_or("default");
        let server_api: Api<Server> = Api::namespaced(kube_client.clone(), ns);

        let recorder = Recorder::new(
            kube_client,
            Reporter {
                controller: "server-controller".to_owned(),
                instance: None,
            },
        );

        let reconciler = Arc::new(Reconciler::new(
            server_api.clone(),
            Arc::new(bmc_client),
            recorder,
        ));

        let watcher_instance = Watcher::new(reconciler, server_api);

        let server_watcher =
            tokio::spawn(async move { watcher_instance.watch_servers().await });

        Ok(Self { server_watcher })
    }

    /// Runs the controller until shutdown.
    pub async fn run(self) -> Result<(), ControllerError> {
        info!("BMC Server Controller running");

        self.server_watcher
            .await
            .map_err(|e| ControllerError::Watch(format!("Server watcher panicked: {e}")))?
    }
}
