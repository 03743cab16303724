//! Kubernetes resource watchers.
//!
//! This module handles watching Server resources for changes and triggering
//! reconciliation using kube_runtime::Controller.

use crate::error::ControllerError;
use crate::reconciler::Reconciler;
use crds::Server;
use futures::StreamExt;
use kube::Api;
use kube_runtime::{
    controller::{Action, Config as ControllerConfig},
    watcher, Controller,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// Fallback requeue interval for errors that carry no retry hint of their
/// own (Kubernetes API failures, serialization errors).
const ERROR_RETRY: Duration = Duration::from_secs(60);

/// Generic watcher helper built on kube_runtime::Controller.
///
/// Controller handles automatic reconnection, retries, and backoff, and
/// keeps watching indefinitely. Reconciliation errors are routed through
/// the error policy, which honors the error's own retry hint when the
/// classifier tables prescribe one.
async fn watch_resource(
    api: Api<Server>,
    reconciler: Arc<Reconciler>,
    resource_name: &str,
) -> Result<(), ControllerError> {
    info!("Starting {} watcher", resource_name);

    let error_policy = |_obj: Arc<Server>, error: &ControllerError, _ctx: Arc<Reconciler>| {
        error!("Reconciliation error: {}", error);
        Action::requeue(error.retry_hint().unwrap_or(ERROR_RETRY))
    };

    let reconcile = |obj: Arc<Server>, ctx: Arc<Reconciler>| async move {
        ctx.reconcile_server(&obj).await
    };

    // Debounce batches bursts of status updates; the concurrency cap keeps
    // simultaneous provisioning calls bounded.
    let controller_config = ControllerConfig::default()
        .debounce(Duration::from_secs(5))
        .concurrency(3);

    Controller::new(api, watcher::Config::default())
        .with_config(controller_config)
        .run(reconcile, error_policy, reconciler)
        .for_each(|res| async move {
            if let Err(e) = res {
                error!("Controller error: {}", e);
            }
        })
        .await;

    Ok(())
}

/// Watches Kubernetes resources for changes.
pub struct Watcher {
    reconciler: Arc<Reconciler>,
    server_api: Api<Server>,
}

impl Watcher {
    /// Creates a new watcher instance.
    pub fn new(reconciler: Arc<Reconciler>, server_api: Api<Server>) -> Self {
        Self {
            reconciler,
            server_api,
        }
    }

    /// Starts watching Server resources.
    pub async fn watch_servers(&self) -> Result<(), ControllerError> {
        watch_resource(self.server_api.clone(), self.reconciler.clone(), "Server").await
    }
}
