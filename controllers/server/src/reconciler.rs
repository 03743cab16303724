//! Reconciliation IO for Server resources.
//!
//! The decision procedure itself lives in [`crate::transition`]; this module
//! wires it to the cluster and the provisioning API. One pass performs at
//! most one remote call and at most two record writes (finalizer attach,
//! then status/annotation update), and notifications are flushed only after
//! the transition has been persisted.

use crate::error::ControllerError;
use crate::transition::{
    on_create_response, on_delete_response, on_delete_skipped, on_poll_response,
    on_poll_transport_failure, remote_cleanup_target, select_branch, Branch, EventReason,
    NextAction, Severity, StatusUpdate, Transition, TransitionFailure,
};
use bmc_client::BmcApi;
use crds::{ProvisioningStatus, Server, SERVER_FINALIZER, SERVER_ID_ANNOTATION};
use kube::api::{Patch, PatchParams};
use kube::runtime::controller::Action;
use kube::runtime::events::{Event, EventType, Recorder};
use kube::{Api, Resource, ResourceExt};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Reconciles Server resources against the BMC provisioning API.
pub struct Reconciler {
    servers: Api<Server>,
    bmc: Arc<dyn BmcApi>,
    recorder: Recorder,
}

impl Reconciler {
    /// Creates a new reconciler instance.
    pub fn new(servers: Api<Server>, bmc: Arc<dyn BmcApi>, recorder: Recorder) -> Self {
        Self {
            servers,
            bmc,
            recorder,
        }
    }

    /// Runs one reconciliation pass for a Server.
    pub async fn reconcile_server(&self, server: &Server) -> Result<Action, ControllerError> {
        let name = server.name_any();
        let namespace = server.namespace().unwrap_or_else(|| "default".to_owned());
        info!("Reconciling Server {}/{}", namespace, name);

        let deletion_requested = server.meta().deletion_timestamp.is_some();

        // Attach the finalizer before anything else so a later deletion is
        // guaranteed to be intercepted for remote cleanup.
        if !deletion_requested && !server.finalizers().iter().any(|f| f == SERVER_FINALIZER) {
            info!("attaching finalizer to Server {}/{}", namespace, name);
            self.attach_finalizer(server).await?;
        }

        let server_id = server
            .annotations()
            .get(SERVER_ID_ANNOTATION)
            .map(String::as_str);

        match select_branch(deletion_requested, server_id) {
            Branch::Delete => self.finalize(server).await,
            Branch::Create => self.create(server).await,
            Branch::Poll(id) => self.poll(server, &id).await,
        }
    }

    /// Create branch: the id annotation is absent, so the server has never
    /// been provisioned (or the identifier was never durably recorded).
    async fn create(&self, server: &Server) -> Result<Action, ControllerError> {
        info!("creating BMC server for {}", server.name_any());
        let body = serde_json::to_value(&server.spec)?;

        let response = match self.bmc.create_server(&body).await {
            Ok(response) => response,
            Err(e) => {
                self.emit(server, EventReason::CreateError, &e.to_string())
                    .await;
                return Err(e.into());
            }
        };

        self.apply(server, "create", on_create_response(response.code, &response.body))
            .await
    }

    /// Poll branch: refresh the observed status of the identified server.
    async fn poll(&self, server: &Server, server_id: &str) -> Result<Action, ControllerError> {
        info!("polling BMC server {}", server_id);
        let previous = observed_status(server);

        let transition = match self.bmc.get_server(server_id).await {
            Ok(response) => on_poll_response(&previous, response.code, &response.body),
            Err(e) => on_poll_transport_failure(&previous, e.to_string()),
        };

        self.apply(server, "poll", transition).await
    }

    /// Delete branch: remote cleanup, then finalizer removal once cleanup
    /// succeeded or was determined to be unnecessary.
    async fn finalize(&self, server: &Server) -> Result<Action, ControllerError> {
        info!("finalizing Server {}", server.name_any());
        let status = observed_status(server);
        let server_id = server
            .annotations()
            .get(SERVER_ID_ANNOTATION)
            .map(String::as_str);

        let transition = match remote_cleanup_target(&status, server_id) {
            None => on_delete_skipped(),
            Some(id) => match self.bmc.delete_server(id).await {
                Ok(response) => on_delete_response(response.code, id),
                Err(e) => {
                    self.emit(server, EventReason::CleanupError, &e.to_string())
                        .await;
                    return Err(e.into());
                }
            },
        };

        self.apply(server, "delete", transition).await
    }

    /// Persists a transition, flushes its notifications, and maps the next
    /// action (or surfaced failure) to the scheduler's vocabulary.
    async fn apply(
        &self,
        server: &Server,
        operation: &'static str,
        transition: Transition,
    ) -> Result<Action, ControllerError> {
        let name = server.name_any();

        // The identifier annotation goes first: once it is durable, every
        // re-invocation takes the poll branch instead of creating again.
        if let Some(id) = &transition.record_server_id {
            self.servers
                .patch(
                    &name,
                    &PatchParams::default(),
                    &Patch::Merge(json!({
                        "metadata": { "annotations": { SERVER_ID_ANNOTATION: id } }
                    })),
                )
                .await?;
        }

        match &transition.update {
            StatusUpdate::Keep => {}
            StatusUpdate::Mark(status) => {
                self.servers
                    .patch_status(
                        &name,
                        &PatchParams::default(),
                        &Patch::Merge(json!({ "status": { "status": status } })),
                    )
                    .await?;
            }
            StatusUpdate::Replace(status) => {
                self.servers
                    .patch_status(
                        &name,
                        &PatchParams::default(),
                        &Patch::Merge(json!({ "status": status })),
                    )
                    .await?;
            }
        }

        for notification in &transition.notifications {
            self.emit(server, notification.reason, &notification.message)
                .await;
        }

        if transition.clear_finalizer {
            self.remove_finalizer(server).await?;
        }

        match transition.failure {
            Some(failure) => {
                let retry_after = match transition.next {
                    NextAction::RequeueAfter(delay) => Some(delay),
                    NextAction::Stop => None,
                };
                Err(failure_error(operation, failure, retry_after))
            }
            None => Ok(match transition.next {
                NextAction::Stop => Action::await_change(),
                NextAction::RequeueAfter(delay) => Action::requeue(delay),
            }),
        }
    }

    async fn attach_finalizer(&self, server: &Server) -> Result<(), ControllerError> {
        let mut finalizers = server.finalizers().to_vec();
        finalizers.push(SERVER_FINALIZER.to_owned());
        self.patch_finalizers(&server.name_any(), finalizers).await
    }

    async fn remove_finalizer(&self, server: &Server) -> Result<(), ControllerError> {
        let finalizers: Vec<String> = server
            .finalizers()
            .iter()
            .filter(|f| *f != SERVER_FINALIZER)
            .cloned()
            .collect();
        self.patch_finalizers(&server.name_any(), finalizers).await
    }

    async fn patch_finalizers(
        &self,
        name: &str,
        finalizers: Vec<String>,
    ) -> Result<(), ControllerError> {
        self.servers
            .patch(
                name,
                &PatchParams::default(),
                &Patch::Merge(json!({ "metadata": { "finalizers": finalizers } })),
            )
            .await?;
        Ok(())
    }

    /// Records an event against the Server. Event delivery is best-effort;
    /// a failed publish is logged but never fails the pass.
    async fn emit(&self, server: &Server, reason: EventReason, message: &str) {
        let event = Event {
            type_: match reason.severity() {
                Severity::Normal => EventType::Normal,
                Severity::Warning => EventType::Warning,
            },
            reason: reason.as_str().to_owned(),
            note: Some(message.to_owned()),
            action: "Reconcile".to_owned(),
            secondary: None,
        };
        if let Err(e) = self.recorder.publish(&event, &server.object_ref(&())).await {
            warn!(
                "Failed to record {} event for Server {}: {}",
                reason.as_str(),
                server.name_any(),
                e
            );
        }
    }
}

/// Last observed provider status of a Server, defaulting to unspecified for
/// records without a status yet.
fn observed_status(server: &Server) -> ProvisioningStatus {
    server
        .status
        .as_ref()
        .map(|s| s.status.clone())
        .unwrap_or_default()
}

fn failure_error(
    operation: &'static str,
    failure: TransitionFailure,
    retry_after: Option<Duration>,
) -> ControllerError {
    match failure {
        TransitionFailure::Transport(message) => ControllerError::TransientFailure {
            operation,
            message,
            retry_after,
        },
        TransitionFailure::ServiceUnavailable(code) => ControllerError::TransientFailure {
            operation,
            message: format!("provider returned {code}"),
            retry_after,
        },
        TransitionFailure::MalformedBody(message) => ControllerError::MalformedResponse {
            operation,
            message,
            retry_after,
        },
        TransitionFailure::UnexpectedResponse(code) => ControllerError::UnexpectedResponse {
            operation,
            code,
            retry_after,
        },
    }
}
