//! Reconciliation state machine.
//!
//! Pure transition functions: given the record's previous provider status
//! and the outcome of a provisioning API call, they compute the full effect
//! of the pass — status update, remote identifier to record, pending
//! notifications, finalizer disposition, next action, and any error to
//! surface. The reconciler applies the result against the cluster; nothing
//! in this module performs IO, which is what makes the decision procedure
//! testable and idempotent under re-invocation.

use crate::classifier::{
    classify, ApiOperation, Outcome, REQUEUE_1MIN, REQUEUE_2MIN,
};
use crds::{ProvisioningStatus, ServerStatus};
use std::time::Duration;

/// Event severity, mirroring Kubernetes event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Routine lifecycle notification.
    Normal,
    /// Something needs operator attention.
    Warning,
}

/// Event reasons recorded against the Server resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventReason {
    /// Remote server created.
    Created,
    /// Create failed before or outside the classifier table.
    CreateError,
    /// Create failed permanently (bad spec, credentials, or state).
    CreateErrorPermanent,
    /// Create deferred: no hardware inventory.
    CreateErrorInventory,
    /// Create failed transiently on the provider side.
    CreateServerFailure,
    /// Remote cleanup failed.
    CleanupError,
    /// Remote cleanup succeeded.
    CleanupSuccess,
    /// Poll failed.
    PollingFailure,
    /// Remote resource became unreachable; cleanup abandoned.
    ResourceOrphaned,
    /// Provider status string changed between observations.
    StatusChange,
}

impl EventReason {
    /// UpperCamelCase reason string as recorded on the event.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "Created",
            Self::CreateError => "CreateError",
            Self::CreateErrorPermanent => "CreateErrorPermanent",
            Self::CreateErrorInventory => "CreateErrorInventory",
            Self::CreateServerFailure => "CreateServerFailure",
            Self::CleanupError => "CleanupError",
            Self::CleanupSuccess => "CleanupSuccess",
            Self::PollingFailure => "PollingFailure",
            Self::ResourceOrphaned => "ResourceOrphaned",
            Self::StatusChange => "StatusChange",
        }
    }

    /// Severity this reason is recorded with.
    #[must_use]
    pub fn severity(self) -> Severity {
        match self {
            Self::Created | Self::CleanupSuccess | Self::StatusChange => Severity::Normal,
            _ => Severity::Warning,
        }
    }
}

/// A pending user-visible notification, flushed after a successful persist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Event reason.
    pub reason: EventReason,
    /// Human-readable message.
    pub message: String,
}

impl Notification {
    fn new(reason: EventReason, message: impl Into<String>) -> Self {
        Self {
            reason,
            message: message.into(),
        }
    }
}

/// What happens to the record's status field.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusUpdate {
    /// Leave the status untouched.
    Keep,
    /// Overwrite only the provider status string with a sentinel.
    Mark(ProvisioningStatus),
    /// Fully replace the status with a parsed API payload.
    Replace(ServerStatus),
}

/// What the scheduler should do after this pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextAction {
    /// No automatic requeue; wait for an external trigger.
    Stop,
    /// Reconcile again after the given delay.
    RequeueAfter(Duration),
}

/// A failure to surface to the scheduler after persisting the transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionFailure {
    /// No response was obtained at all.
    Transport(String),
    /// The provider reported a temporary failure.
    ServiceUnavailable(u16),
    /// The response body did not parse as a status payload.
    MalformedBody(String),
    /// The status code is outside the classifier table.
    UnexpectedResponse(u16),
}

/// Complete effect of one reconciliation decision.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    /// Status change to persist.
    pub update: StatusUpdate,
    /// Remote identifier to record in the id annotation, persisted before
    /// the status so a crash between the two cannot double-provision.
    pub record_server_id: Option<String>,
    /// Whether the cleanup finalizer may be removed. Only ever true when
    /// there was nothing to clean up or the delete call succeeded.
    pub clear_finalizer: bool,
    /// Notifications to flush after persisting.
    pub notifications: Vec<Notification>,
    /// Next scheduling action.
    pub next: NextAction,
    /// Error to surface alongside the (already persisted) transition.
    pub failure: Option<TransitionFailure>,
}

impl Transition {
    fn new(next: NextAction) -> Self {
        Self {
            update: StatusUpdate::Keep,
            record_server_id: None,
            clear_finalizer: false,
            notifications: Vec::new(),
            next,
            failure: None,
        }
    }

    fn mark(mut self, status: ProvisioningStatus) -> Self {
        self.update = StatusUpdate::Mark(status);
        self
    }

    fn notify(mut self, reason: EventReason, message: impl Into<String>) -> Self {
        self.notifications.push(Notification::new(reason, message));
        self
    }

    fn fail(mut self, failure: TransitionFailure) -> Self {
        self.failure = Some(failure);
        self
    }

    fn unexpected(operation: ApiOperation, code: u16) -> Self {
        let reason = match operation {
            ApiOperation::Create => EventReason::CreateError,
            ApiOperation::Poll => EventReason::PollingFailure,
            ApiOperation::Delete => EventReason::CleanupError,
        };
        // no requeue is scheduled here; the generic error-retry policy of
        // the scheduler owns unexpected codes
        Transition::new(NextAction::Stop)
            .notify(reason, format!("Unexpected response from API: {code}"))
            .fail(TransitionFailure::UnexpectedResponse(code))
    }
}

/// Which branch owns this reconcile pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Branch {
    /// Deletion was requested; the delete branch owns the pass.
    Delete,
    /// No remote identifier recorded yet; create the server.
    Create,
    /// Poll the identified remote server.
    Poll(String),
}

/// Selects the branch for a pass. Deletion intent always wins; otherwise the
/// presence of the remote identifier annotation decides between create and
/// poll, which is what makes create idempotent once the id is persisted.
#[must_use]
pub fn select_branch(deletion_requested: bool, server_id: Option<&str>) -> Branch {
    if deletion_requested {
        Branch::Delete
    } else {
        match server_id {
            Some(id) if !id.is_empty() => Branch::Poll(id.to_owned()),
            _ => Branch::Create,
        }
    }
}

/// Returns the remote identifier to clean up during deletion, or `None`
/// when cleanup must be skipped: either the resource was already deemed
/// orphaned or no remote server was ever recorded.
#[must_use]
pub fn remote_cleanup_target<'a>(
    status: &ProvisioningStatus,
    server_id: Option<&'a str>,
) -> Option<&'a str> {
    if *status == ProvisioningStatus::Orphaned {
        return None;
    }
    server_id.filter(|id| !id.is_empty())
}

/// Decides the effect of a create response.
pub fn on_create_response(code: u16, body: &[u8]) -> Transition {
    match classify(ApiOperation::Create, code) {
        Outcome::Success => match serde_json::from_slice::<ServerStatus>(body) {
            // an empty id would record the not-yet-created sentinel and
            // re-run the create branch forever
            Ok(status) if !status.server_id.is_empty() => {
                let server_id = status.server_id.clone();
                let mut transition = Transition::new(NextAction::RequeueAfter(REQUEUE_1MIN))
                    .notify(
                        EventReason::Created,
                        format!("Created BMC server {server_id}"),
                    );
                transition.record_server_id = Some(server_id);
                transition.update = StatusUpdate::Replace(status);
                transition
            }
            Ok(_) => {
                let message = "response payload carries no server id";
                Transition::new(NextAction::RequeueAfter(REQUEUE_2MIN))
                    .notify(EventReason::CreateError, message)
                    .fail(TransitionFailure::MalformedBody(message.to_owned()))
            }
            Err(e) => Transition::new(NextAction::RequeueAfter(REQUEUE_2MIN))
                .notify(EventReason::CreateError, e.to_string())
                .fail(TransitionFailure::MalformedBody(e.to_string())),
        },
        Outcome::Permanent { retry } => Transition::new(
            retry.map_or(NextAction::Stop, NextAction::RequeueAfter),
        )
        .mark(ProvisioningStatus::Irreconcilable)
        .notify(EventReason::CreateErrorPermanent, format!("Code: {code}")),
        Outcome::OutOfInventory { retry } => Transition::new(NextAction::RequeueAfter(retry))
            .notify(EventReason::CreateErrorInventory, format!("Code: {code}")),
        Outcome::Transient { retry, .. } => Transition::new(NextAction::RequeueAfter(retry))
            .notify(EventReason::CreateServerFailure, "Temporary API failure")
            .fail(TransitionFailure::ServiceUnavailable(code)),
        // the create table never yields Orphaned
        Outcome::Orphaned { .. } | Outcome::Unexpected(_) => {
            Transition::unexpected(ApiOperation::Create, code)
        }
    }
}

/// Decides the effect of a poll response.
pub fn on_poll_response(previous: &ProvisioningStatus, code: u16, body: &[u8]) -> Transition {
    match classify(ApiOperation::Poll, code) {
        Outcome::Success => match serde_json::from_slice::<ServerStatus>(body) {
            Ok(status) => {
                // powered-on servers settle; everything else is still
                // converging and polls on the tighter interval
                let delay = if status.status == ProvisioningStatus::PoweredOn {
                    REQUEUE_2MIN
                } else {
                    REQUEUE_1MIN
                };
                let mut transition = Transition::new(NextAction::RequeueAfter(delay));
                if *previous != status.status {
                    transition = transition.notify(
                        EventReason::StatusChange,
                        format!("{previous} -> {}", status.status),
                    );
                }
                transition.update = StatusUpdate::Replace(status);
                transition
            }
            Err(e) => Transition::new(NextAction::RequeueAfter(REQUEUE_2MIN))
                .fail(TransitionFailure::MalformedBody(e.to_string())),
        },
        Outcome::Permanent { retry } => Transition::new(
            retry.map_or(NextAction::Stop, NextAction::RequeueAfter),
        )
        .mark(ProvisioningStatus::Irreconcilable)
        .notify(EventReason::PollingFailure, format!("Code: {code}")),
        Outcome::Orphaned { retry } => Transition::new(
            retry.map_or(NextAction::Stop, NextAction::RequeueAfter),
        )
        .mark(ProvisioningStatus::Orphaned)
        .notify(
            EventReason::ResourceOrphaned,
            "Access to BMC resource was denied",
        ),
        Outcome::Transient { retry, mark_stale } => {
            let transition = Transition::new(NextAction::RequeueAfter(retry))
                .notify(EventReason::PollingFailure, format!("Code: {code}"));
            if mark_stale {
                transition.mark(ProvisioningStatus::Stale)
            } else {
                transition
            }
        }
        // the poll table never yields OutOfInventory
        Outcome::OutOfInventory { .. } | Outcome::Unexpected(_) => {
            Transition::unexpected(ApiOperation::Poll, code)
        }
    }
}

/// Decides the effect of a poll attempt that never obtained a response.
/// The status degrades to `stale` and the error is always surfaced, even
/// though a retry is scheduled.
pub fn on_poll_transport_failure(
    previous: &ProvisioningStatus,
    message: impl Into<String>,
) -> Transition {
    let message = message.into();
    let mut transition = Transition::new(NextAction::RequeueAfter(REQUEUE_2MIN))
        .mark(ProvisioningStatus::Stale)
        .fail(TransitionFailure::Transport(message));
    if *previous != ProvisioningStatus::Stale {
        transition = transition.notify(
            EventReason::StatusChange,
            format!("{previous} -> {}", ProvisioningStatus::Stale),
        );
    }
    transition
}

/// Effect of a delete pass with nothing to clean up remotely: either the
/// resource was already deemed orphaned or no remote identifier was ever
/// recorded. The finalizer comes off immediately, unblocking removal.
#[must_use]
pub fn on_delete_skipped() -> Transition {
    let mut transition = Transition::new(NextAction::Stop);
    transition.clear_finalizer = true;
    transition
}

/// Decides the effect of a delete response. The finalizer is only cleared
/// on classified success; every failure keeps deletion blocked.
pub fn on_delete_response(code: u16, server_id: &str) -> Transition {
    match classify(ApiOperation::Delete, code) {
        Outcome::Success => {
            let mut transition = Transition::new(NextAction::Stop).notify(
                EventReason::CleanupSuccess,
                format!("Deleted BMC server {server_id}"),
            );
            transition.clear_finalizer = true;
            transition
        }
        Outcome::Permanent { retry } => Transition::new(
            retry.map_or(NextAction::Stop, NextAction::RequeueAfter),
        )
        .mark(ProvisioningStatus::Irreconcilable),
        Outcome::Orphaned { retry } => Transition::new(
            retry.map_or(NextAction::Stop, NextAction::RequeueAfter),
        )
        .mark(ProvisioningStatus::Orphaned),
        Outcome::Transient { retry, .. } => Transition::new(NextAction::RequeueAfter(retry)),
        // the delete table never yields OutOfInventory
        Outcome::OutOfInventory { .. } | Outcome::Unexpected(_) => {
            Transition::unexpected(ApiOperation::Delete, code)
        }
    }
}
