//! Response classification tables.
//!
//! Maps an HTTP status code, in the context of the operation that produced
//! it, to a reconciliation outcome. The tables are the contract with the
//! provisioning API: everything the state machine does downstream (status
//! sentinels, requeue delays, event emission) hangs off the [`Outcome`]
//! returned here.

use std::time::Duration;

/// Requeue interval used while a server is settling.
pub const REQUEUE_1MIN: Duration = Duration::from_secs(60);
/// Default short retry interval.
pub const REQUEUE_2MIN: Duration = Duration::from_secs(2 * 60);
/// Longer backoff for conditions that need external change.
pub const REQUEUE_5MIN: Duration = Duration::from_secs(5 * 60);

/// The remote operation a response belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiOperation {
    /// `POST /servers`
    Create,
    /// `GET /servers/{id}`
    Poll,
    /// `DELETE /servers/{id}`
    Delete,
}

impl ApiOperation {
    /// Lower-case operation name for logs and error messages.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Poll => "poll",
            Self::Delete => "delete",
        }
    }
}

/// Classified outcome of a provisioning API response.
///
/// A `retry` of `None` means the reconcile loop stops: only a future spec
/// change, external trigger, or manual intervention restarts it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The call succeeded; the body carries a status payload (create/poll).
    Success,
    /// Permanent failure; the record is marked `irreconcilable`.
    Permanent {
        /// Requeue interval, or `None` to stop retrying.
        retry: Option<Duration>,
    },
    /// The remote resource is unreachable or access was denied; the record
    /// is marked `orphaned`.
    Orphaned {
        /// Requeue interval, or `None` to stop retrying.
        retry: Option<Duration>,
    },
    /// No hardware inventory available right now (create only).
    OutOfInventory {
        /// Requeue interval.
        retry: Duration,
    },
    /// Temporary provider failure; retried without permanent status damage.
    Transient {
        /// Requeue interval.
        retry: Duration,
        /// Whether the record is marked `stale` (polling only).
        mark_stale: bool,
    },
    /// Status code outside the table; surfaced as a hard per-pass failure.
    Unexpected(u16),
}

/// Classifies an HTTP status code for the given operation.
#[must_use]
pub fn classify(operation: ApiOperation, code: u16) -> Outcome {
    match operation {
        ApiOperation::Create => match code {
            200 | 201 => Outcome::Success,
            // bad data, credentials, or authorization: spec replacement or
            // operator intervention required, stop polling
            400 | 401 | 403 | 404 => Outcome::Permanent { retry: None },
            // no inventory, back off and retry
            406 => Outcome::OutOfInventory { retry: REQUEUE_5MIN },
            // incompatible remote state
            409 => Outcome::Permanent {
                retry: Some(REQUEUE_2MIN),
            },
            500 => Outcome::Transient {
                retry: REQUEUE_2MIN,
                mark_stale: false,
            },
            other => Outcome::Unexpected(other),
        },
        ApiOperation::Poll => match code {
            200 | 201 => Outcome::Success,
            400 | 401 => Outcome::Permanent {
                retry: Some(REQUEUE_5MIN),
            },
            // access denied (the API also answers 403 for unknown ids)
            403 | 404 => Outcome::Orphaned { retry: None },
            500 => Outcome::Transient {
                retry: REQUEUE_5MIN,
                mark_stale: true,
            },
            other => Outcome::Unexpected(other),
        },
        ApiOperation::Delete => match code {
            200 | 201 | 202 | 204 => Outcome::Success,
            400 | 401 => Outcome::Permanent {
                retry: Some(REQUEUE_2MIN),
            },
            // cannot confirm deletion of an unreachable resource; keep the
            // record blocked rather than finalize on a guess
            403 | 404 => Outcome::Orphaned {
                retry: Some(REQUEUE_2MIN),
            },
            500 => Outcome::Transient {
                retry: REQUEUE_2MIN,
                mark_stale: false,
            },
            other => Outcome::Unexpected(other),
        },
    }
}
