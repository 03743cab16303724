//! Provider status vocabulary
//!
//! The provisioning API reports a server status as a free-form string. The
//! controller needs to match on that value exhaustively, so the known
//! vocabulary is a closed enum with an explicit string mapping; values the
//! API adds later survive a round trip through `Other`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Provider-reported server status, plus the controller-injected sentinels.
///
/// `Irreconcilable`, `Orphaned` and `Stale` are never reported by the
/// provisioning API; the controller writes them to record a permanent
/// failure, an unreachable remote resource, or a failed observation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ProvisioningStatus {
    /// No status observed yet (serializes as the empty string).
    #[default]
    Unspecified,
    /// Server is being provisioned.
    Creating,
    /// Server is up and running.
    PoweredOn,
    /// Server exists but is powered down.
    PoweredOff,
    /// Server is rebooting.
    Rebooting,
    /// Server OS configuration is being reset.
    Resetting,
    /// Server is being deprovisioned remotely.
    Deleting,
    /// Provider-side provisioning error.
    Error,
    /// Permanent mismatch between spec and provider; retry is pointless
    /// until the spec or external state changes.
    Irreconcilable,
    /// Remote resource unreachable or access denied; cleanup abandoned,
    /// record preserved pending investigation.
    Orphaned,
    /// Last observation failed transiently; previous values preserved but
    /// freshness is not guaranteed.
    Stale,
    /// Any status string this controller does not know about.
    Other(String),
}

impl ProvisioningStatus {
    /// External string form of this status.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Unspecified => "",
            Self::Creating => "creating",
            Self::PoweredOn => "powered-on",
            Self::PoweredOff => "powered-off",
            Self::Rebooting => "rebooting",
            Self::Resetting => "resetting",
            Self::Deleting => "deleting",
            Self::Error => "error",
            Self::Irreconcilable => "irreconcilable",
            Self::Orphaned => "orphaned",
            Self::Stale => "stale",
            Self::Other(s) => s,
        }
    }

    /// True if no status has been observed yet.
    #[must_use]
    pub fn is_unspecified(&self) -> bool {
        matches!(self, Self::Unspecified)
    }
}

impl From<&str> for ProvisioningStatus {
    fn from(s: &str) -> Self {
        match s {
            "" => Self::Unspecified,
            "creating" => Self::Creating,
            "powered-on" => Self::PoweredOn,
            "powered-off" => Self::PoweredOff,
            "rebooting" => Self::Rebooting,
            "resetting" => Self::Resetting,
            "deleting" => Self::Deleting,
            "error" => Self::Error,
            "irreconcilable" => Self::Irreconcilable,
            "orphaned" => Self::Orphaned,
            "stale" => Self::Stale,
            other => Self::Other(other.to_owned()),
        }
    }
}

impl From<String> for ProvisioningStatus {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl From<ProvisioningStatus> for String {
    fn from(status: ProvisioningStatus) -> Self {
        status.as_str().to_owned()
    }
}

impl fmt::Display for ProvisioningStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
