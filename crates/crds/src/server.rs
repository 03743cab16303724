//! Server CRD
//!
//! Declares a desired bare-metal server on the BMC provisioning API. The
//! spec is write-once: an admission webhook rejects mutations after creation,
//! so the controller only ever reads it. The status mirrors the provisioning
//! API's server payload and is fully overwritten on every successful create
//! or poll response.

use crate::status::ProvisioningStatus;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Annotation holding the remote BMC server identifier. Its absence means
/// the server has not been created on the provider yet.
pub const SERVER_ID_ANNOTATION: &str = "bmc.microscaler.io/server-id";

/// Finalizer blocking physical removal of a Server record until remote
/// cleanup has run (or the resource was determined to be orphaned).
pub const SERVER_FINALIZER: &str = "servers.bmc.microscaler.io/cleanup";

/// Desired state of a bare-metal server.
///
/// Field defaults match the admission defaulter, so a record created without
/// them deserializes to the same spec the webhook would have produced.
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "bmc.microscaler.io",
    version = "v1",
    kind = "Server",
    namespaced,
    status = "ServerStatus",
    printcolumn = r#"{"name":"Status","type":"string","jsonPath":".status.status"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ServerSpec {
    /// Hostname of the server (required, immutable).
    pub hostname: String,

    /// Free-text description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// OS image installed on the server.
    #[serde(default)]
    pub os: OsImage,

    /// Hardware flavor to allocate.
    #[serde(rename = "type", default)]
    pub machine_type: MachineType,

    /// Data center location the server is created in.
    #[serde(default)]
    pub location: Location,

    /// Whether to install account-default SSH keys in addition to any keys
    /// listed on this resource.
    #[serde(default = "default_install_default_ssh_keys")]
    pub install_default_ssh_keys: bool,

    /// BMC resource IDs of additional SSH keys to install.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ssh_key_ids: Vec<String>,

    /// Network topology the server attaches to.
    #[serde(default)]
    pub network_type: NetworkType,
}

fn default_install_default_ssh_keys() -> bool {
    true
}

/// OS image identifiers accepted by the provisioning API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub enum OsImage {
    /// Ubuntu 18.04 LTS.
    #[default]
    #[serde(rename = "ubuntu/bionic")]
    UbuntuBionic,
    /// CentOS 7.
    #[serde(rename = "centos/centos7")]
    CentosCentos7,
}

/// Hardware flavors accepted by the provisioning API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub enum MachineType {
    /// Small single-CPU flavor (the admission default).
    #[default]
    #[serde(rename = "s1.c1.small")]
    S1C1Small,
    #[serde(rename = "s1.c1.medium")]
    S1C1Medium,
    #[serde(rename = "s1.c2.medium")]
    S1C2Medium,
    #[serde(rename = "s1.c2.large")]
    S1C2Large,
    #[serde(rename = "d1.c1.small")]
    D1C1Small,
    #[serde(rename = "d1.c2.small")]
    D1C2Small,
    #[serde(rename = "d1.c3.small")]
    D1C3Small,
    #[serde(rename = "d1.c4.small")]
    D1C4Small,
    #[serde(rename = "d1.c1.medium")]
    D1C1Medium,
    #[serde(rename = "d1.c2.medium")]
    D1C2Medium,
    #[serde(rename = "d1.c3.medium")]
    D1C3Medium,
    #[serde(rename = "d1.c4.medium")]
    D1C4Medium,
    #[serde(rename = "d1.c1.large")]
    D1C1Large,
    #[serde(rename = "d1.c2.large")]
    D1C2Large,
    #[serde(rename = "d1.c3.large")]
    D1C3Large,
    #[serde(rename = "d1.c4.large")]
    D1C4Large,
    #[serde(rename = "d1.m1.medium")]
    D1M1Medium,
    #[serde(rename = "d1.m2.medium")]
    D1M2Medium,
    #[serde(rename = "d1.m3.medium")]
    D1M3Medium,
    #[serde(rename = "d1.m4.medium")]
    D1M4Medium,
}

/// BMC data center regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub enum Location {
    /// Phoenix (the admission default).
    #[default]
    #[serde(rename = "PHX")]
    Phoenix,
    /// Ashburn.
    #[serde(rename = "ASH")]
    Ashburn,
    /// Singapore.
    #[serde(rename = "SGP")]
    Singapore,
    /// Amsterdam.
    #[serde(rename = "NLD")]
    Amsterdam,
}

/// Network topology selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub enum NetworkType {
    /// Public and private networks (the admission default).
    #[default]
    #[serde(rename = "PUBLIC_AND_PRIVATE")]
    PublicAndPrivate,
    /// Private networks only.
    #[serde(rename = "PRIVATE_ONLY")]
    PrivateOnly,
}

/// Observed state of a server.
///
/// This is also the JSON payload shape returned by the provisioning API on
/// create and poll, which is why the field names carry the API's wire names
/// rather than Kubernetes conventions. Every field serializes even when
/// empty so a status patch fully overwrites the previous observation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServerStatus {
    /// Remote BMC server identifier.
    #[serde(default, rename = "id")]
    pub server_id: String,

    /// Provider status string, including the controller sentinels.
    #[serde(default, rename = "status")]
    #[schemars(with = "String")]
    pub status: ProvisioningStatus,

    /// CPU model.
    #[serde(default)]
    pub cpu: String,

    /// Number of CPUs.
    #[serde(default)]
    pub cpu_count: i32,

    /// Cores per CPU.
    #[serde(default, rename = "coresPerCpu")]
    pub cores_per_cpu: i32,

    /// CPU frequency in GHz.
    #[serde(default)]
    pub cpu_frequency: f64,

    /// RAM size descriptor (e.g. "64GB RAM").
    #[serde(default)]
    pub ram: String,

    /// Storage descriptor (e.g. "1x 960GB NVMe").
    #[serde(default)]
    pub storage: String,

    /// Private IP addresses assigned to the server.
    #[serde(default)]
    pub private_ip_addresses: Vec<String>,

    /// Public IP addresses assigned to the server.
    #[serde(default)]
    pub public_ip_addresses: Vec<String>,
}
