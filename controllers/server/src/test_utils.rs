//! Test utilities for unit testing the reconciliation logic
//!
//! This module provides helpers for creating Server records in the shapes
//! the reconcile loop encounters: fresh records, records with a recorded
//! remote identifier, and records awaiting deletion.

use crds::{ProvisioningStatus, Server, ServerSpec, ServerStatus, SERVER_FINALIZER, SERVER_ID_ANNOTATION};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, Time};
use std::collections::BTreeMap;

/// Helper to create a test Server record.
pub fn create_test_server(name: &str) -> Server {
    Server {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some("default".to_string()),
            ..Default::default()
        },
        spec: ServerSpec {
            hostname: name.to_string(),
            description: None,
            os: Default::default(),
            machine_type: Default::default(),
            location: Default::default(),
            install_default_ssh_keys: true,
            ssh_key_ids: Vec::new(),
            network_type: Default::default(),
        },
        status: None,
    }
}

/// Helper to create a Server that has been provisioned: the remote id is
/// recorded in the annotation, the finalizer is attached, and the status
/// carries the given provider status.
pub fn create_provisioned_server(name: &str, server_id: &str, status: ProvisioningStatus) -> Server {
    let mut server = create_test_server(name);
    server.metadata.annotations = Some(BTreeMap::from([(
        SERVER_ID_ANNOTATION.to_string(),
        server_id.to_string(),
    )]));
    server.metadata.finalizers = Some(vec![SERVER_FINALIZER.to_string()]);
    server.status = Some(ServerStatus {
        server_id: server_id.to_string(),
        status,
        ..Default::default()
    });
    server
}

/// Helper to mark a Server as awaiting deletion.
pub fn mark_deleted(mut server: Server) -> Server {
    server.metadata.deletion_timestamp = Some(Time(Default::default()));
    server
}
