//! Unit tests for the reconciliation state machine
//!
//! Exercises the full decision procedure against the scenarios the
//! controller sees in production: first provisioning, settling, provider
//! outages, orphaned resources, and cleanup on deletion.

use crate::classifier::{REQUEUE_1MIN, REQUEUE_2MIN, REQUEUE_5MIN};
use crate::test_utils::{create_provisioned_server, create_test_server, mark_deleted};
use crate::transition::{
    on_create_response, on_delete_response, on_delete_skipped, on_poll_response,
    on_poll_transport_failure, remote_cleanup_target, select_branch, Branch, EventReason,
    NextAction, StatusUpdate, TransitionFailure,
};
use crds::{ProvisioningStatus, ServerStatus, SERVER_ID_ANNOTATION};
use kube::{Resource, ResourceExt};

fn branch_for(server: &crds::Server) -> Branch {
    select_branch(
        server.meta().deletion_timestamp.is_some(),
        server
            .annotations()
            .get(SERVER_ID_ANNOTATION)
            .map(String::as_str),
    )
}

#[test]
fn fresh_server_takes_the_create_branch() {
    let server = create_test_server("worker-0");
    assert_eq!(branch_for(&server), Branch::Create);
}

#[test]
fn recorded_id_takes_the_poll_branch_never_create() {
    // Once the id annotation is durable, re-invocation must never create a
    // second machine, whatever the status says.
    for status in [
        ProvisioningStatus::Creating,
        ProvisioningStatus::PoweredOn,
        ProvisioningStatus::Stale,
        ProvisioningStatus::Error,
    ] {
        let server = create_provisioned_server("worker-0", "srv-1", status);
        assert_eq!(branch_for(&server), Branch::Poll("srv-1".to_owned()));
    }
}

#[test]
fn deletion_intent_wins_over_everything() {
    let server = mark_deleted(create_provisioned_server(
        "worker-0",
        "srv-1",
        ProvisioningStatus::PoweredOn,
    ));
    assert_eq!(branch_for(&server), Branch::Delete);

    // even a never-provisioned record goes to the delete branch
    let fresh = mark_deleted(create_test_server("worker-1"));
    assert_eq!(branch_for(&fresh), Branch::Delete);
}

#[test]
fn empty_annotation_counts_as_unprovisioned() {
    assert_eq!(select_branch(false, Some("")), Branch::Create);
}

#[test]
fn successful_create_records_id_and_settles_into_polling() {
    let body = serde_json::json!({"id": "srv-1", "status": "creating"});
    let transition = on_create_response(201, &serde_json::to_vec(&body).unwrap());

    assert_eq!(transition.record_server_id.as_deref(), Some("srv-1"));
    assert_eq!(transition.next, NextAction::RequeueAfter(REQUEUE_1MIN));
    assert!(transition.failure.is_none());
    assert!(!transition.clear_finalizer);

    let StatusUpdate::Replace(status) = &transition.update else {
        panic!("create success must replace the whole status");
    };
    assert_eq!(status.server_id, "srv-1");
    assert_eq!(status.status, ProvisioningStatus::Creating);

    assert_eq!(transition.notifications.len(), 1);
    assert_eq!(transition.notifications[0].reason, EventReason::Created);
    assert_eq!(transition.notifications[0].message, "Created BMC server srv-1");
}

#[test]
fn create_with_unparseable_body_surfaces_an_error() {
    let transition = on_create_response(200, b"not json");
    assert!(matches!(
        transition.failure,
        Some(TransitionFailure::MalformedBody(_))
    ));
    // no id was extracted, so nothing must be recorded
    assert!(transition.record_server_id.is_none());
    assert_eq!(transition.next, NextAction::RequeueAfter(REQUEUE_2MIN));
}

#[test]
fn create_body_without_an_id_never_records_the_annotation() {
    // recording an empty id would route the next pass back to the create
    // branch and double-provision
    for body in [
        serde_json::json!({"status": "creating"}),
        serde_json::json!({"id": "", "status": "creating"}),
    ] {
        let transition = on_create_response(201, &serde_json::to_vec(&body).unwrap());
        assert!(transition.record_server_id.is_none());
        assert!(matches!(
            transition.failure,
            Some(TransitionFailure::MalformedBody(_))
        ));
        assert_eq!(transition.next, NextAction::RequeueAfter(REQUEUE_2MIN));
        assert_eq!(transition.notifications[0].reason, EventReason::CreateError);
    }
}

#[test]
fn permanent_create_failure_marks_irreconcilable_and_stops() {
    for code in [400, 401, 403, 404] {
        let transition = on_create_response(code, b"");
        assert_eq!(
            transition.update,
            StatusUpdate::Mark(ProvisioningStatus::Irreconcilable)
        );
        assert_eq!(transition.next, NextAction::Stop);
        assert!(transition.failure.is_none());
        assert_eq!(
            transition.notifications[0].reason,
            EventReason::CreateErrorPermanent
        );
        assert_eq!(transition.notifications[0].message, format!("Code: {code}"));
    }
}

#[test]
fn out_of_inventory_backs_off_without_damage() {
    let transition = on_create_response(406, b"");
    assert_eq!(transition.update, StatusUpdate::Keep);
    assert_eq!(transition.next, NextAction::RequeueAfter(REQUEUE_5MIN));
    assert!(transition.failure.is_none());
    assert!(transition.record_server_id.is_none());
    assert_eq!(
        transition.notifications[0].reason,
        EventReason::CreateErrorInventory
    );
}

#[test]
fn conflicting_create_retries_on_the_short_interval() {
    let transition = on_create_response(409, b"");
    assert_eq!(
        transition.update,
        StatusUpdate::Mark(ProvisioningStatus::Irreconcilable)
    );
    assert_eq!(transition.next, NextAction::RequeueAfter(REQUEUE_2MIN));
}

#[test]
fn transient_create_failure_is_surfaced_with_a_retry() {
    let transition = on_create_response(500, b"");
    assert_eq!(transition.update, StatusUpdate::Keep);
    assert_eq!(transition.next, NextAction::RequeueAfter(REQUEUE_2MIN));
    assert_eq!(
        transition.failure,
        Some(TransitionFailure::ServiceUnavailable(500))
    );
    assert_eq!(
        transition.notifications[0].reason,
        EventReason::CreateServerFailure
    );
}

#[test]
fn unexpected_create_code_is_a_hard_failure() {
    let transition = on_create_response(302, b"");
    assert_eq!(
        transition.failure,
        Some(TransitionFailure::UnexpectedResponse(302))
    );
    assert_eq!(transition.next, NextAction::Stop);
}

fn poll_body(id: &str, status: &str) -> Vec<u8> {
    serde_json::to_vec(&serde_json::json!({"id": id, "status": status})).unwrap()
}

#[test]
fn powered_on_servers_poll_on_the_relaxed_interval() {
    let transition = on_poll_response(
        &ProvisioningStatus::PoweredOn,
        200,
        &poll_body("srv-1", "powered-on"),
    );
    assert_eq!(transition.next, NextAction::RequeueAfter(REQUEUE_2MIN));
    // status did not change, so no notification fires
    assert!(transition.notifications.is_empty());
}

#[test]
fn converging_servers_poll_on_the_tight_interval() {
    for status in ["creating", "rebooting", "resetting", "powered-off"] {
        let transition = on_poll_response(
            &ProvisioningStatus::Creating,
            200,
            &poll_body("srv-1", status),
        );
        assert_eq!(transition.next, NextAction::RequeueAfter(REQUEUE_1MIN));
    }
}

#[test]
fn status_change_fires_exactly_once() {
    let body = poll_body("srv-1", "powered-on");

    let first = on_poll_response(&ProvisioningStatus::Creating, 200, &body);
    assert_eq!(first.notifications.len(), 1);
    assert_eq!(first.notifications[0].reason, EventReason::StatusChange);
    assert_eq!(first.notifications[0].message, "creating -> powered-on");

    // re-observing the same status is silent
    let second = on_poll_response(&ProvisioningStatus::PoweredOn, 200, &body);
    assert!(second.notifications.is_empty());
}

#[test]
fn poll_success_replaces_the_whole_status() {
    let body = serde_json::to_vec(&serde_json::json!({
        "id": "srv-1",
        "status": "powered-on",
        "cpu": "Gold 6258R",
        "publicIpAddresses": ["203.0.113.5"]
    }))
    .unwrap();
    let transition = on_poll_response(&ProvisioningStatus::Creating, 200, &body);
    let StatusUpdate::Replace(status) = &transition.update else {
        panic!("poll success must replace the whole status");
    };
    assert_eq!(status.cpu, "Gold 6258R");
    assert_eq!(status.public_ip_addresses, vec!["203.0.113.5"]);
}

#[test]
fn denied_poll_orphans_the_record_and_stops() {
    for code in [403, 404] {
        let transition =
            on_poll_response(&ProvisioningStatus::PoweredOn, code, b"");
        assert_eq!(
            transition.update,
            StatusUpdate::Mark(ProvisioningStatus::Orphaned)
        );
        assert_eq!(transition.next, NextAction::Stop);
        assert!(transition.failure.is_none());
        assert_eq!(
            transition.notifications[0].reason,
            EventReason::ResourceOrphaned
        );
        assert_eq!(
            transition.notifications[0].message,
            "Access to BMC resource was denied"
        );
    }
}

#[test]
fn bad_poll_request_marks_irreconcilable_with_a_long_retry() {
    for code in [400, 401] {
        let transition = on_poll_response(&ProvisioningStatus::PoweredOn, code, b"");
        assert_eq!(
            transition.update,
            StatusUpdate::Mark(ProvisioningStatus::Irreconcilable)
        );
        assert_eq!(transition.next, NextAction::RequeueAfter(REQUEUE_5MIN));
    }
}

#[test]
fn transient_poll_failure_marks_stale() {
    let transition = on_poll_response(&ProvisioningStatus::PoweredOn, 500, b"");
    assert_eq!(
        transition.update,
        StatusUpdate::Mark(ProvisioningStatus::Stale)
    );
    assert_eq!(transition.next, NextAction::RequeueAfter(REQUEUE_5MIN));
    assert_eq!(transition.notifications[0].reason, EventReason::PollingFailure);
}

#[test]
fn poll_transport_failure_degrades_to_stale_and_surfaces() {
    let transition =
        on_poll_transport_failure(&ProvisioningStatus::PoweredOn, "connection refused");
    assert_eq!(
        transition.update,
        StatusUpdate::Mark(ProvisioningStatus::Stale)
    );
    assert_eq!(transition.next, NextAction::RequeueAfter(REQUEUE_2MIN));
    assert_eq!(
        transition.failure,
        Some(TransitionFailure::Transport("connection refused".to_owned()))
    );
    assert_eq!(transition.notifications[0].reason, EventReason::StatusChange);

    // a repeat outage does not spam status-change notifications
    let repeat = on_poll_transport_failure(&ProvisioningStatus::Stale, "connection refused");
    assert!(repeat.notifications.is_empty());
}

#[test]
fn orphaned_records_skip_remote_cleanup() {
    assert_eq!(
        remote_cleanup_target(&ProvisioningStatus::Orphaned, Some("srv-1")),
        None
    );
    assert_eq!(
        remote_cleanup_target(&ProvisioningStatus::PoweredOn, None),
        None
    );
    assert_eq!(
        remote_cleanup_target(&ProvisioningStatus::PoweredOn, Some("")),
        None
    );
    assert_eq!(
        remote_cleanup_target(&ProvisioningStatus::PoweredOn, Some("srv-1")),
        Some("srv-1")
    );
}

#[test]
fn skipped_cleanup_releases_the_finalizer_immediately() {
    let transition = on_delete_skipped();
    assert!(transition.clear_finalizer);
    assert_eq!(transition.next, NextAction::Stop);
    assert!(transition.notifications.is_empty());
    assert!(transition.failure.is_none());
}

#[test]
fn successful_cleanup_releases_the_finalizer() {
    for code in [200, 201, 202, 204] {
        let transition = on_delete_response(code, "srv-1");
        assert!(transition.clear_finalizer);
        assert_eq!(transition.next, NextAction::Stop);
        assert_eq!(
            transition.notifications[0].reason,
            EventReason::CleanupSuccess
        );
        assert_eq!(
            transition.notifications[0].message,
            "Deleted BMC server srv-1"
        );
    }
}

#[test]
fn failed_cleanup_keeps_deletion_blocked() {
    // the finalizer only ever comes off on confirmed success
    for code in [400, 401, 403, 404, 500] {
        let transition = on_delete_response(code, "srv-1");
        assert!(!transition.clear_finalizer, "code {code} must keep the finalizer");
        assert_eq!(transition.next, NextAction::RequeueAfter(REQUEUE_2MIN));
    }

    // an unclassifiable code is surfaced and leaves retry to the scheduler
    let transition = on_delete_response(418, "srv-1");
    assert!(!transition.clear_finalizer);
    assert_eq!(
        transition.failure,
        Some(TransitionFailure::UnexpectedResponse(418))
    );
}

#[test]
fn unreachable_cleanup_target_is_marked_orphaned() {
    for code in [403, 404] {
        let transition = on_delete_response(code, "srv-1");
        assert_eq!(
            transition.update,
            StatusUpdate::Mark(ProvisioningStatus::Orphaned)
        );
        // the next pass skips remote cleanup and releases the finalizer
        assert_eq!(
            remote_cleanup_target(&ProvisioningStatus::Orphaned, Some("srv-1")),
            None
        );
    }
}

#[test]
fn full_lifecycle_settles_and_tears_down() {
    // create
    let created = on_create_response(201, &poll_body("srv-9", "creating"));
    assert_eq!(created.record_server_id.as_deref(), Some("srv-9"));

    // converge
    let converging = on_poll_response(
        &ProvisioningStatus::Creating,
        200,
        &poll_body("srv-9", "creating"),
    );
    assert_eq!(converging.next, NextAction::RequeueAfter(REQUEUE_1MIN));
    assert!(converging.notifications.is_empty());

    // settle
    let settled = on_poll_response(
        &ProvisioningStatus::Creating,
        200,
        &poll_body("srv-9", "powered-on"),
    );
    assert_eq!(settled.next, NextAction::RequeueAfter(REQUEUE_2MIN));

    // delete
    let deleted = on_delete_response(200, "srv-9");
    assert!(deleted.clear_finalizer);
}

#[tokio::test]
async fn provisioning_calls_create_exactly_once() {
    use bmc_client::{ApiResponse, BmcApi, MockBmcClient, MockCall};

    let mock = MockBmcClient::new();
    mock.queue_create(Ok(ApiResponse::new(201, poll_body("srv-1", "creating"))));
    mock.queue_get(Ok(ApiResponse::new(200, poll_body("srv-1", "powered-on"))));

    // first pass: no recorded id, so the create branch runs
    let Branch::Create = select_branch(false, None) else {
        panic!("expected the create branch");
    };
    let response = mock
        .create_server(&serde_json::json!({"hostname": "worker-0"}))
        .await
        .unwrap();
    let transition = on_create_response(response.code, &response.body);
    let id = transition.record_server_id.unwrap();

    // second pass: the persisted id routes to polling, not creation
    let Branch::Poll(target) = select_branch(false, Some(&id)) else {
        panic!("expected the poll branch");
    };
    let response = mock.get_server(&target).await.unwrap();
    let transition = on_poll_response(&ProvisioningStatus::Creating, response.code, &response.body);
    assert_eq!(transition.next, NextAction::RequeueAfter(REQUEUE_2MIN));

    let creates = mock
        .calls()
        .iter()
        .filter(|c| matches!(c, MockCall::Create(_)))
        .count();
    assert_eq!(creates, 1);
}

#[test]
fn status_payload_parses_sentinel_free() {
    // sentinel strings are reserved for the controller; the API never
    // returns them, but a payload carrying one still round-trips
    let status: ServerStatus =
        serde_json::from_slice(&poll_body("srv-1", "stale")).unwrap();
    assert_eq!(status.status, ProvisioningStatus::Stale);
}
