//! Lifecycle against the HTTP gateway and a mock server
//!
//! These tests verify that:
//! - Create resolves the root folder and tags the payload as a new SLO
//! - Update sends the stored version and the update tag
//! - Server statuses map onto the error taxonomy
//! - Drift and idempotent delete hold over the wire

use std::error::Error;
use std::time::Duration;

use assert_matches::assert_matches;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use slo_reconciler::{
    ClientConfig, HttpGateway, ReadOutcome, ResourceData, ResourceState, SloError, SloGateway,
    SloResource, ViolationKind, cancellation,
};
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::helpers::{
    ROOT_ID, SLO_ID, calendar_state, folder_document, gateway_for, rolling_state, server_document,
};

async fn mount_read(server: &MockServer, document: Value) {
    Mock::given(method("GET"))
        .and(path(format!("/api/v1/slos/{SLO_ID}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(document))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_create_rolling_slo() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/sloLibraryFolders/root"))
        .respond_with(ResponseTemplate::new(200).set_body_json(folder_document(ROOT_ID)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/slos"))
        .and(query_param("parentId", ROOT_ID))
        .and(body_partial_json(json!({
            "name": "checkout-latency",
            "type": "SlosLibrarySlo",
            "contentType": "slo",
            "parentId": ROOT_ID,
            "compliance": { "complianceType": "Rolling", "target": 99, "size": "7d" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": SLO_ID })))
        .expect(1)
        .mount(&server)
        .await;
    mount_read(&server, server_document(SLO_ID, 0)).await;

    let resource = SloResource::new(gateway_for(&server));
    let mut state = rolling_state();
    resource.create(&mut state).await.unwrap();

    assert_eq!(state.id(), SLO_ID);
    assert_eq!(state.get("created_at"), Some(&json!("2024-03-01T10:00:00Z")));
    assert_eq!(state.get("parent_id"), Some(&json!(ROOT_ID)));
    assert_eq!(state.get("is_mutable"), Some(&json!(true)));
}

#[tokio::test]
async fn test_create_calendar_slo_omits_size() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/sloLibraryFolders/root"))
        .respond_with(ResponseTemplate::new(200).set_body_json(folder_document(ROOT_ID)))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/slos"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": SLO_ID })))
        .expect(1)
        .mount(&server)
        .await;
    let mut document = server_document(SLO_ID, 0);
    document["compliance"] = json!({ "complianceType": "Calendar", "target": 99, "timezone": "UTC" });
    mount_read(&server, document).await;

    let resource = SloResource::new(gateway_for(&server));
    let mut state = calendar_state();
    resource.create(&mut state).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let create = requests
        .iter()
        .find(|r| r.method.as_str() == "POST")
        .unwrap();
    let body: Value = serde_json::from_slice(&create.body).unwrap();

    assert_eq!(
        body["compliance"],
        json!({ "complianceType": "Calendar", "target": 99, "timezone": "UTC" })
    );
    assert_eq!(
        state.get("compliance"),
        Some(&json!({ "type": "Calendar", "target": 99, "timezone": "UTC" }))
    );
}

#[tokio::test]
async fn test_invalid_aggregation_sends_nothing() {
    let server = MockServer::start().await;
    let mut values = rolling_state().into_values();
    values["indicator"]["aggregation"] = json!("p42");
    let mut state = ResourceData::new(values);

    let resource = SloResource::new(gateway_for(&server));
    let err = resource.create(&mut state).await.unwrap_err();

    assert_eq!(err.violations()[0].path, "indicator.aggregation");
    assert_matches!(err.violations()[0].kind, ViolationKind::PatternMismatch { .. });
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_read_404_is_drift() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/slos/abc"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let resource = SloResource::new(gateway_for(&server));
    let mut state = ResourceData::with_id("abc", rolling_state().into_values());

    let outcome = resource.read(&mut state).await.unwrap();

    assert_eq!(outcome, ReadOutcome::Absent);
    assert_eq!(state.id(), "");
}

#[tokio::test]
async fn test_update_sends_version_and_update_kind() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path(format!("/api/v1/slos/{SLO_ID}")))
        .and(body_partial_json(json!({
            "id": SLO_ID,
            "type": "SlosLibrarySloUpdate",
            "version": 3,
            "description": "p95<250ms"
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    let mut document = server_document(SLO_ID, 4);
    document["description"] = json!("p95<250ms");
    mount_read(&server, document).await;

    let resource = SloResource::new(gateway_for(&server));
    let mut state = ResourceData::with_id(SLO_ID, rolling_state().into_values());
    state.set("version", json!(3)).unwrap();
    state.set("description", json!("p95<250ms")).unwrap();

    resource.update(&mut state).await.unwrap();

    assert_eq!(state.get("version"), Some(&json!(4)));
}

#[tokio::test]
async fn test_update_conflict_is_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path(format!("/api/v1/slos/{SLO_ID}")))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "errors": [{ "code": "slo:version_mismatch", "message": "stale version" }]
        })))
        .mount(&server)
        .await;

    let resource = SloResource::new(gateway_for(&server));
    let mut state = ResourceData::with_id(SLO_ID, rolling_state().into_values());

    let err = resource.update(&mut state).await.unwrap_err();

    assert_matches!(err, SloError::Conflict(ref msg) if msg == "slo:version_mismatch: stale version");
}

#[tokio::test]
async fn test_delete_404_is_success() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path(format!("/api/v1/slos/{SLO_ID}")))
        .respond_with(ResponseTemplate::new(404))
        .expect(2)
        .mount(&server)
        .await;

    let resource = SloResource::new(gateway_for(&server));
    let state = ResourceData::with_id(SLO_ID, rolling_state().into_values());

    resource.delete(&state).await.unwrap();
    resource.delete(&state).await.unwrap();
}

#[tokio::test]
async fn test_server_validation_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/slos"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "errors": [{ "code": "slo:invalid", "message": "size must be at most 14d" }]
        })))
        .mount(&server)
        .await;

    let gateway = gateway_for(&server);
    let slo = slo_reconciler::codec::decode(&rolling_state(), slo_reconciler::SloKind::SlosLibrarySlo)
        .unwrap();

    let err = gateway.create_slo(&slo, ROOT_ID).await.unwrap_err();

    assert_eq!(err.violations()[0].path, "<server>");
    assert_matches!(
        err.violations()[0].kind,
        ViolationKind::Rejected { ref message } if message == "slo:invalid: size must be at most 14d"
    );
}

#[tokio::test]
async fn test_unexpected_status_is_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/api/v1/slos/{SLO_ID}")))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let err = gateway_for(&server).read_slo(SLO_ID).await.unwrap_err();

    assert_matches!(
        err,
        SloError::Transport { status: Some(503), ref message, .. } if message == "maintenance"
    );
}

#[tokio::test]
async fn test_malformed_document_is_decode_error() {
    let server = MockServer::start().await;
    mount_read(&server, json!({ "id": SLO_ID, "name": 42 })).await;

    let err = gateway_for(&server).read_slo(SLO_ID).await.unwrap_err();

    assert_matches!(err, SloError::Decode(_));
}

#[tokio::test]
async fn test_credentials_are_sent_as_basic_auth() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/sloLibraryFolders/root"))
        .and(header("Authorization", "Basic aWQ6a2V5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(folder_document(ROOT_ID)))
        .expect(1)
        .mount(&server)
        .await;

    let config = ClientConfig {
        api_url: format!("{}/api/v1", server.uri()),
        access_id: Some("id".to_string()),
        access_key: Some("key".to_string()),
        ..ClientConfig::default()
    };
    let gateway = HttpGateway::new(&config).unwrap();

    let folder = gateway.get_folder("root").await.unwrap();
    assert_eq!(folder.id, ROOT_ID);
}

#[tokio::test]
async fn test_cancellation_drops_slow_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/api/v1/slos/{SLO_ID}")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(server_document(SLO_ID, 0))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let (handle, signal) = cancellation();
    let resource = SloResource::with_cancellation(gateway_for(&server), signal);
    let mut state = ResourceData::with_id(SLO_ID, rolling_state().into_values());
    let before = state.clone();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.cancel();
    });

    let err = tokio::time::timeout(Duration::from_secs(2), resource.read(&mut state))
        .await
        .unwrap()
        .unwrap_err();

    assert_matches!(err, SloError::Cancelled);
    assert_eq!(state, before);
}

#[tokio::test]
async fn test_root_folder_failure_is_surfaced() {
    for (status, not_found) in [(404, true), (503, false)] {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/sloLibraryFolders/root"))
            .respond_with(ResponseTemplate::new(status))
            .expect(1)
            .mount(&server)
            .await;

        let resource = SloResource::new(gateway_for(&server));
        let mut state = rolling_state();

        let err = resource.create(&mut state).await.unwrap_err();

        if not_found {
            assert_matches!(err, SloError::NotFound { resource: "folder", ref id } if id == "root");
        } else {
            assert_matches!(err, SloError::Transport { status: Some(503), .. });
        }
        let requests = server.received_requests().await.unwrap();
        assert!(requests.iter().all(|r| r.method.as_str() == "GET"));
        assert_eq!(state.id(), "");
    }
}

#[tokio::test]
async fn test_connection_failure_keeps_its_cause() {
    let config = ClientConfig {
        api_url: "http://127.0.0.1:1/api/v1".to_string(),
        timeout_secs: 5,
        ..ClientConfig::default()
    };
    let gateway = HttpGateway::new(&config).unwrap();

    let err = gateway.read_slo("abc").await.unwrap_err();

    assert_matches!(err, SloError::Transport { status: None, .. });
    let client_error = err.source().unwrap();
    assert!(client_error.source().is_some());
}

#[tokio::test]
async fn test_ids_with_reserved_characters_stay_in_one_segment() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/v1/slos/a%2Fb"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    gateway_for(&server).delete_slo("a/b").await.unwrap();
}
