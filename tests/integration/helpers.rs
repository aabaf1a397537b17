//! Shared fixtures for integration tests

#![allow(dead_code)]

use serde_json::{Value, json};
use slo_reconciler::{ClientConfig, HttpGateway, ResourceData};
use wiremock::MockServer;

pub const ROOT_ID: &str = "0000000000000001";
pub const SLO_ID: &str = "00000000000001A0";

/// The minimal rolling SLO: p95 latency under 300ms over seven days
pub fn rolling_config() -> Value {
    json!({
        "name": "checkout-latency",
        "description": "p95<300ms",
        "signal_type": "Latency",
        "compliance": { "type": "Rolling", "target": 99, "size": "7d" },
        "indicator": {
            "evaluation_type": "Threshold",
            "query_type": "Metrics",
            "threshold": 300,
            "op": "LessThan",
            "aggregation": "p95",
            "size": "5m",
            "queries": [{
                "query_group_type": "Threshold",
                "query_group": [{ "row_id": "A", "query": "cpu" }]
            }]
        }
    })
}

pub fn rolling_state() -> ResourceData {
    ResourceData::from_value(rolling_config())
}

/// Same as [`rolling_config`] with a calendar window
pub fn calendar_state() -> ResourceData {
    let mut config = rolling_config();
    config["compliance"] = json!({ "type": "Calendar", "target": 99, "timezone": "UTC" });
    ResourceData::from_value(config)
}

/// A document as the server returns it for [`rolling_config`]
pub fn server_document(id: &str, version: i64) -> Value {
    json!({
        "id": id,
        "name": "checkout-latency",
        "description": "p95<300ms",
        "version": version,
        "createdAt": "2024-03-01T10:00:00Z",
        "createdBy": "0000000000000002",
        "modifiedAt": "2024-03-01T10:00:00Z",
        "modifiedBy": "0000000000000002",
        "parentId": ROOT_ID,
        "contentType": "slo",
        "type": "SlosLibrarySlo",
        "isSystem": false,
        "isMutable": true,
        "isLocked": false,
        "permissions": ["Read", "Update", "Delete"],
        "signalType": "Latency",
        "compliance": { "complianceType": "Rolling", "target": 99, "size": "7d" },
        "indicator": {
            "evaluationType": "Threshold",
            "queryType": "Metrics",
            "threshold": 300.0,
            "op": "LessThan",
            "aggregation": "p95",
            "size": "5m",
            "queries": [{
                "queryGroupType": "Threshold",
                "queryGroup": [{ "rowId": "A", "query": "cpu", "useRowCount": false }]
            }]
        }
    })
}

pub fn folder_document(id: &str) -> Value {
    json!({ "id": id, "name": "SLOs", "description": "Root folder" })
}

pub fn gateway_for(server: &MockServer) -> HttpGateway {
    let config = ClientConfig {
        api_url: format!("{}/api/v1", server.uri()),
        timeout_secs: 5,
        ..ClientConfig::default()
    };
    HttpGateway::new(&config).unwrap()
}
