//! Full reconciliation cycles against the in-memory gateway

use pretty_assertions::assert_eq;
use serde_json::json;
use slo_reconciler::gateway::{GatewayCall, ROOT_FOLDER_ID};
use slo_reconciler::plan::{Plan, plan};
use slo_reconciler::{MemoryGateway, ReadOutcome, ResourceData, ResourceState, SloKind, SloResource};

use crate::helpers::{calendar_state, rolling_state};

#[tokio::test]
async fn test_create_update_drift_recreate_delete() {
    let gateway = MemoryGateway::new();
    let resource = SloResource::new(gateway.clone());
    let mut state = rolling_state();

    assert_eq!(plan(&state, None).unwrap(), Plan::Create);
    resource.create(&mut state).await.unwrap();
    let first_id = state.id().to_string();

    // a fresh read matches the configuration
    let observed = resource.read(&mut state).await.unwrap().into_slo();
    assert_eq!(plan(&state, observed.as_ref()).unwrap(), Plan::NoOp);

    // change the target
    state
        .set("compliance", json!({ "type": "Rolling", "target": 95, "size": "7d" }))
        .unwrap();
    assert_eq!(
        plan(&state, observed.as_ref()).unwrap(),
        Plan::Update(vec!["compliance"])
    );
    resource.update(&mut state).await.unwrap();
    assert_eq!(gateway.get(&first_id).await.unwrap().compliance.target, 95);
    assert_eq!(state.get("version"), Some(&json!(1)));

    // deleted behind our back
    gateway.forget(&first_id).await;
    let outcome = resource.read(&mut state).await.unwrap();
    assert!(outcome.is_absent());
    assert_eq!(plan(&state, None).unwrap(), Plan::Create);

    resource.create(&mut state).await.unwrap();
    assert_ne!(state.id(), first_id);
    assert_eq!(gateway.len().await, 1);

    resource.delete(&state).await.unwrap();
    assert!(gateway.is_empty().await);
}

#[tokio::test]
async fn test_every_payload_carries_the_right_kind() {
    let gateway = MemoryGateway::new();
    let resource = SloResource::new(gateway.clone());
    let mut state = calendar_state();

    resource.create(&mut state).await.unwrap();
    resource.update(&mut state).await.unwrap();
    resource.update(&mut state).await.unwrap();

    let kinds: Vec<SloKind> = gateway
        .calls()
        .await
        .into_iter()
        .filter_map(|call| match call {
            GatewayCall::Create { kind, .. } | GatewayCall::Update { kind, .. } => Some(kind),
            _ => None,
        })
        .collect();

    assert_eq!(
        kinds,
        vec![
            SloKind::SlosLibrarySlo,
            SloKind::SlosLibrarySloUpdate,
            SloKind::SlosLibrarySloUpdate
        ]
    );
}

#[tokio::test]
async fn test_create_on_bound_handle_only_refreshes() {
    let gateway = MemoryGateway::new();
    let resource = SloResource::new(gateway.clone());
    let mut state = rolling_state();
    resource.create(&mut state).await.unwrap();
    let id = state.id().to_string();

    resource.create(&mut state).await.unwrap();

    assert_eq!(state.id(), id);
    assert_eq!(gateway.len().await, 1);
    assert_eq!(gateway.calls().await.last(), Some(&GatewayCall::Read(id)));
}

#[tokio::test]
async fn test_import_then_plan_is_noop() {
    let gateway = MemoryGateway::new();
    let resource = SloResource::new(gateway.clone());
    let mut original = rolling_state();
    resource.create(&mut original).await.unwrap();

    let mut imported = ResourceData::default();
    let slo = resource.import(&mut imported, original.id()).await.unwrap();

    assert_eq!(slo.parent_id, ROOT_FOLDER_ID);
    assert_eq!(plan(&imported, Some(&slo)).unwrap(), Plan::NoOp);
}

#[tokio::test]
async fn test_read_of_unbound_handle_makes_no_call() {
    let gateway = MemoryGateway::new();
    let resource = SloResource::new(gateway.clone());
    let mut state = rolling_state();

    assert_eq!(resource.read(&mut state).await.unwrap(), ReadOutcome::Absent);
    assert!(gateway.calls().await.is_empty());
}

#[tokio::test]
async fn test_removing_lock_from_config_plans_an_update() {
    let gateway = MemoryGateway::new();
    let resource = SloResource::new(gateway.clone());
    let mut config = rolling_state().into_values();
    config.insert("is_locked".into(), json!(true));
    let mut state = ResourceData::new(config);
    resource.create(&mut state).await.unwrap();

    let observed = resource.read(&mut state).await.unwrap().into_slo();
    state.merge_config(&rolling_state().into_values());

    assert_eq!(state.get("is_locked"), None);
    assert_eq!(
        plan(&state, observed.as_ref()).unwrap(),
        Plan::Update(vec!["is_locked"])
    );
    resource.update(&mut state).await.unwrap();
    assert!(!gateway.get(state.id()).await.unwrap().is_locked);
}
