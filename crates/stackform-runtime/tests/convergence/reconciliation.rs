//! Reconciliation policy convergence and remote error translation.

use super::common::*;
use pretty_assertions::assert_eq;
use serde_json::json;
use stackform_core::DiagnosticCategory;
use stackform_runtime::resources::{ReconciliationPolicyModel, ReconciliationPolicyResource};
use stackform_runtime::{OperationContext, Resource};

fn policy() -> ReconciliationPolicyModel {
    ReconciliationPolicyModel {
        name: "daily".into(),
        ledger_name: "main".into(),
        payments_pool_id: "pool-1".into(),
        ledger_query: Some(json_value(json!({"$match": {"account": "users:"}}))),
        ..Default::default()
    }
}

#[tokio::test]
async fn create_adopts_id_and_creation_time() {
    let stack = FakeStack::new();
    let resource = ReconciliationPolicyResource::new(env(&stack, "reconciliation"));
    let ctx = OperationContext::new();

    let created = resource.create(&ctx, policy()).await;
    assert!(created.diagnostics.is_empty(), "{:?}", created.diagnostics);
    let state = created.state.unwrap();
    assert!(state.id.is_some());
    assert_eq!(state.created_at.as_deref(), Some("2024-05-01T12:00:00+00:00"));

    let read = resource.read(&ctx, state.clone()).await;
    assert_eq!(read.state, Some(state));
}

#[tokio::test]
async fn remote_failure_carries_traceparent() {
    let stack = FakeStack::new();
    stack.fail_on("create_policy daily", validation_error("pool pool-1 does not exist"));
    let resource = ReconciliationPolicyResource::new(env(&stack, "reconciliation"));

    let t = resource.create(&OperationContext::new(), policy()).await;

    assert!(t.state.is_none());
    let diag = t.diagnostics.iter().next().unwrap();
    assert_eq!(diag.category, DiagnosticCategory::Remote);
    assert_eq!(diag.code, "VALIDATION");
    assert_eq!(
        diag.message,
        format!("[Traceparent: {TRACEPARENT}] pool pool-1 does not exist")
    );
    assert_eq!(diag.correlation_id.as_deref(), Some(TRACEPARENT));
}

#[tokio::test]
async fn same_failure_translates_identically() {
    let stack = FakeStack::new();
    stack.fail_on("create_policy daily", validation_error("boom"));
    let resource = ReconciliationPolicyResource::new(env(&stack, "reconciliation"));
    let ctx = OperationContext::new();

    let first = resource.create(&ctx, policy()).await;
    let second = resource.create(&ctx, policy()).await;
    assert_eq!(first.diagnostics, second.diagnostics);
}

#[tokio::test]
async fn changed_query_is_never_sent() {
    let stack = FakeStack::new();
    let resource = ReconciliationPolicyResource::new(env(&stack, "reconciliation"));
    let ctx = OperationContext::new();
    let observed = resource.create(&ctx, policy()).await.state.unwrap();
    let calls_before = stack.calls().len();

    let mut desired = observed.clone();
    desired.ledger_query = Some(json_value(json!({"$match": {"account": "banks:"}})));
    let plan = resource.plan(Some(&observed), &desired);
    assert_eq!(plan.requires_replace, vec!["ledger_query"]);

    let t = resource.update(&ctx, observed.clone(), desired).await;
    assert_eq!(t.state, Some(observed));
    assert!(t.has_error());
    assert_eq!(stack.calls().len(), calls_before);
}

#[tokio::test]
async fn delete_removes_policy() {
    let stack = FakeStack::new();
    let resource = ReconciliationPolicyResource::new(env(&stack, "reconciliation"));
    let ctx = OperationContext::new();
    let state = resource.create(&ctx, policy()).await.state.unwrap();
    let id = state.id.clone().unwrap();

    assert!(resource.delete(&ctx, state).await.is_empty());
    assert!(stack.policy(&id).is_none());
}
