//! Payments pool convergence: membership loop and query updates.

use super::common::*;
use pretty_assertions::assert_eq;
use serde_json::json;
use stackform_client::models::payments::Pool;
use stackform_core::DiagnosticCategory;
use stackform_runtime::resources::{PaymentsPoolModel, PaymentsPoolResource};
use stackform_runtime::{OperationContext, Resource};

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn seeded(stack: &FakeStack, accounts: &[&str]) -> PaymentsPoolModel {
    stack.seed_pool(Pool {
        id: "pool-1".into(),
        name: "treasury".into(),
        pool_accounts: strings(accounts),
        ..Default::default()
    });
    PaymentsPoolModel {
        id: Some("pool-1".into()),
        name: "treasury".into(),
        accounts_ids: strings(accounts),
        query: None,
    }
}

// =============================================================================
// MEMBERSHIP
// =============================================================================

#[tokio::test]
async fn update_adds_and_removes_one_account_per_call() {
    let stack = FakeStack::new();
    let observed = seeded(&stack, &["account2", "account3"]);
    let resource = PaymentsPoolResource::new(env(&stack, "payments"));

    let mut desired = observed.clone();
    desired.accounts_ids = strings(&["account1", "account2"]);
    let t = resource
        .update(&OperationContext::new(), observed, desired.clone())
        .await;

    assert!(t.diagnostics.is_empty(), "{:?}", t.diagnostics);
    assert_eq!(t.state, Some(desired));
    assert_eq!(
        stack.api_calls(),
        vec![
            "add_account_to_pool pool-1 account1",
            "remove_account_from_pool pool-1 account3",
        ]
    );
    assert_eq!(
        stack.pool("pool-1").unwrap().pool_accounts,
        strings(&["account2", "account1"])
    );
}

#[tokio::test]
async fn failed_add_stops_the_loop_and_reports_partial_update() {
    let stack = FakeStack::new();
    let observed = seeded(&stack, &[]);
    stack.fail_on("add_account_to_pool pool-1 b", validation_error("account b does not exist"));
    let resource = PaymentsPoolResource::new(env(&stack, "payments"));

    let mut desired = observed.clone();
    desired.accounts_ids = strings(&["a", "b", "c"]);
    let t = resource
        .update(&OperationContext::new(), observed, desired)
        .await;

    let categories: Vec<_> = t.diagnostics.iter().map(|d| d.category).collect();
    assert_eq!(
        categories,
        vec![DiagnosticCategory::Remote, DiagnosticCategory::PartialUpdate]
    );
    let partial = t.diagnostics.iter().nth(1).unwrap();
    assert!(partial.message.contains("1 of 3"), "{}", partial.message);

    // "c" is never attempted and "a" is not rolled back.
    assert_eq!(
        stack.api_calls(),
        vec!["add_account_to_pool pool-1 a", "add_account_to_pool pool-1 b"]
    );
    assert_eq!(stack.pool("pool-1").unwrap().pool_accounts, strings(&["a"]));
    assert_eq!(t.state.unwrap().accounts_ids, strings(&["a"]));
}

#[tokio::test]
async fn first_call_failure_is_not_partial() {
    let stack = FakeStack::new();
    let observed = seeded(&stack, &[]);
    stack.fail_on("add_account_to_pool pool-1 a", validation_error("nope"));
    let resource = PaymentsPoolResource::new(env(&stack, "payments"));

    let mut desired = observed.clone();
    desired.accounts_ids = strings(&["a", "b"]);
    let t = resource
        .update(&OperationContext::new(), observed.clone(), desired)
        .await;

    assert_eq!(t.diagnostics.len(), 1);
    assert_eq!(t.diagnostics.iter().next().unwrap().category, DiagnosticCategory::Remote);
    assert_eq!(t.state, Some(observed));
}

// =============================================================================
// QUERY
// =============================================================================

#[tokio::test]
async fn numerically_equal_query_is_not_sent() {
    let stack = FakeStack::new();
    let mut observed = seeded(&stack, &[]);
    observed.query = Some(json_value(json!({"$lt": {"amount": 100}})));
    let resource = PaymentsPoolResource::new(env(&stack, "payments"));

    let mut desired = observed.clone();
    desired.query = Some(json_value(json!({"$lt": {"amount": 100.0}})));
    let t = resource
        .update(&OperationContext::new(), observed, desired)
        .await;

    assert!(t.diagnostics.is_empty(), "{:?}", t.diagnostics);
    assert!(stack.api_calls().is_empty());
}

#[tokio::test]
async fn changed_query_is_sent_once() {
    let stack = FakeStack::new();
    let mut observed = seeded(&stack, &[]);
    observed.query = Some(json_value(json!({"$match": {"account": "users:"}})));
    let resource = PaymentsPoolResource::new(env(&stack, "payments"));

    let mut desired = observed.clone();
    desired.query = Some(json_value(json!({"$match": {"account": "banks:"}})));
    let t = resource
        .update(&OperationContext::new(), observed, desired.clone())
        .await;

    assert!(t.diagnostics.is_empty(), "{:?}", t.diagnostics);
    assert_eq!(stack.api_calls(), vec!["update_pool_query pool-1"]);
    assert_eq!(stack.pool("pool-1").unwrap().query, desired.query);
}

// =============================================================================
// LIFECYCLE
// =============================================================================

#[tokio::test]
async fn create_read_delete() {
    let stack = FakeStack::new();
    let resource = PaymentsPoolResource::new(env(&stack, "payments"));
    let ctx = OperationContext::new();

    let desired = PaymentsPoolModel {
        name: "treasury".into(),
        accounts_ids: strings(&["a", "b"]),
        ..Default::default()
    };
    let created = resource.create(&ctx, desired).await;
    assert!(created.diagnostics.is_empty(), "{:?}", created.diagnostics);
    let state = created.state.unwrap();
    let id = state.id.clone().unwrap();

    let read = resource.read(&ctx, state.clone()).await;
    assert_eq!(read.state, Some(state.clone()));

    let diags = resource.delete(&ctx, state).await;
    assert!(diags.is_empty(), "{diags:?}");
    assert!(stack.pool(&id).is_none());
    assert_eq!(
        stack.api_calls(),
        vec![
            "create_pool treasury".to_string(),
            format!("get_pool {id}"),
            format!("delete_pool {id}"),
        ]
    );
}

#[tokio::test]
async fn read_of_deleted_pool_keeps_prior_state() {
    let stack = FakeStack::new();
    let resource = PaymentsPoolResource::new(env(&stack, "payments"));
    let state = PaymentsPoolModel {
        id: Some("pool-9".into()),
        name: "gone".into(),
        accounts_ids: strings(&["a"]),
        query: None,
    };

    let t = resource.read(&OperationContext::new(), state.clone()).await;
    assert_eq!(t.state, Some(state));
    let diag = t.diagnostics.iter().next().unwrap();
    assert_eq!(diag.code, "NOT_FOUND");
    assert_eq!(diag.correlation_id.as_deref(), Some(TRACEPARENT));
}
