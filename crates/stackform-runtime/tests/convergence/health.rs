//! The module health gate in front of every transition.

use super::common::*;
use pretty_assertions::assert_eq;
use stackform_core::DiagnosticCategory;
use stackform_core::config::HealthConfig;
use stackform_runtime::resources::{LedgerModel, LedgerResource};
use stackform_runtime::{OperationContext, ProviderHandle, Resource};
use std::time::{Duration, Instant};

fn ledger() -> LedgerModel {
    LedgerModel {
        name: "test".into(),
        ..Default::default()
    }
}

#[tokio::test]
async fn waits_for_module_then_creates() {
    let stack = FakeStack::new();
    stack.script_health(vec![versions(&["payments"]), versions(&["ledger"])]);
    let resource = LedgerResource::new(env_with_gate(
        &stack,
        "ledger",
        Duration::from_secs(2),
        Duration::from_millis(20),
    ));

    let t = resource.create(&OperationContext::new(), ledger()).await;

    assert!(t.diagnostics.is_empty(), "{:?}", t.diagnostics);
    assert_eq!(stack.health_polls(), 2);
    assert_eq!(
        stack.calls(),
        vec![
            "list_module_versions",
            "list_module_versions",
            "create_ledger test",
            "get_ledger test",
        ]
    );
}

#[tokio::test]
async fn unhealthy_module_times_out_without_mutation() {
    let stack = FakeStack::new();
    stack.script_health(vec![versions(&[])]);
    let resource = LedgerResource::new(env_with_gate(
        &stack,
        "ledger",
        Duration::from_millis(200),
        Duration::from_millis(20),
    ));

    let started = Instant::now();
    let t = resource.create(&OperationContext::new(), ledger()).await;
    let elapsed = started.elapsed();

    assert!(elapsed >= Duration::from_millis(200), "{elapsed:?}");
    assert!(elapsed < Duration::from_secs(1), "{elapsed:?}");
    assert!(t.state.is_none());
    let diag = t.diagnostics.iter().next().unwrap();
    assert_eq!(diag.category, DiagnosticCategory::HealthTimeout);
    assert_eq!(diag.code, "MODULE_HEALTH_TIMEOUT");
    assert!(stack.api_calls().is_empty());
}

#[tokio::test]
async fn cancellation_stops_the_wait() {
    let stack = FakeStack::new();
    stack.script_health(vec![versions(&[])]);
    let resource = LedgerResource::new(env_with_gate(
        &stack,
        "ledger",
        Duration::from_secs(30),
        Duration::from_millis(20),
    ));
    let ctx = OperationContext::new();
    let canceller = ctx.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(60)).await;
        canceller.cancel();
    });

    let started = Instant::now();
    let t = resource.create(&ctx, ledger()).await;

    assert!(started.elapsed() < Duration::from_secs(1));
    let diag = t.diagnostics.iter().next().unwrap();
    assert_eq!(diag.category, DiagnosticCategory::Cancelled);
    assert!(stack.api_calls().is_empty());
}

#[tokio::test]
async fn failing_listing_is_reported_as_remote_error() {
    let stack = FakeStack::new();
    stack.fail_on("list_module_versions", validation_error("stack is paused"));
    let resource = LedgerResource::new(env(&stack, "ledger"));

    let t = resource.create(&OperationContext::new(), ledger()).await;

    let diag = t.diagnostics.iter().next().unwrap();
    assert_eq!(diag.category, DiagnosticCategory::Remote);
    assert_eq!(diag.code, "VALIDATION");
    assert_eq!(stack.health_polls(), 1);
    assert!(stack.api_calls().is_empty());
}

#[tokio::test]
async fn handle_waits_for_each_expected_module() {
    let stack = FakeStack::new();
    let handle = ProviderHandle::new(
        stack.clone(),
        HealthConfig {
            timeout_seconds: 1,
            poll_interval_ms: 10,
        },
    );

    let modules = vec!["ledger".to_string(), "payments".to_string()];
    let diags = handle.await_modules(&OperationContext::new(), &modules).await;
    assert!(diags.is_empty(), "{diags:?}");
    assert_eq!(stack.health_polls(), 2);

    let modules = vec!["orchestration".to_string()];
    let diags = handle.await_modules(&OperationContext::new(), &modules).await;
    assert_eq!(
        diags.iter().next().unwrap().category,
        DiagnosticCategory::HealthTimeout
    );
}
