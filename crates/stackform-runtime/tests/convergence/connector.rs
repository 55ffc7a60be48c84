//! Payments connector convergence: provider dispatch and credential handling.

use super::common::*;
use pretty_assertions::assert_eq;
use serde_json::json;
use stackform_core::{DiagnosticCategory, DynamicValue};
use stackform_runtime::resources::{PaymentsConnectorModel, PaymentsConnectorResource};
use stackform_runtime::{OperationContext, Resource};

fn stripe() -> PaymentsConnectorModel {
    PaymentsConnectorModel {
        id: None,
        credentials: json_map(json!({"apiKey": "sk_test_123"})),
        config: json_map(json!({"name": "stripe-main", "provider": "stripe", "pageSize": 50})),
    }
}

#[tokio::test]
async fn install_sends_canonical_provider_and_merged_payload() {
    let stack = FakeStack::new();
    let resource = PaymentsConnectorResource::new(env(&stack, "payments"));

    let t = resource.create(&OperationContext::new(), stripe()).await;

    assert!(t.diagnostics.is_empty(), "{:?}", t.diagnostics);
    let state = t.state.unwrap();
    let id = state.id.clone().unwrap();
    assert_eq!(stack.api_calls(), vec!["install_connector Stripe"]);

    let stored = stack.connector(&id).unwrap();
    assert_eq!(stored.get("apiKey"), Some(&DynamicValue::from("sk_test_123")));
    assert_eq!(stored.get("provider"), Some(&DynamicValue::from("Stripe")));
    assert_eq!(stored.get("pageSize"), Some(&DynamicValue::Int(50)));
}

#[tokio::test]
async fn read_keeps_unechoed_credentials_and_drops_unknown_keys() {
    let stack = FakeStack::new();
    let resource = PaymentsConnectorResource::new(env(&stack, "payments"));
    let ctx = OperationContext::new();
    let created = resource.create(&ctx, stripe()).await.state.unwrap();

    let t = resource.read(&ctx, created.clone()).await;

    assert!(t.diagnostics.is_empty(), "{:?}", t.diagnostics);
    let state = t.state.unwrap();
    assert_eq!(state, created);
    assert!(!state.config.contains_key("pollingPeriod"));

    // Nothing to change after a read.
    let plan = resource.plan(Some(&state), &stripe());
    assert!(plan.requires_replace.is_empty(), "{plan:?}");
}

#[tokio::test]
async fn unknown_provider_fails_before_any_call() {
    let stack = FakeStack::new();
    let resource = PaymentsConnectorResource::new(env(&stack, "payments"));

    let mut desired = stripe();
    desired
        .config
        .insert("provider".into(), DynamicValue::from("paypal"));
    let t = resource.create(&OperationContext::new(), desired).await;

    assert!(t.state.is_none());
    let diag = t.diagnostics.iter().next().unwrap();
    assert_eq!(diag.category, DiagnosticCategory::InvalidConfiguration);
    assert_eq!(diag.attribute.as_deref(), Some("config.provider"));
    assert!(stack.calls().is_empty());
}

#[tokio::test]
async fn update_patches_config_in_place() {
    let stack = FakeStack::new();
    let resource = PaymentsConnectorResource::new(env(&stack, "payments"));
    let ctx = OperationContext::new();
    let observed = resource.create(&ctx, stripe()).await.state.unwrap();
    let id = observed.id.clone().unwrap();

    let mut desired = observed.clone();
    desired.config.insert("pageSize".into(), DynamicValue::Int(100));
    let t = resource.update(&ctx, observed, desired.clone()).await;

    assert!(t.diagnostics.is_empty(), "{:?}", t.diagnostics);
    assert_eq!(t.state, Some(desired));
    assert_eq!(
        stack.connector(&id).unwrap().get("pageSize"),
        Some(&DynamicValue::Int(100))
    );
    assert_eq!(
        stack.api_calls().last().map(String::as_str),
        Some(format!("update_connector_config {id}").as_str())
    );
}

#[tokio::test]
async fn provider_switch_is_not_patched() {
    let stack = FakeStack::new();
    let resource = PaymentsConnectorResource::new(env(&stack, "payments"));
    let ctx = OperationContext::new();
    let observed = resource.create(&ctx, stripe()).await.state.unwrap();
    let calls_before = stack.calls().len();

    let mut desired = observed.clone();
    desired
        .config
        .insert("provider".into(), DynamicValue::from("Generic"));
    let t = resource.update(&ctx, observed.clone(), desired).await;

    assert_eq!(t.state, Some(observed));
    assert_eq!(t.diagnostics.iter().next().unwrap().code, "REQUIRES_REPLACEMENT");
    assert_eq!(stack.calls().len(), calls_before);
}

#[tokio::test]
async fn uninstall_removes_connector() {
    let stack = FakeStack::new();
    let resource = PaymentsConnectorResource::new(env(&stack, "payments"));
    let ctx = OperationContext::new();
    let state = resource.create(&ctx, stripe()).await.state.unwrap();
    let id = state.id.clone().unwrap();

    let diags = resource.delete(&ctx, state).await;
    assert!(diags.is_empty(), "{diags:?}");
    assert!(stack.connector(&id).is_none());
}
