//! Webhook convergence: set comparison of event types and secrets.

use super::common::*;
use pretty_assertions::assert_eq;
use stackform_core::DiagnosticCategory;
use stackform_runtime::resources::{WebhooksModel, WebhooksResource};
use stackform_runtime::{ImportState, OperationContext, Resource};

fn hook(events: &[&str]) -> WebhooksModel {
    WebhooksModel {
        id: None,
        endpoint: "https://example.com/hooks".into(),
        event_types: events.iter().map(|e| e.to_string()).collect(),
        name: Some("ops".into()),
        secret: None,
    }
}

#[tokio::test]
async fn create_adopts_generated_secret() {
    let stack = FakeStack::new();
    let resource = WebhooksResource::new(env(&stack, "webhooks"));

    let t = resource
        .create(&OperationContext::new(), hook(&["ledger.committed_transactions"]))
        .await;

    assert!(t.diagnostics.is_empty(), "{:?}", t.diagnostics);
    let state = t.state.unwrap();
    assert!(state.id.is_some());
    assert_eq!(state.secret.as_deref(), Some("whsec_generated"));
}

#[tokio::test]
async fn reordered_event_types_make_no_call() {
    let stack = FakeStack::new();
    let resource = WebhooksResource::new(env(&stack, "webhooks"));
    let ctx = OperationContext::new();
    let observed = resource
        .create(&ctx, hook(&["a.created", "b.updated"]))
        .await
        .state
        .unwrap();
    let calls_before = stack.calls().len();

    let mut desired = hook(&["b.updated", "a.created"]);
    desired.id = observed.id.clone();
    let t = resource.update(&ctx, observed.clone(), desired).await;

    assert_eq!(t.state, Some(observed));
    assert_eq!(stack.calls().len(), calls_before);
}

#[tokio::test]
async fn endpoint_change_keeps_remote_secret() {
    let stack = FakeStack::new();
    let resource = WebhooksResource::new(env(&stack, "webhooks"));
    let ctx = OperationContext::new();
    let observed = resource
        .create(&ctx, hook(&["a.created"]))
        .await
        .state
        .unwrap();
    let id = observed.id.clone().unwrap();

    let mut desired = hook(&["a.created"]);
    desired.endpoint = "https://example.com/v2/hooks".into();
    let t = resource.update(&ctx, observed, desired).await;

    assert!(t.diagnostics.is_empty(), "{:?}", t.diagnostics);
    let state = t.state.unwrap();
    assert_eq!(state.id.as_deref(), Some(id.as_str()));
    assert_eq!(state.secret.as_deref(), Some("whsec_generated"));

    let remote = stack.webhook(&id).unwrap();
    assert_eq!(remote.endpoint, "https://example.com/v2/hooks");
    assert_eq!(remote.secret.as_deref(), Some("whsec_generated"));
}

#[tokio::test]
async fn read_of_unknown_id_is_not_found() {
    let stack = FakeStack::new();
    let resource = WebhooksResource::new(env(&stack, "webhooks"));
    let mut state = hook(&["a.created"]);
    state.id = Some("wh-404".into());

    let t = resource.read(&OperationContext::new(), state.clone()).await;

    assert_eq!(t.state, Some(state));
    let diag = t.diagnostics.iter().next().unwrap();
    assert_eq!(diag.code, "WEBHOOK_NOT_FOUND");
    assert_eq!(diag.category, DiagnosticCategory::Remote);
}

#[tokio::test]
async fn import_builds_state_from_remote() {
    let stack = FakeStack::new();
    let resource = WebhooksResource::new(env(&stack, "webhooks"));
    let ctx = OperationContext::new();
    let created = resource
        .create(&ctx, hook(&["a.created"]))
        .await
        .state
        .unwrap();
    let id = created.id.clone().unwrap();

    let imported = resource.import_state(&ctx, &id).await;

    assert!(imported.diagnostics.is_empty(), "{:?}", imported.diagnostics);
    assert_eq!(imported.state, Some(created));
}

#[tokio::test]
async fn delete_removes_config() {
    let stack = FakeStack::new();
    let resource = WebhooksResource::new(env(&stack, "webhooks"));
    let ctx = OperationContext::new();
    let state = resource
        .create(&ctx, hook(&["a.created"]))
        .await
        .state
        .unwrap();
    let id = state.id.clone().unwrap();

    assert!(resource.delete(&ctx, state).await.is_empty());
    assert!(stack.webhook(&id).is_none());
}
