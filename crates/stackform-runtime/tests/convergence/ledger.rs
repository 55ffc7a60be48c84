//! Ledger convergence: computed fields and metadata reconciliation.

use super::common::*;
use pretty_assertions::assert_eq;
use stackform_client::models::ledger::LedgerInfo;
use stackform_core::{DiagnosticCategory, Severity};
use stackform_runtime::resources::{LedgerModel, LedgerResource};
use stackform_runtime::{OperationContext, Resource};
use std::collections::BTreeMap;

fn metadata(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn seeded(stack: &FakeStack, pairs: &[(&str, &str)]) -> LedgerModel {
    stack.seed_ledger(LedgerInfo {
        name: "test".into(),
        bucket: "_default".into(),
        metadata: metadata(pairs),
        ..Default::default()
    });
    LedgerModel {
        name: "test".into(),
        bucket: Some("_default".into()),
        metadata: metadata(pairs),
        ..Default::default()
    }
}

// =============================================================================
// CREATE
// =============================================================================

#[tokio::test]
async fn create_populates_computed_bucket() {
    let stack = FakeStack::new();
    let resource = LedgerResource::new(env(&stack, "ledger"));

    let desired = LedgerModel {
        name: "test".into(),
        metadata: metadata(&[("key1", "value1")]),
        ..Default::default()
    };
    let t = resource.create(&OperationContext::new(), desired).await;

    assert!(t.diagnostics.is_empty(), "{:?}", t.diagnostics);
    let state = t.state.unwrap();
    assert_eq!(state.name, "test");
    assert_eq!(state.bucket.as_deref(), Some("_default"));
    assert_eq!(state.metadata, metadata(&[("key1", "value1")]));
    assert_eq!(stack.api_calls(), vec!["create_ledger test", "get_ledger test"]);
}

#[tokio::test]
async fn create_keeps_desired_state_when_read_back_fails() {
    let stack = FakeStack::new();
    stack.fail_on("get_ledger test", not_found("ledger not found"));
    let resource = LedgerResource::new(env(&stack, "ledger"));

    let desired = LedgerModel {
        name: "test".into(),
        ..Default::default()
    };
    let t = resource.create(&OperationContext::new(), desired.clone()).await;

    assert!(!t.has_error());
    assert_eq!(t.state, Some(desired));
    let diag = t.diagnostics.iter().next().unwrap();
    assert_eq!(diag.severity, Severity::Warning);
    assert!(diag.message.contains("could not be read back"), "{}", diag.message);
}

#[tokio::test]
async fn invalid_name_makes_no_call() {
    let stack = FakeStack::new();
    let resource = LedgerResource::new(env(&stack, "ledger"));

    let t = resource
        .create(&OperationContext::new(), LedgerModel::default())
        .await;

    assert!(t.state.is_none());
    assert_eq!(
        t.diagnostics.iter().next().unwrap().category,
        DiagnosticCategory::InvalidConfiguration
    );
    assert!(stack.calls().is_empty());
}

// =============================================================================
// UPDATE
// =============================================================================

#[tokio::test]
async fn update_upserts_then_deletes_removed_keys() {
    let stack = FakeStack::new();
    let observed = seeded(&stack, &[("a", "1"), ("b", "2")]);
    let resource = LedgerResource::new(env(&stack, "ledger"));

    let mut desired = observed.clone();
    desired.metadata = metadata(&[("a", "1"), ("c", "3")]);
    let t = resource
        .update(&OperationContext::new(), observed, desired)
        .await;

    assert!(t.diagnostics.is_empty(), "{:?}", t.diagnostics);
    assert_eq!(t.state.unwrap().metadata, metadata(&[("a", "1"), ("c", "3")]));
    assert_eq!(
        stack.api_calls(),
        vec!["update_ledger_metadata test c", "delete_ledger_metadata test b"]
    );
    assert_eq!(stack.ledger("test").unwrap().metadata, metadata(&[("a", "1"), ("c", "3")]));
}

#[tokio::test]
async fn failed_key_removal_after_upsert_is_partial() {
    let stack = FakeStack::new();
    let observed = seeded(&stack, &[("a", "1"), ("b", "2")]);
    stack.fail_on("delete_ledger_metadata test b", validation_error("locked"));
    let resource = LedgerResource::new(env(&stack, "ledger"));

    let mut desired = observed.clone();
    desired.metadata = metadata(&[("c", "3")]);
    let t = resource
        .update(&OperationContext::new(), observed, desired)
        .await;

    let categories: Vec<_> = t.diagnostics.iter().map(|d| d.category).collect();
    assert_eq!(
        categories,
        vec![DiagnosticCategory::Remote, DiagnosticCategory::PartialUpdate]
    );
    // "a" comes before "b" and is attempted first; "b" fails and stops the loop.
    assert_eq!(
        stack.api_calls(),
        vec![
            "update_ledger_metadata test c",
            "delete_ledger_metadata test a",
            "delete_ledger_metadata test b",
        ]
    );
    assert_eq!(t.state.unwrap().metadata, metadata(&[("b", "2"), ("c", "3")]));
}

#[tokio::test]
async fn bucket_change_requires_replacement() {
    let stack = FakeStack::new();
    let observed = seeded(&stack, &[]);
    let resource = LedgerResource::new(env(&stack, "ledger"));

    let mut desired = observed.clone();
    desired.bucket = Some("archive".into());
    let t = resource
        .update(&OperationContext::new(), observed.clone(), desired)
        .await;

    assert_eq!(t.state, Some(observed));
    let diag = t.diagnostics.iter().next().unwrap();
    assert_eq!(diag.code, "REQUIRES_REPLACEMENT");
    assert!(stack.calls().is_empty());
}

// =============================================================================
// READ / DELETE
// =============================================================================

#[tokio::test]
async fn read_refreshes_metadata() {
    let stack = FakeStack::new();
    let state = seeded(&stack, &[("a", "1")]);
    stack.seed_ledger(LedgerInfo {
        name: "test".into(),
        bucket: "_default".into(),
        metadata: metadata(&[("a", "2")]),
        ..Default::default()
    });
    let resource = LedgerResource::new(env(&stack, "ledger"));

    let t = resource.read(&OperationContext::new(), state).await;
    assert_eq!(t.state.unwrap().metadata, metadata(&[("a", "2")]));
}

#[tokio::test]
async fn delete_only_warns() {
    let stack = FakeStack::new();
    let state = seeded(&stack, &[]);
    let resource = LedgerResource::new(env(&stack, "ledger"));

    let diags = resource.delete(&OperationContext::new(), state).await;
    assert!(!diags.has_error());
    assert_eq!(diags.iter().next().unwrap().category, DiagnosticCategory::Unsupported);
    assert!(stack.calls().is_empty());
    assert!(stack.ledger("test").is_some());
}
