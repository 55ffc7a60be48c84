//! `stackform create|read|update|delete|import|plan`.
//!
//! Each invocation runs exactly one transition. `plan` is offline and only
//! compares documents.

use anyhow::Result;
use std::path::Path;

use stackform_core::{CredentialDefaults, StackformConfig};
use stackform_runtime::{ResourceKind, resource_for};

use super::{Report, connect, interruptible_context, offline};
use crate::document;

pub async fn create(
    config: &StackformConfig,
    defaults: CredentialDefaults,
    kind: ResourceKind,
    desired: &Path,
) -> Result<Report> {
    let desired = document::load(desired)?;
    let resource = resource_for(kind, &connect(config, defaults)?);
    let ctx = interruptible_context();
    Ok(resource.create(&ctx, desired).await.into())
}

pub async fn read(
    config: &StackformConfig,
    defaults: CredentialDefaults,
    kind: ResourceKind,
    state: &Path,
) -> Result<Report> {
    let state = document::load(state)?;
    let resource = resource_for(kind, &connect(config, defaults)?);
    let ctx = interruptible_context();
    Ok(resource.read(&ctx, state).await.into())
}

pub async fn update(
    config: &StackformConfig,
    defaults: CredentialDefaults,
    kind: ResourceKind,
    state: &Path,
    desired: &Path,
) -> Result<Report> {
    let observed = document::load(state)?;
    let desired = document::load(desired)?;
    let resource = resource_for(kind, &connect(config, defaults)?);
    let ctx = interruptible_context();
    Ok(resource.update(&ctx, observed, desired).await.into())
}

pub async fn delete(
    config: &StackformConfig,
    defaults: CredentialDefaults,
    kind: ResourceKind,
    state: &Path,
) -> Result<Report> {
    let state = document::load(state)?;
    let resource = resource_for(kind, &connect(config, defaults)?);
    let ctx = interruptible_context();
    let diagnostics = resource.delete(&ctx, state).await;
    tracing::info!(resource = %kind, "delete finished");
    Ok(Report::diagnostics(diagnostics))
}

pub async fn import(
    config: &StackformConfig,
    defaults: CredentialDefaults,
    kind: ResourceKind,
    id: &str,
) -> Result<Report> {
    let resource = resource_for(kind, &connect(config, defaults)?);
    let ctx = interruptible_context();
    Ok(resource.import_state(&ctx, id).await.into())
}

/// Validation diagnostics first; the plan only when the document is valid.
pub fn plan(
    config: &StackformConfig,
    kind: ResourceKind,
    state: Option<&Path>,
    desired: &Path,
) -> Result<Report> {
    let desired = document::load(desired)?;
    let prior = state.map(document::load).transpose()?;
    let resource = resource_for(kind, &offline(config)?);

    let diagnostics = resource.validate_config(&desired);
    if diagnostics.has_error() {
        return Ok(Report::diagnostics(diagnostics));
    }
    match resource.plan(prior.as_ref(), &desired) {
        Ok(plan) => Ok(Report {
            state: None,
            plan: Some(serde_json::to_value(plan)?),
            diagnostics,
        }),
        Err(errors) => {
            let mut all = diagnostics;
            all.extend(errors);
            Ok(Report::diagnostics(all))
        }
    }
}
