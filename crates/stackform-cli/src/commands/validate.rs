//! `stackform validate`
//!
//! Offline checks: provider configuration (credentials, stack URI) and,
//! when given, one desired document against its resource kind.

use anyhow::Result;
use std::path::PathBuf;

use stackform_core::{CredentialDefaults, StackformConfig};
use stackform_runtime::{ProviderBootstrap, ResourceKind, resource_for};

use super::{Report, offline};
use crate::document;

pub fn run(
    config: &StackformConfig,
    defaults: CredentialDefaults,
    document: Option<(ResourceKind, PathBuf)>,
) -> Result<Report> {
    let mut diagnostics = ProviderBootstrap::new(config.clone(), defaults).validate();

    if let Some((kind, path)) = document {
        let desired = document::load(&path)?;
        let resource = resource_for(kind, &offline(config)?);
        diagnostics.extend(resource.validate_config(&desired));
    }

    if diagnostics.is_empty() {
        tracing::info!("configuration is valid");
    }
    Ok(Report::diagnostics(diagnostics))
}
