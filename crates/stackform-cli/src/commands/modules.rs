//! `stackform modules`

use anyhow::Result;

use stackform_core::{CredentialDefaults, Diagnostics, StackformConfig};
use stackform_runtime::ErrorTranslator;

use super::{Report, connect, interruptible_context};

/// List module versions, optionally after waiting for the expected modules.
pub async fn run(config: &StackformConfig, defaults: CredentialDefaults, wait: bool) -> Result<Report> {
    let handle = connect(config, defaults)?;
    let ctx = interruptible_context();

    let mut diagnostics = Diagnostics::new();
    if wait {
        diagnostics.extend(handle.await_expected_modules(&ctx, config).await);
        if diagnostics.has_error() {
            return Ok(Report::diagnostics(diagnostics));
        }
    }

    let client = handle.client();
    match ctx.run(client.list_module_versions()).await {
        Ok(Ok(listing)) => {
            for module in &listing.versions {
                tracing::debug!(module = %module.name, version = %module.version, healthy = module.health, "module listed");
            }
            Ok(Report {
                state: Some(serde_json::to_value(listing)?),
                plan: None,
                diagnostics,
            })
        }
        Ok(Err(err)) => {
            diagnostics.push(ErrorTranslator::translate(&err));
            Ok(Report::diagnostics(diagnostics))
        }
        Err(reason) => {
            diagnostics.push(reason.to_diagnostic());
            Ok(Report::diagnostics(diagnostics))
        }
    }
}
