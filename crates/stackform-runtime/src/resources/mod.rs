//! Convergence engines, one per resource kind.
//!
//! Every engine follows the same order inside a transition: local validation,
//! then the module health gate, then remote calls one at a time. The first
//! failure ends the transition with a diagnostic; nothing is retried here.

pub mod ledger;
pub mod ledger_schema;
pub mod payments_connector;
pub mod payments_pool;
pub mod reconciliation_policy;
pub mod webhooks;

pub use ledger::{LedgerModel, LedgerResource};
pub use ledger_schema::{LedgerSchemaModel, LedgerSchemaResource};
pub use payments_connector::{PaymentsConnectorModel, PaymentsConnectorResource};
pub use payments_pool::{PaymentsPoolModel, PaymentsPoolResource};
pub use reconciliation_policy::{ReconciliationPolicyModel, ReconciliationPolicyResource};
pub use webhooks::{WebhooksModel, WebhooksResource};

use std::future::Future;
use std::sync::Arc;

use stackform_client::{ApiResult, StackApi};
use stackform_core::{Diagnostic, DiagnosticCategory};

use crate::context::OperationContext;
use crate::health::ModuleHealthGate;
use crate::translate::ErrorTranslator;

/// Shared client handle plus the health gate of one module.
#[derive(Clone)]
pub struct ResourceEnv {
    client: Arc<dyn StackApi>,
    gate: ModuleHealthGate,
}

impl ResourceEnv {
    pub fn new(client: Arc<dyn StackApi>, gate: ModuleHealthGate) -> Self {
        Self { client, gate }
    }

    pub fn client(&self) -> &dyn StackApi {
        self.client.as_ref()
    }

    /// Wait for the module to be healthy.
    pub async fn ready(&self, ctx: &OperationContext) -> Result<(), Diagnostic> {
        self.gate
            .await_healthy(ctx)
            .await
            .map_err(|err| err.to_diagnostic())
    }

    /// Issue one remote call, honouring cancellation, and translate failures.
    pub async fn call<T, F>(&self, ctx: &OperationContext, call: F) -> Result<T, Diagnostic>
    where
        F: Future<Output = ApiResult<T>>,
    {
        match ctx.run(call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(ErrorTranslator::translate(&err)),
            Err(interrupted) => Err(interrupted.to_diagnostic()),
        }
    }
}

/// Reported next to the failure of a multi-step update that stopped midway.
pub(crate) fn partial_update(applied: &[String], pending: &[String]) -> Diagnostic {
    let mut message = format!(
        "update stopped after {} of {} changes; local state may differ from the remote, read the resource to resynchronize",
        applied.len(),
        applied.len() + pending.len(),
    );
    if !applied.is_empty() {
        message.push_str(&format!(" (applied: {})", applied.join(", ")));
    }
    if !pending.is_empty() {
        message.push_str(&format!(" (not applied: {})", pending.join(", ")));
    }
    Diagnostic::error(DiagnosticCategory::PartialUpdate, "PARTIAL_UPDATE", message)
}

/// Changing `field` needs a delete + create.
pub(crate) fn requires_replacement(field: &str) -> Diagnostic {
    Diagnostic::error(
        DiagnosticCategory::InvalidConfiguration,
        "REQUIRES_REPLACEMENT",
        format!("'{field}' cannot be changed in place; the resource must be replaced"),
    )
    .with_attribute(field)
}

/// Shorthand for a required string attribute left empty.
pub(crate) fn require_non_empty(value: &str, attribute: &str, diagnostics: &mut stackform_core::Diagnostics) {
    if value.trim().is_empty() {
        diagnostics.push(Diagnostic::invalid(attribute, format!("'{attribute}' cannot be empty")));
    }
}
