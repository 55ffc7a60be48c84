//! Kind-erased access to the convergence engines.
//!
//! The host works with JSON documents and a kind name; [`resource_for`] picks
//! the engine and [`DynResource`] converts between JSON and the engine's model
//! at the boundary.

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use stackform_core::{Diagnostic, DiagnosticCategory, Diagnostics, Transition};

use crate::bootstrap::ProviderHandle;
use crate::context::OperationContext;
use crate::resource::{Plan, Resource};
use crate::resources::{
    LedgerResource, LedgerSchemaResource, PaymentsConnectorResource, PaymentsPoolResource,
    ReconciliationPolicyResource, ResourceEnv, WebhooksResource,
};
use crate::tracer::TracedResource;

/// A convergence engine driven with JSON documents.
#[async_trait]
pub trait DynResource: Send + Sync {
    fn kind(&self) -> &'static str;

    fn module(&self) -> &'static str;

    fn validate_config(&self, desired: &Value) -> Diagnostics;

    fn plan(&self, prior: Option<&Value>, desired: &Value) -> Result<Plan, Diagnostics>;

    async fn create(&self, ctx: &OperationContext, desired: Value) -> Transition<Value>;

    async fn read(&self, ctx: &OperationContext, state: Value) -> Transition<Value>;

    async fn update(&self, ctx: &OperationContext, observed: Value, desired: Value) -> Transition<Value>;

    async fn delete(&self, ctx: &OperationContext, state: Value) -> Diagnostics;

    async fn import_state(&self, ctx: &OperationContext, id: &str) -> Transition<Value>;
}

fn decode<M: DeserializeOwned>(document: Value, attribute: &str) -> Result<M, Diagnostic> {
    serde_json::from_value(document)
        .map_err(|err| Diagnostic::invalid(attribute, format!("{attribute} does not match the resource schema: {err}")))
}

fn encode<M: Serialize>(transition: Transition<M>) -> Transition<Value> {
    let Transition { state, mut diagnostics } = transition;
    let state = match state.map(serde_json::to_value).transpose() {
        Ok(state) => state,
        Err(err) => {
            diagnostics.push(Diagnostic::error(
                DiagnosticCategory::Remote,
                "STATE_ENCODING",
                format!("resulting state could not be encoded: {err}"),
            ));
            None
        }
    };
    Transition { state, diagnostics }
}

#[async_trait]
impl<R: Resource> DynResource for TracedResource<R> {
    fn kind(&self) -> &'static str {
        TracedResource::kind(self)
    }

    fn module(&self) -> &'static str {
        TracedResource::module(self)
    }

    fn validate_config(&self, desired: &Value) -> Diagnostics {
        match decode::<R::Model>(desired.clone(), "desired") {
            Ok(desired) => TracedResource::validate_config(self, &desired),
            Err(diag) => diag.into(),
        }
    }

    fn plan(&self, prior: Option<&Value>, desired: &Value) -> Result<Plan, Diagnostics> {
        let desired = decode::<R::Model>(desired.clone(), "desired")?;
        let prior = prior
            .map(|prior| decode::<R::Model>(prior.clone(), "state"))
            .transpose()?;
        Ok(TracedResource::plan(self, prior.as_ref(), &desired))
    }

    async fn create(&self, ctx: &OperationContext, desired: Value) -> Transition<Value> {
        match decode::<R::Model>(desired, "desired") {
            Ok(desired) => encode(TracedResource::create(self, ctx, desired).await),
            Err(diag) => Transition::failed(diag),
        }
    }

    async fn read(&self, ctx: &OperationContext, state: Value) -> Transition<Value> {
        match decode::<R::Model>(state.clone(), "state") {
            Ok(decoded) => encode(TracedResource::read(self, ctx, decoded).await),
            Err(diag) => Transition::with(Some(state), diag),
        }
    }

    async fn update(&self, ctx: &OperationContext, observed: Value, desired: Value) -> Transition<Value> {
        let decoded_observed = match decode::<R::Model>(observed.clone(), "state") {
            Ok(decoded) => decoded,
            Err(diag) => return Transition::with(Some(observed), diag),
        };
        match decode::<R::Model>(desired, "desired") {
            Ok(desired) => encode(TracedResource::update(self, ctx, decoded_observed, desired).await),
            Err(diag) => Transition::with(Some(observed), diag),
        }
    }

    async fn delete(&self, ctx: &OperationContext, state: Value) -> Diagnostics {
        match decode::<R::Model>(state, "state") {
            Ok(state) => TracedResource::delete(self, ctx, state).await,
            Err(diag) => diag.into(),
        }
    }

    async fn import_state(&self, ctx: &OperationContext, id: &str) -> Transition<Value> {
        encode(TracedResource::import_state(self, ctx, id).await)
    }
}

/// Every resource kind this crate can converge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Ledger,
    LedgerSchema,
    PaymentsPool,
    PaymentsConnector,
    Webhooks,
    ReconciliationPolicy,
}

impl ResourceKind {
    pub const ALL: &'static [ResourceKind] = &[
        ResourceKind::Ledger,
        ResourceKind::LedgerSchema,
        ResourceKind::PaymentsPool,
        ResourceKind::PaymentsConnector,
        ResourceKind::Webhooks,
        ResourceKind::ReconciliationPolicy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Ledger => "ledger",
            ResourceKind::LedgerSchema => "ledger_schema",
            ResourceKind::PaymentsPool => "payments_pool",
            ResourceKind::PaymentsConnector => "payments_connector",
            ResourceKind::Webhooks => "webhooks",
            ResourceKind::ReconciliationPolicy => "reconciliation_policy",
        }
    }

    /// Stack module the kind depends on.
    pub fn module(&self) -> &'static str {
        match self {
            ResourceKind::Ledger | ResourceKind::LedgerSchema => "ledger",
            ResourceKind::PaymentsPool | ResourceKind::PaymentsConnector => "payments",
            ResourceKind::Webhooks => "webhooks",
            ResourceKind::ReconciliationPolicy => "reconciliation",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown resource kind '{0}'")]
pub struct UnknownKind(pub String);

impl FromStr for ResourceKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        ResourceKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| UnknownKind(s.to_string()))
    }
}

/// Build the traced engine for `kind`, bound to the handle's client.
pub fn resource_for(kind: ResourceKind, handle: &ProviderHandle) -> Box<dyn DynResource> {
    let env = ResourceEnv::new(handle.client(), handle.gate(kind.module()));
    match kind {
        ResourceKind::Ledger => Box::new(TracedResource::new(LedgerResource::new(env))),
        ResourceKind::LedgerSchema => Box::new(TracedResource::new(LedgerSchemaResource::new(env))),
        ResourceKind::PaymentsPool => Box::new(TracedResource::new(PaymentsPoolResource::new(env))),
        ResourceKind::PaymentsConnector => {
            Box::new(TracedResource::new(PaymentsConnectorResource::new(env)))
        }
        ResourceKind::Webhooks => Box::new(TracedResource::new(WebhooksResource::new(env))),
        ResourceKind::ReconciliationPolicy => {
            Box::new(TracedResource::new(ReconciliationPolicyResource::new(env)))
        }
    }
}
