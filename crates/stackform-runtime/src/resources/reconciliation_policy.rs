//! Reconciliation policy resource (`reconciliation` module).
//!
//! Policies cannot be modified once created; every field forces replacement.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use stackform_client::models::reconciliation::{Policy, PolicyRequest};
use stackform_core::{Diagnostic, Diagnostics, DynamicMap, DynamicValue, Transition, query};

use super::{ResourceEnv, require_non_empty, requires_replacement};
use crate::context::OperationContext;
use crate::resource::{ImportState, Resource, ValidateConfig};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationPolicyModel {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// RFC 3339 creation time, filled by the remote.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,

    pub name: String,
    pub ledger_name: String,
    pub payments_pool_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ledger_query: Option<DynamicValue>,
}

impl ReconciliationPolicyModel {
    fn apply_remote(mut self, policy: Policy) -> Self {
        self.id = Some(policy.id);
        self.created_at = Some(policy.created_at.to_rfc3339());
        self.name = policy.name;
        self.ledger_name = policy.ledger_name;
        self.payments_pool_id = policy.payments_pool_id;
        if let Some(ledger_query) = policy.ledger_query.filter(|q| !q.is_empty()) {
            self.ledger_query = Some(DynamicValue::Map(ledger_query));
        }
        self
    }

    fn ledger_query_map(&self) -> DynamicMap {
        self.ledger_query
            .as_ref()
            .and_then(|q| q.as_map().cloned())
            .unwrap_or_default()
    }
}

const REPLACE_FIELDS: &[&str] = &["name", "ledger_name", "payments_pool_id", "ledger_query"];

pub struct ReconciliationPolicyResource {
    env: ResourceEnv,
}

impl ReconciliationPolicyResource {
    pub fn new(env: ResourceEnv) -> Self {
        Self { env }
    }

    fn missing_id() -> Diagnostic {
        Diagnostic::invalid("id", "policy id is unknown; the policy must be created first")
    }
}

#[async_trait]
impl Resource for ReconciliationPolicyResource {
    type Model = ReconciliationPolicyModel;

    fn kind(&self) -> &'static str {
        "reconciliation_policy"
    }

    fn module(&self) -> &'static str {
        "reconciliation"
    }

    fn replace_fields(&self) -> &'static [&'static str] {
        REPLACE_FIELDS
    }

    fn changed_fields(
        &self,
        prior: &ReconciliationPolicyModel,
        desired: &ReconciliationPolicyModel,
    ) -> Vec<&'static str> {
        let mut changed = Vec::new();
        if prior.name != desired.name {
            changed.push("name");
        }
        if prior.ledger_name != desired.ledger_name {
            changed.push("ledger_name");
        }
        if prior.payments_pool_id != desired.payments_pool_id {
            changed.push("payments_pool_id");
        }
        let prior_query = DynamicValue::Map(prior.ledger_query_map());
        if !prior_query.semantically_eq(&DynamicValue::Map(desired.ledger_query_map())) {
            changed.push("ledger_query");
        }
        changed
    }

    async fn create(
        &self,
        ctx: &OperationContext,
        desired: ReconciliationPolicyModel,
    ) -> Transition<ReconciliationPolicyModel> {
        let diagnostics = self.validate_config(&desired);
        if diagnostics.has_error() {
            return Transition::failed(diagnostics);
        }
        if let Err(diag) = self.env.ready(ctx).await {
            return Transition::failed(diag);
        }

        let request = PolicyRequest {
            name: desired.name.clone(),
            ledger_name: desired.ledger_name.clone(),
            ledger_query: desired.ledger_query_map(),
            payments_pool_id: desired.payments_pool_id.clone(),
        };
        match self
            .env
            .call(ctx, self.env.client().reconciliation().create_policy(&request))
            .await
        {
            Ok(policy) => Transition::ok(ReconciliationPolicyModel {
                id: Some(policy.id),
                created_at: Some(policy.created_at.to_rfc3339()),
                ..desired
            }),
            Err(diag) => Transition::failed(diag),
        }
    }

    async fn read(
        &self,
        ctx: &OperationContext,
        state: ReconciliationPolicyModel,
    ) -> Transition<ReconciliationPolicyModel> {
        let Some(id) = state.id.clone() else {
            return Transition::with(Some(state), Self::missing_id());
        };
        if let Err(diag) = self.env.ready(ctx).await {
            return Transition::with(Some(state), diag);
        }
        match self
            .env
            .call(ctx, self.env.client().reconciliation().get_policy(&id))
            .await
        {
            Ok(policy) => Transition::ok(state.apply_remote(policy)),
            Err(diag) => Transition::with(Some(state), diag),
        }
    }

    async fn update(
        &self,
        _ctx: &OperationContext,
        observed: ReconciliationPolicyModel,
        desired: ReconciliationPolicyModel,
    ) -> Transition<ReconciliationPolicyModel> {
        let diagnostics: Diagnostics = self
            .changed_fields(&observed, &desired)
            .into_iter()
            .map(requires_replacement)
            .collect();
        Transition::with(Some(observed), diagnostics)
    }

    async fn delete(&self, ctx: &OperationContext, state: ReconciliationPolicyModel) -> Diagnostics {
        let Some(id) = state.id else {
            return Self::missing_id().into();
        };
        if let Err(diag) = self.env.ready(ctx).await {
            return diag.into();
        }
        match self
            .env
            .call(ctx, self.env.client().reconciliation().delete_policy(&id))
            .await
        {
            Ok(()) => Diagnostics::new(),
            Err(diag) => diag.into(),
        }
    }

    fn as_validator(&self) -> Option<&dyn ValidateConfig<ReconciliationPolicyModel>> {
        Some(self)
    }

    fn as_importer(&self) -> Option<&dyn ImportState<ReconciliationPolicyModel>> {
        Some(self)
    }
}

impl ValidateConfig<ReconciliationPolicyModel> for ReconciliationPolicyResource {
    fn validate_config(&self, desired: &ReconciliationPolicyModel) -> Diagnostics {
        let mut diagnostics = Diagnostics::new();
        require_non_empty(&desired.name, "name", &mut diagnostics);
        require_non_empty(&desired.ledger_name, "ledger_name", &mut diagnostics);
        require_non_empty(&desired.payments_pool_id, "payments_pool_id", &mut diagnostics);

        if let Some(ledger_query) = &desired.ledger_query {
            if let Err(err) = query::parse(ledger_query) {
                diagnostics.push(Diagnostic::invalid("ledger_query", err.to_string()));
            }
        }
        diagnostics
    }
}

#[async_trait]
impl ImportState<ReconciliationPolicyModel> for ReconciliationPolicyResource {
    async fn import_state(&self, ctx: &OperationContext, id: &str) -> Transition<ReconciliationPolicyModel> {
        let state = ReconciliationPolicyModel {
            id: Some(id.to_string()),
            ..Default::default()
        };
        let transition = self.read(ctx, state).await;
        if transition.has_error() {
            return Transition::failed(transition.diagnostics);
        }
        transition
    }
}
