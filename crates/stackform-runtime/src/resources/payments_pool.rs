//! Payments pool resource (`payments` module).
//!
//! A pool groups accounts either by explicit membership or by a query. The
//! remote API only adds or removes one account at a time, so membership
//! changes are applied as a sequence of single calls.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use stackform_client::models::payments::{CreatePoolRequest, Pool};
use stackform_core::{Diagnostic, Diagnostics, DynamicMap, DynamicValue, Transition, query, reconcile};

use super::{ResourceEnv, partial_update, require_non_empty, requires_replacement};
use crate::context::OperationContext;
use crate::resource::{ImportState, Resource, ValidateConfig};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaymentsPoolModel {
    /// Assigned by the remote on create.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    pub name: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub accounts_ids: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<DynamicValue>,
}

impl PaymentsPoolModel {
    fn apply_remote(mut self, pool: Pool) -> Self {
        self.id = Some(pool.id);
        self.name = pool.name;
        if !pool.pool_accounts.is_empty() {
            self.accounts_ids = pool.pool_accounts;
        }
        if let Some(query) = pool.query.filter(|q| !is_empty_query(q)) {
            self.query = Some(query);
        }
        self
    }

    /// Query as sent to the remote: no query means an empty object.
    fn effective_query(&self) -> DynamicValue {
        self.query
            .clone()
            .unwrap_or_else(|| DynamicValue::Map(DynamicMap::new()))
    }
}

fn is_empty_query(query: &DynamicValue) -> bool {
    match query {
        DynamicValue::Null => true,
        DynamicValue::Map(map) => map.is_empty(),
        _ => false,
    }
}

const REPLACE_FIELDS: &[&str] = &["name"];

pub struct PaymentsPoolResource {
    env: ResourceEnv,
}

impl PaymentsPoolResource {
    pub fn new(env: ResourceEnv) -> Self {
        Self { env }
    }

    fn missing_id() -> Diagnostic {
        Diagnostic::invalid("id", "pool id is unknown; the pool must be created or imported first")
    }
}

#[async_trait]
impl Resource for PaymentsPoolResource {
    type Model = PaymentsPoolModel;

    fn kind(&self) -> &'static str {
        "payments_pool"
    }

    fn module(&self) -> &'static str {
        "payments"
    }

    fn replace_fields(&self) -> &'static [&'static str] {
        REPLACE_FIELDS
    }

    fn changed_fields(&self, prior: &PaymentsPoolModel, desired: &PaymentsPoolModel) -> Vec<&'static str> {
        let mut changed = Vec::new();
        if prior.name != desired.name {
            changed.push("name");
        }
        if !reconcile::diff(&desired.accounts_ids, &prior.accounts_ids).is_empty() {
            changed.push("accounts_ids");
        }
        if !prior.effective_query().semantically_eq(&desired.effective_query()) {
            changed.push("query");
        }
        changed
    }

    async fn create(&self, ctx: &OperationContext, desired: PaymentsPoolModel) -> Transition<PaymentsPoolModel> {
        let diagnostics = self.validate_config(&desired);
        if diagnostics.has_error() {
            return Transition::failed(diagnostics);
        }
        if let Err(diag) = self.env.ready(ctx).await {
            return Transition::failed(diag);
        }

        let request = CreatePoolRequest {
            name: desired.name.clone(),
            account_ids: desired.accounts_ids.clone(),
            query: desired.query.clone().filter(|q| !is_empty_query(q)),
        };
        match self
            .env
            .call(ctx, self.env.client().payments().create_pool(&request))
            .await
        {
            Ok(id) => Transition::ok(PaymentsPoolModel {
                id: Some(id),
                ..desired
            }),
            Err(diag) => Transition::failed(diag),
        }
    }

    async fn read(&self, ctx: &OperationContext, state: PaymentsPoolModel) -> Transition<PaymentsPoolModel> {
        let Some(id) = state.id.clone() else {
            return Transition::with(Some(state), Self::missing_id());
        };
        if let Err(diag) = self.env.ready(ctx).await {
            return Transition::with(Some(state), diag);
        }
        match self
            .env
            .call(ctx, self.env.client().payments().get_pool(&id))
            .await
        {
            Ok(pool) => Transition::ok(state.apply_remote(pool)),
            Err(diag) => Transition::with(Some(state), diag),
        }
    }

    async fn update(
        &self,
        ctx: &OperationContext,
        observed: PaymentsPoolModel,
        desired: PaymentsPoolModel,
    ) -> Transition<PaymentsPoolModel> {
        let mut diagnostics = self.validate_config(&desired);
        if observed.name != desired.name {
            diagnostics.push(requires_replacement("name"));
        }
        let Some(pool_id) = observed.id.clone() else {
            diagnostics.push(Self::missing_id());
            return Transition::with(Some(observed), diagnostics);
        };
        if diagnostics.has_error() {
            return Transition::with(Some(observed), diagnostics);
        }
        if let Err(diag) = self.env.ready(ctx).await {
            return Transition::with(Some(observed), diag);
        }

        let payments = self.env.client().payments();
        let delta = reconcile::diff(&desired.accounts_ids, &observed.accounts_ids);

        let steps: Vec<String> = delta
            .to_add
            .iter()
            .map(|account| format!("add account '{account}'"))
            .chain(
                delta
                    .to_remove
                    .iter()
                    .map(|account| format!("remove account '{account}'")),
            )
            .collect();

        let mut state = observed;
        let mut applied = 0;

        for account in &delta.to_add {
            if let Err(diag) = self
                .env
                .call(ctx, payments.add_account_to_pool(&pool_id, account))
                .await
            {
                return stopped(state, diag, &steps, applied);
            }
            state.accounts_ids.push(account.clone());
            applied += 1;
            tracing::debug!(pool = %pool_id, account = %account, "account added to pool");
        }

        for account in &delta.to_remove {
            if let Err(diag) = self
                .env
                .call(ctx, payments.remove_account_from_pool(&pool_id, account))
                .await
            {
                return stopped(state, diag, &steps, applied);
            }
            state.accounts_ids.retain(|a| a != account);
            applied += 1;
            tracing::debug!(pool = %pool_id, account = %account, "account removed from pool");
        }

        let query = desired.effective_query();
        if !state.effective_query().semantically_eq(&query) {
            if let Err(diag) = self
                .env
                .call(ctx, payments.update_pool_query(&pool_id, &query))
                .await
            {
                let mut diagnostics = Diagnostics::from(diag);
                if applied > 0 {
                    diagnostics.push(partial_update(&steps, &["update query".to_string()]));
                }
                return Transition::with(Some(state), diagnostics);
            }
        }

        Transition::ok(PaymentsPoolModel {
            id: Some(pool_id),
            ..desired
        })
    }

    async fn delete(&self, ctx: &OperationContext, state: PaymentsPoolModel) -> Diagnostics {
        let Some(id) = state.id else {
            return Self::missing_id().into();
        };
        if let Err(diag) = self.env.ready(ctx).await {
            return diag.into();
        }
        match self
            .env
            .call(ctx, self.env.client().payments().delete_pool(&id))
            .await
        {
            Ok(()) => Diagnostics::new(),
            Err(diag) => diag.into(),
        }
    }

    fn as_validator(&self) -> Option<&dyn ValidateConfig<PaymentsPoolModel>> {
        Some(self)
    }

    fn as_importer(&self) -> Option<&dyn ImportState<PaymentsPoolModel>> {
        Some(self)
    }
}

/// Membership loop stopped at `steps[applied]`. Nothing after it is tried
/// and nothing before it is rolled back.
fn stopped(
    state: PaymentsPoolModel,
    failure: Diagnostic,
    steps: &[String],
    applied: usize,
) -> Transition<PaymentsPoolModel> {
    let mut diagnostics = Diagnostics::from(failure);
    if applied > 0 {
        tracing::warn!(
            applied,
            remaining = steps.len() - applied,
            "pool membership update stopped midway"
        );
        diagnostics.push(partial_update(&steps[..applied], &steps[applied..]));
    }
    Transition::with(Some(state), diagnostics)
}

impl ValidateConfig<PaymentsPoolModel> for PaymentsPoolResource {
    fn validate_config(&self, desired: &PaymentsPoolModel) -> Diagnostics {
        let mut diagnostics = Diagnostics::new();
        require_non_empty(&desired.name, "name", &mut diagnostics);

        match (&desired.query, desired.accounts_ids.is_empty()) {
            (Some(_), false) => diagnostics.push(Diagnostic::invalid(
                "query",
                "only one of 'accounts_ids' or 'query' can be set",
            )),
            (None, true) => diagnostics.push(Diagnostic::invalid(
                "accounts_ids",
                "one of 'accounts_ids' or 'query' must be set",
            )),
            _ => {}
        }

        if let Some(q) = &desired.query {
            if let Err(err) = query::parse(q) {
                diagnostics.push(Diagnostic::invalid("query", err.to_string()));
            }
        }
        if desired.accounts_ids.iter().any(|a| a.trim().is_empty()) {
            diagnostics.push(Diagnostic::invalid("accounts_ids", "account ids cannot be empty"));
        }
        diagnostics
    }
}

#[async_trait]
impl ImportState<PaymentsPoolModel> for PaymentsPoolResource {
    async fn import_state(&self, ctx: &OperationContext, id: &str) -> Transition<PaymentsPoolModel> {
        let state = PaymentsPoolModel {
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
