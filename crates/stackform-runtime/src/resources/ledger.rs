//! Ledger resource (`ledger` module).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use stackform_client::models::ledger::{CreateLedgerRequest, LedgerInfo};
use stackform_core::{Diagnostic, Diagnostics, Severity, Transition, reconcile};

use super::{ResourceEnv, partial_update, require_non_empty, requires_replacement};
use crate::context::OperationContext;
use crate::resource::{ImportState, Resource, ValidateConfig};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerModel {
    /// Ledger name; also its identifier.
    pub name: String,

    /// Storage bucket. Filled by the remote when not given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub features: BTreeMap<String, String>,

    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl LedgerModel {
    /// Overwrite computed fields from a remote read.
    ///
    /// Features are kept to the keys already declared: the remote reports
    /// every default feature and those are not managed here.
    fn apply_remote(mut self, info: LedgerInfo) -> Self {
        if !info.name.is_empty() {
            self.name = info.name;
        }
        if !info.bucket.is_empty() {
            self.bucket = Some(info.bucket);
        }
        self.metadata = info.metadata;
        self.features = info
            .features
            .into_iter()
            .filter(|(key, _)| self.features.contains_key(key))
            .collect();
        self
    }
}

const REPLACE_FIELDS: &[&str] = &["name", "bucket", "features"];

pub struct LedgerResource {
    env: ResourceEnv,
}

impl LedgerResource {
    pub fn new(env: ResourceEnv) -> Self {
        Self { env }
    }

    async fn fetch(&self, ctx: &OperationContext, name: &str) -> Result<LedgerInfo, Diagnostic> {
        self.env
            .call(ctx, self.env.client().ledger().get_ledger(name))
            .await
    }
}

#[async_trait]
impl Resource for LedgerResource {
    type Model = LedgerModel;

    fn kind(&self) -> &'static str {
        "ledger"
    }

    fn module(&self) -> &'static str {
        "ledger"
    }

    fn replace_fields(&self) -> &'static [&'static str] {
        REPLACE_FIELDS
    }

    fn changed_fields(&self, prior: &LedgerModel, desired: &LedgerModel) -> Vec<&'static str> {
        let mut changed = Vec::new();
        if prior.name != desired.name {
            changed.push("name");
        }
        if desired.bucket.is_some() && prior.bucket != desired.bucket {
            changed.push("bucket");
        }
        if prior.features != desired.features {
            changed.push("features");
        }
        if prior.metadata != desired.metadata {
            changed.push("metadata");
        }
        changed
    }

    async fn create(&self, ctx: &OperationContext, desired: LedgerModel) -> Transition<LedgerModel> {
        let diagnostics = self.validate_config(&desired);
        if diagnostics.has_error() {
            return Transition::failed(diagnostics);
        }
        if let Err(diag) = self.env.ready(ctx).await {
            return Transition::failed(diag);
        }

        let request = CreateLedgerRequest {
            bucket: desired.bucket.clone(),
            metadata: desired.metadata.clone(),
            features: desired.features.clone(),
        };
        if let Err(diag) = self
            .env
            .call(ctx, self.env.client().ledger().create_ledger(&desired.name, &request))
            .await
        {
            return Transition::failed(diag);
        }

        // The create response carries no body; read back to fill the bucket.
        match self.fetch(ctx, &desired.name).await {
            Ok(info) => Transition::ok(desired.apply_remote(info)),
            Err(mut diag) => {
                diag.severity = Severity::Warning;
                diag.message = format!("ledger created but could not be read back: {}", diag.message);
                Transition::with(Some(desired), diag)
            }
        }
    }

    async fn read(&self, ctx: &OperationContext, state: LedgerModel) -> Transition<LedgerModel> {
        if let Err(diag) = self.env.ready(ctx).await {
            return Transition::with(Some(state), diag);
        }
        match self.fetch(ctx, &state.name).await {
            Ok(info) => Transition::ok(state.apply_remote(info)),
            Err(diag) => Transition::with(Some(state), diag),
        }
    }

    async fn update(
        &self,
        ctx: &OperationContext,
        observed: LedgerModel,
        desired: LedgerModel,
    ) -> Transition<LedgerModel> {
        let mut diagnostics = self.validate_config(&desired);
        for field in self.changed_fields(&observed, &desired) {
            if REPLACE_FIELDS.contains(&field) {
                diagnostics.push(requires_replacement(field));
            }
        }
        if diagnostics.has_error() {
            return Transition::with(Some(observed), diagnostics);
        }
        if let Err(diag) = self.env.ready(ctx).await {
            return Transition::with(Some(observed), diag);
        }

        let upserts: BTreeMap<String, String> = desired
            .metadata
            .iter()
            .filter(|(key, value)| observed.metadata.get(*key) != Some(*value))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        let desired_keys: Vec<String> = desired.metadata.keys().cloned().collect();
        let observed_keys: Vec<String> = observed.metadata.keys().cloned().collect();
        let removals = reconcile::diff(&desired_keys, &observed_keys).to_remove;

        let mut steps: Vec<String> = Vec::new();
        if !upserts.is_empty() {
            steps.push(format!(
                "set metadata {}",
                upserts.keys().cloned().collect::<Vec<_>>().join(", ")
            ));
        }
        steps.extend(removals.iter().map(|key| format!("delete metadata '{key}'")));

        let ledger = self.env.client().ledger();
        let mut state = observed;
        let mut applied = 0;

        if !upserts.is_empty() {
            if let Err(diag) = self
                .env
                .call(ctx, ledger.update_ledger_metadata(&state.name, &upserts))
                .await
            {
                return Transition::with(Some(state), diag);
            }
            state.metadata.extend(upserts);
            applied += 1;
        }

        for key in &removals {
            if let Err(diag) = self
                .env
                .call(ctx, ledger.delete_ledger_metadata(&state.name, key))
                .await
            {
                let mut diagnostics = Diagnostics::from(diag);
                if applied > 0 {
                    tracing::warn!(ledger = %state.name, applied, "metadata update stopped midway");
                    diagnostics.push(partial_update(&steps[..applied], &steps[applied..]));
                }
                return Transition::with(Some(state), diagnostics);
            }
            state.metadata.remove(key);
            applied += 1;
        }

        tracing::debug!(ledger = %state.name, steps = applied, "ledger metadata converged");
        Transition::ok(state)
    }

    async fn delete(&self, _ctx: &OperationContext, state: LedgerModel) -> Diagnostics {
        tracing::warn!(ledger = %state.name, "ledger deletion is not supported remotely");
        Diagnostic::unsupported(format!(
            "ledger '{}' cannot be deleted remotely; it was only removed from local state",
            state.name
        ))
        .into()
    }

    fn as_validator(&self) -> Option<&dyn ValidateConfig<LedgerModel>> {
        Some(self)
    }

    fn as_importer(&self) -> Option<&dyn ImportState<LedgerModel>> {
        Some(self)
    }
}

impl ValidateConfig<LedgerModel> for LedgerResource {
    fn validate_config(&self, desired: &LedgerModel) -> Diagnostics {
        let mut diagnostics = Diagnostics::new();
        require_non_empty(&desired.name, "name", &mut diagnostics);
        if let Some(bucket) = &desired.bucket {
            require_non_empty(bucket, "bucket", &mut diagnostics);
        }
        diagnostics
    }
}

#[async_trait]
impl ImportState<LedgerModel> for LedgerResource {
    async fn import_state(&self, ctx: &OperationContext, id: &str) -> Transition<LedgerModel> {
        let state = LedgerModel {
            name: id.to_string(),
            ..Default::default()
        };
        let transition = self.read(ctx, state).await;
        if transition.has_error() {
            return Transition::failed(transition.diagnostics);
        }
        transition
    }
}
