//! Ledger schema resource (`ledger` module).
//!
//! A schema version is immutable once inserted: every structural field forces
//! replacement and neither update nor delete exist remotely.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use stackform_client::models::ledger::{SchemaData, SchemaInfo};
use stackform_core::{Diagnostic, Diagnostics, DynamicKind, DynamicMap, DynamicValue, Transition};

use super::{ResourceEnv, require_non_empty};
use crate::context::OperationContext;
use crate::resource::{Resource, ValidateConfig};

/// Interpreter runtimes accepted by transaction templates.
pub const TRANSACTION_RUNTIMES: &[&str] = &["experimental-interpreter", "machine"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerSchemaModel {
    pub ledger: String,
    pub version: String,

    /// Chart of accounts: nested account segments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart: Option<DynamicValue>,

    /// Transaction templates by name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transactions: Option<DynamicValue>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
}

impl LedgerSchemaModel {
    fn apply_remote(mut self, info: SchemaInfo) -> Self {
        if !info.version.is_empty() {
            self.version = info.version;
        }
        self.chart = remote_or_prior(info.chart, self.chart.is_some());
        self.transactions = remote_or_prior(info.transactions, self.transactions.is_some());
        self
    }
}

/// A non-empty remote object wins. An empty one is only kept when the
/// attribute was declared, so an undeclared attribute stays absent.
fn remote_or_prior(remote: DynamicValue, declared: bool) -> Option<DynamicValue> {
    let empty = match &remote {
        DynamicValue::Null => true,
        DynamicValue::Map(map) => map.is_empty(),
        _ => false,
    };
    if !empty {
        Some(remote)
    } else if declared {
        Some(DynamicValue::Map(DynamicMap::new()))
    } else {
        None
    }
}

const REPLACE_FIELDS: &[&str] = &["ledger", "version", "chart", "transactions"];

pub struct LedgerSchemaResource {
    env: ResourceEnv,
}

impl LedgerSchemaResource {
    pub fn new(env: ResourceEnv) -> Self {
        Self { env }
    }
}

#[async_trait]
impl Resource for LedgerSchemaResource {
    type Model = LedgerSchemaModel;

    fn kind(&self) -> &'static str {
        "ledger_schema"
    }

    fn module(&self) -> &'static str {
        "ledger"
    }

    fn replace_fields(&self) -> &'static [&'static str] {
        REPLACE_FIELDS
    }

    fn changed_fields(&self, prior: &LedgerSchemaModel, desired: &LedgerSchemaModel) -> Vec<&'static str> {
        let mut changed = Vec::new();
        if prior.ledger != desired.ledger {
            changed.push("ledger");
        }
        if prior.version != desired.version {
            changed.push("version");
        }
        if !same_document(&prior.chart, &desired.chart) {
            changed.push("chart");
        }
        if !same_document(&prior.transactions, &desired.transactions) {
            changed.push("transactions");
        }
        if prior.idempotency_key != desired.idempotency_key {
            changed.push("idempotency_key");
        }
        changed
    }

    async fn create(&self, ctx: &OperationContext, desired: LedgerSchemaModel) -> Transition<LedgerSchemaModel> {
        let diagnostics = self.validate_config(&desired);
        if diagnostics.has_error() {
            return Transition::failed(diagnostics);
        }
        if let Err(diag) = self.env.ready(ctx).await {
            return Transition::failed(diag);
        }

        let schema = SchemaData {
            chart: desired.chart.clone(),
            transactions: desired.transactions.clone(),
        };
        let inserted = self
            .env
            .call(
                ctx,
                self.env.client().ledger().insert_schema(
                    &desired.ledger,
                    &desired.version,
                    &schema,
                    desired.idempotency_key.as_deref(),
                ),
            )
            .await;

        match inserted {
            Ok(()) => Transition::ok(desired),
            Err(diag) => Transition::failed(diag),
        }
    }

    async fn read(&self, ctx: &OperationContext, state: LedgerSchemaModel) -> Transition<LedgerSchemaModel> {
        if let Err(diag) = self.env.ready(ctx).await {
            return Transition::with(Some(state), diag);
        }
        let fetched = self
            .env
            .call(
                ctx,
                self.env.client().ledger().get_schema(&state.ledger, &state.version),
            )
            .await;

        match fetched {
            Ok(info) => Transition::ok(state.apply_remote(info)),
            Err(diag) => Transition::with(Some(state), diag),
        }
    }

    async fn update(
        &self,
        _ctx: &OperationContext,
        observed: LedgerSchemaModel,
        desired: LedgerSchemaModel,
    ) -> Transition<LedgerSchemaModel> {
        let state = LedgerSchemaModel {
            idempotency_key: desired.idempotency_key,
            ..observed
        };
        Transition::with(
            Some(state),
            Diagnostic::unsupported(
                "ledger schemas cannot be updated; bump the version to insert a new schema",
            ),
        )
    }

    async fn delete(&self, _ctx: &OperationContext, state: LedgerSchemaModel) -> Diagnostics {
        Diagnostic::unsupported(format!(
            "schema '{}' of ledger '{}' cannot be deleted remotely; it was only removed from local state",
            state.version, state.ledger
        ))
        .into()
    }

    fn as_validator(&self) -> Option<&dyn ValidateConfig<LedgerSchemaModel>> {
        Some(self)
    }
}

impl ValidateConfig<LedgerSchemaModel> for LedgerSchemaResource {
    fn validate_config(&self, desired: &LedgerSchemaModel) -> Diagnostics {
        let mut diagnostics = Diagnostics::new();
        require_non_empty(&desired.ledger, "ledger", &mut diagnostics);
        require_non_empty(&desired.version, "version", &mut diagnostics);

        if desired.chart.is_none() && desired.transactions.is_none() {
            diagnostics.push(Diagnostic::invalid(
                "chart",
                "at least one of 'chart' or 'transactions' must be set",
            ));
        }
        if let Some(chart) = &desired.chart {
            match chart.as_map() {
                Some(segments) => validate_chart(segments, "chart", &mut diagnostics),
                None => diagnostics.push(not_an_object("chart", chart)),
            }
        }
        if let Some(transactions) = &desired.transactions {
            match transactions.as_map() {
                Some(templates) => validate_transactions(templates, &mut diagnostics),
                None => diagnostics.push(not_an_object("transactions", transactions)),
            }
        }
        diagnostics
    }
}

fn same_document(a: &Option<DynamicValue>, b: &Option<DynamicValue>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => a.semantically_eq(b),
        _ => false,
    }
}

fn not_an_object(path: &str, value: &DynamicValue) -> Diagnostic {
    Diagnostic::invalid(
        path,
        format!("{path}: expected {}, found {}", DynamicKind::Map, value.kind()),
    )
}

/// Chart segments: plain keys are account segments (objects), dotted keys
/// are segment properties.
fn validate_chart(segments: &DynamicMap, path: &str, diagnostics: &mut Diagnostics) {
    for (key, value) in segments {
        let at = format!("{path}.{key}");
        let expected = match key.as_str() {
            ".pattern" => DynamicKind::String,
            ".metadata" | ".self" => DynamicKind::Map,
            ".rules" => DynamicKind::List,
            dotted if dotted.starts_with('.') => {
                diagnostics.push(Diagnostic::invalid(
                    at.clone(),
                    format!("{at}: unknown segment property '{dotted}'"),
                ));
                continue;
            }
            _ => {
                match value.as_map() {
                    Some(children) => validate_chart(children, &at, diagnostics),
                    None => diagnostics.push(not_an_object(&at, value)),
                }
                continue;
            }
        };
        if value.kind() != expected {
            diagnostics.push(Diagnostic::invalid(
                at.clone(),
                format!("{at}: expected {expected}, found {}", value.kind()),
            ));
        }
    }
}

fn validate_transactions(templates: &DynamicMap, diagnostics: &mut Diagnostics) {
    for (name, template) in templates {
        let at = format!("transactions.{name}");
        let Some(fields) = template.as_map() else {
            diagnostics.push(not_an_object(&at, template));
            continue;
        };

        match fields.get("script") {
            Some(DynamicValue::String(_)) => {}
            Some(other) => diagnostics.push(Diagnostic::invalid(
                format!("{at}.script"),
                format!("{at}.script: expected string, found {}", other.kind()),
            )),
            None => diagnostics.push(Diagnostic::invalid(
                format!("{at}.script"),
                format!("{at}: missing required field 'script'"),
            )),
        }

        if let Some(description) = fields.get("description") {
            if description.as_str().is_none() && !description.is_null() {
                diagnostics.push(Diagnostic::invalid(
                    format!("{at}.description"),
                    format!("{at}.description: expected string, found {}", description.kind()),
                ));
            }
        }

        if let Some(runtime) = fields.get("runtime") {
            if !runtime.is_null() && !runtime.as_str().is_some_and(|r| TRANSACTION_RUNTIMES.contains(&r)) {
                diagnostics.push(Diagnostic::invalid(
                    format!("{at}.runtime"),
                    format!(
                        "{at}.runtime: must be one of {}, found {runtime}",
                        TRANSACTION_RUNTIMES.join(", ")
                    ),
                ));
            }
        }
    }
}
