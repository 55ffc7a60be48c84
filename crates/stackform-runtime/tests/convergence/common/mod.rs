//! Shared test infrastructure for the convergence tests.
//!
//! This module provides:
//! - `FakeStack`, an in-memory `StackApi` that records every call
//! - scripted `/versions` answers for the health gate
//! - failure injection keyed by call label
//! - helpers to build engines against the fake

#![allow(dead_code)]

use async_trait::async_trait;
use stackform_client::models::ledger::{CreateLedgerRequest, LedgerInfo, SchemaData, SchemaInfo};
use stackform_client::models::payments::{CreatePoolRequest, Pool};
use stackform_client::models::reconciliation::{Policy, PolicyRequest};
use stackform_client::models::versions::{ModuleVersion, VersionsResponse};
use stackform_client::models::webhooks::{WebhookConfig, WebhookConfigRequest};
use stackform_client::{
    ApiError, ApiResult, LedgerApi, PaymentsApi, ReconciliationApi, RemoteError, ResponseContext,
    StackApi, WebhooksApi,
};
use stackform_core::{DynamicMap, DynamicValue};
use stackform_runtime::ModuleHealthGate;
use stackform_runtime::resources::ResourceEnv;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

pub const MODULES: &[&str] = &["ledger", "payments", "webhooks", "reconciliation"];

pub const TRACEPARENT: &str = "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01";

// =============================================================================
// FAKE STACK
// =============================================================================

#[derive(Default)]
struct State {
    calls: Vec<String>,
    versions: VecDeque<VersionsResponse>,
    last_versions: Option<VersionsResponse>,
    failures: HashMap<String, ApiError>,
    next_id: usize,

    ledgers: BTreeMap<String, LedgerInfo>,
    schemas: BTreeMap<(String, String), SchemaInfo>,
    pools: BTreeMap<String, Pool>,
    connectors: BTreeMap<String, DynamicMap>,
    webhooks: BTreeMap<String, WebhookConfig>,
    policies: BTreeMap<String, Policy>,
}

impl State {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{}", self.next_id)
    }
}

/// In-memory stack. Every module reports healthy unless scripted otherwise.
pub struct FakeStack {
    state: Mutex<State>,
}

impl FakeStack {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(State::default()),
        })
    }

    /// Queue `/versions` answers. The last one repeats.
    pub fn script_health(&self, answers: Vec<VersionsResponse>) {
        self.lock().versions.extend(answers);
    }

    /// Fail the call with this label instead of executing it.
    pub fn fail_on(&self, call: &str, error: ApiError) {
        self.lock().failures.insert(call.to_string(), error);
    }

    /// Every call received so far, health polls included.
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    /// Calls other than health polls.
    pub fn api_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c != "list_module_versions")
            .collect()
    }

    pub fn health_polls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| *c == "list_module_versions")
            .count()
    }

    pub fn seed_ledger(&self, info: LedgerInfo) {
        self.lock().ledgers.insert(info.name.clone(), info);
    }

    pub fn ledger(&self, name: &str) -> Option<LedgerInfo> {
        self.lock().ledgers.get(name).cloned()
    }

    pub fn seed_pool(&self, pool: Pool) {
        self.lock().pools.insert(pool.id.clone(), pool);
    }

    pub fn pool(&self, id: &str) -> Option<Pool> {
        self.lock().pools.get(id).cloned()
    }

    pub fn connector(&self, id: &str) -> Option<DynamicMap> {
        self.lock().connectors.get(id).cloned()
    }

    pub fn webhook(&self, id: &str) -> Option<WebhookConfig> {
        self.lock().webhooks.get(id).cloned()
    }

    pub fn policy(&self, id: &str) -> Option<Policy> {
        self.lock().policies.get(id).cloned()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    /// Record `call`, then either fail it or hand out the state.
    fn begin(&self, call: String) -> ApiResult<MutexGuard<'_, State>> {
        let mut state = self.lock();
        state.calls.push(call.clone());
        if let Some(error) = state.failures.get(&call).cloned() {
            return Err(error);
        }
        Ok(state)
    }
}

pub fn versions(healthy: &[&str]) -> VersionsResponse {
    VersionsResponse {
        region: None,
        env: None,
        versions: MODULES
            .iter()
            .map(|name| ModuleVersion {
                name: name.to_string(),
                version: "v2.0.0".into(),
                health: healthy.contains(name),
            })
            .collect(),
    }
}

pub fn not_found(message: &str) -> ApiError {
    ApiError::new(
        RemoteError::V3ErrorResponse {
            error_code: "NOT_FOUND".into(),
            error_message: message.into(),
            details: None,
        },
        ResponseContext {
            status: Some(404),
            traceparent: Some(TRACEPARENT.into()),
        },
    )
}

pub fn validation_error(message: &str) -> ApiError {
    ApiError::new(
        RemoteError::ErrorResponse {
            error_code: "VALIDATION".into(),
            error_message: message.into(),
            details: None,
        },
        ResponseContext {
            status: Some(400),
            traceparent: Some(TRACEPARENT.into()),
        },
    )
}

fn missing<T>(what: &str) -> ApiResult<T> {
    Err(not_found(&format!("{what} not found")))
}

#[async_trait]
impl StackApi for FakeStack {
    async fn list_module_versions(&self) -> ApiResult<VersionsResponse> {
        let mut state = self.begin("list_module_versions".into())?;
        if let Some(next) = state.versions.pop_front() {
            state.last_versions = Some(next);
        }
        Ok(state
            .last_versions
            .clone()
            .unwrap_or_else(|| versions(MODULES)))
    }

    fn ledger(&self) -> &dyn LedgerApi {
        self
    }

    fn payments(&self) -> &dyn PaymentsApi {
        self
    }

    fn webhooks(&self) -> &dyn WebhooksApi {
        self
    }

    fn reconciliation(&self) -> &dyn ReconciliationApi {
        self
    }
}

#[async_trait]
impl LedgerApi for FakeStack {
    async fn create_ledger(&self, name: &str, request: &CreateLedgerRequest) -> ApiResult<()> {
        let mut state = self.begin(format!("create_ledger {name}"))?;
        let info = LedgerInfo {
            name: name.to_string(),
            bucket: request.bucket.clone().unwrap_or_else(|| "_default".into()),
            metadata: request.metadata.clone(),
            features: request.features.clone(),
            added_at: Some("2024-01-01T00:00:00Z".into()),
        };
        state.ledgers.insert(name.to_string(), info);
        Ok(())
    }

    async fn get_ledger(&self, name: &str) -> ApiResult<LedgerInfo> {
        let state = self.begin(format!("get_ledger {name}"))?;
        match state.ledgers.get(name) {
            Some(info) => Ok(info.clone()),
            None => missing("ledger"),
        }
    }

    async fn update_ledger_metadata(
        &self,
        name: &str,
        metadata: &BTreeMap<String, String>,
    ) -> ApiResult<()> {
        let keys: Vec<&str> = metadata.keys().map(String::as_str).collect();
        let mut state = self.begin(format!("update_ledger_metadata {name} {}", keys.join(",")))?;
        match state.ledgers.get_mut(name) {
            Some(info) => {
                info.metadata.extend(metadata.clone());
                Ok(())
            }
            None => missing("ledger"),
        }
    }

    async fn delete_ledger_metadata(&self, name: &str, key: &str) -> ApiResult<()> {
        let mut state = self.begin(format!("delete_ledger_metadata {name} {key}"))?;
        match state.ledgers.get_mut(name) {
            Some(info) => {
                info.metadata.remove(key);
                Ok(())
            }
            None => missing("ledger"),
        }
    }

    async fn insert_schema(
        &self,
        ledger: &str,
        version: &str,
        schema: &SchemaData,
        _idempotency_key: Option<&str>,
    ) -> ApiResult<()> {
        let mut state = self.begin(format!("insert_schema {ledger} {version}"))?;
        let info = SchemaInfo {
            version: version.to_string(),
            chart: schema.chart.clone().unwrap_or_default(),
            transactions: schema.transactions.clone().unwrap_or_default(),
            created_at: None,
        };
        state
            .schemas
            .insert((ledger.to_string(), version.to_string()), info);
        Ok(())
    }

    async fn get_schema(&self, ledger: &str, version: &str) -> ApiResult<SchemaInfo> {
        let state = self.begin(format!("get_schema {ledger} {version}"))?;
        match state.schemas.get(&(ledger.to_string(), version.to_string())) {
            Some(info) => Ok(info.clone()),
            None => missing("schema"),
        }
    }
}

#[async_trait]
impl PaymentsApi for FakeStack {
    async fn create_pool(&self, request: &CreatePoolRequest) -> ApiResult<String> {
        let mut state = self.begin(format!("create_pool {}", request.name))?;
        let id = state.next_id("pool");
        let pool = Pool {
            id: id.clone(),
            name: request.name.clone(),
            created_at: None,
            pool_accounts: request.account_ids.clone(),
            query: request.query.clone(),
        };
        state.pools.insert(id.clone(), pool);
        Ok(id)
    }

    async fn get_pool(&self, pool_id: &str) -> ApiResult<Pool> {
        let state = self.begin(format!("get_pool {pool_id}"))?;
        match state.pools.get(pool_id) {
            Some(pool) => Ok(pool.clone()),
            None => missing("pool"),
        }
    }

    async fn delete_pool(&self, pool_id: &str) -> ApiResult<()> {
        let mut state = self.begin(format!("delete_pool {pool_id}"))?;
        match state.pools.remove(pool_id) {
            Some(_) => Ok(()),
            None => missing("pool"),
        }
    }

    async fn add_account_to_pool(&self, pool_id: &str, account_id: &str) -> ApiResult<()> {
        let mut state = self.begin(format!("add_account_to_pool {pool_id} {account_id}"))?;
        match state.pools.get_mut(pool_id) {
            Some(pool) => {
                pool.pool_accounts.push(account_id.to_string());
                Ok(())
            }
            None => missing("pool"),
        }
    }

    async fn remove_account_from_pool(&self, pool_id: &str, account_id: &str) -> ApiResult<()> {
        let mut state = self.begin(format!("remove_account_from_pool {pool_id} {account_id}"))?;
        match state.pools.get_mut(pool_id) {
            Some(pool) => {
                pool.pool_accounts.retain(|a| a != account_id);
                Ok(())
            }
            None => missing("pool"),
        }
    }

    async fn update_pool_query(&self, pool_id: &str, query: &DynamicValue) -> ApiResult<()> {
        let mut state = self.begin(format!("update_pool_query {pool_id}"))?;
        match state.pools.get_mut(pool_id) {
            Some(pool) => {
                pool.query = Some(query.clone());
                Ok(())
            }
            None => missing("pool"),
        }
    }

    async fn install_connector(&self, provider: &str, config: &DynamicMap) -> ApiResult<String> {
        let mut state = self.begin(format!("install_connector {provider}"))?;
        let id = state.next_id("conn");
        state.connectors.insert(id.clone(), config.clone());
        Ok(id)
    }

    /// Secrets are never echoed back; an extra server-side key is added.
    async fn get_connector_config(&self, connector_id: &str) -> ApiResult<DynamicMap> {
        let state = self.begin(format!("get_connector_config {connector_id}"))?;
        let Some(stored) = state.connectors.get(connector_id) else {
            return missing("connector");
        };
        let mut flat: DynamicMap = stored
            .iter()
            .filter(|(key, _)| !matches!(key.as_str(), "apiKey" | "secret" | "clientSecret"))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        flat.insert("pollingPeriod".into(), DynamicValue::from("2m"));
        Ok(flat)
    }

    async fn update_connector_config(&self, connector_id: &str, config: &DynamicMap) -> ApiResult<()> {
        let mut state = self.begin(format!("update_connector_config {connector_id}"))?;
        match state.connectors.get_mut(connector_id) {
            Some(stored) => {
                *stored = config.clone();
                Ok(())
            }
            None => missing("connector"),
        }
    }

    async fn uninstall_connector(&self, connector_id: &str) -> ApiResult<()> {
        let mut state = self.begin(format!("uninstall_connector {connector_id}"))?;
        match state.connectors.remove(connector_id) {
            Some(_) => Ok(()),
            None => missing("connector"),
        }
    }
}

#[async_trait]
impl WebhooksApi for FakeStack {
    async fn insert_config(&self, request: &WebhookConfigRequest) -> ApiResult<WebhookConfig> {
        let mut state = self.begin(format!("insert_config {}", request.endpoint))?;
        let id = state.next_id("wh");
        let config = WebhookConfig {
            id: id.clone(),
            endpoint: request.endpoint.clone(),
            event_types: request.event_types.clone(),
            name: request.name.clone(),
            secret: request
                .secret
                .clone()
                .or_else(|| Some("whsec_generated".into())),
            active: true,
            created_at: None,
        };
        state.webhooks.insert(id, config.clone());
        Ok(config)
    }

    async fn get_configs(&self, id: &str) -> ApiResult<Vec<WebhookConfig>> {
        let state = self.begin(format!("get_configs {id}"))?;
        Ok(state.webhooks.get(id).cloned().into_iter().collect())
    }

    async fn update_config(&self, id: &str, request: &WebhookConfigRequest) -> ApiResult<()> {
        let mut state = self.begin(format!("update_config {id}"))?;
        match state.webhooks.get_mut(id) {
            Some(config) => {
                config.endpoint = request.endpoint.clone();
                config.event_types = request.event_types.clone();
                config.name = request.name.clone();
                config.secret = request.secret.clone();
                Ok(())
            }
            None => missing("webhook"),
        }
    }

    async fn delete_config(&self, id: &str) -> ApiResult<()> {
        let mut state = self.begin(format!("delete_config {id}"))?;
        match state.webhooks.remove(id) {
            Some(_) => Ok(()),
            None => missing("webhook"),
        }
    }
}

#[async_trait]
impl ReconciliationApi for FakeStack {
    async fn create_policy(&self, request: &PolicyRequest) -> ApiResult<Policy> {
        let mut state = self.begin(format!("create_policy {}", request.name))?;
        let id = state.next_id("pol");
        let policy = Policy {
            id: id.clone(),
            name: request.name.clone(),
            ledger_name: request.ledger_name.clone(),
            ledger_query: Some(request.ledger_query.clone()),
            payments_pool_id: request.payments_pool_id.clone(),
            created_at: chrono::DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
                .unwrap()
                .with_timezone(&chrono::Utc),
        };
        state.policies.insert(id, policy.clone());
        Ok(policy)
    }

    async fn get_policy(&self, policy_id: &str) -> ApiResult<Policy> {
        let state = self.begin(format!("get_policy {policy_id}"))?;
        match state.policies.get(policy_id) {
            Some(policy) => Ok(policy.clone()),
            None => missing("policy"),
        }
    }

    async fn delete_policy(&self, policy_id: &str) -> ApiResult<()> {
        let mut state = self.begin(format!("delete_policy {policy_id}"))?;
        match state.policies.remove(policy_id) {
            Some(_) => Ok(()),
            None => missing("policy"),
        }
    }
}

// =============================================================================
// ENGINE HELPERS
// =============================================================================

/// Engine environment against `stack` with a short gate.
pub fn env(stack: &Arc<FakeStack>, module: &str) -> ResourceEnv {
    env_with_gate(stack, module, Duration::from_secs(2), Duration::from_millis(10))
}

pub fn env_with_gate(
    stack: &Arc<FakeStack>,
    module: &str,
    timeout: Duration,
    poll_interval: Duration,
) -> ResourceEnv {
    let client: Arc<dyn StackApi> = stack.clone();
    let gate = ModuleHealthGate::new(client.clone(), module)
        .with_timeout(timeout)
        .with_poll_interval(poll_interval);
    ResourceEnv::new(client, gate)
}

pub fn json_value(raw: serde_json::Value) -> DynamicValue {
    DynamicValue::decode(&raw)
}

pub fn json_map(raw: serde_json::Value) -> DynamicMap {
    match DynamicValue::decode(&raw) {
        DynamicValue::Map(map) => map,
        other => panic!("expected an object, got {other:?}"),
    }
}
