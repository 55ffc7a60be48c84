//! Async traits describing the stack API, grouped by module.
//!
//! [`crate::HttpStackClient`] implements every trait. Tests substitute an
//! in-memory implementation.

use async_trait::async_trait;
use stackform_core::{DynamicMap, DynamicValue};
use std::collections::BTreeMap;

use crate::error::ApiResult;
use crate::models::ledger::{CreateLedgerRequest, LedgerInfo, SchemaData, SchemaInfo};
use crate::models::payments::{CreatePoolRequest, Pool};
use crate::models::reconciliation::{Policy, PolicyRequest};
use crate::models::versions::VersionsResponse;
use crate::models::webhooks::{WebhookConfig, WebhookConfigRequest};

/// Entry point to a stack: module health plus one handle per module.
#[async_trait]
pub trait StackApi: Send + Sync {
    /// `GET /versions`: every module with its version and health flag.
    async fn list_module_versions(&self) -> ApiResult<VersionsResponse>;

    fn ledger(&self) -> &dyn LedgerApi;
    fn payments(&self) -> &dyn PaymentsApi;
    fn webhooks(&self) -> &dyn WebhooksApi;
    fn reconciliation(&self) -> &dyn ReconciliationApi;
}

#[async_trait]
pub trait LedgerApi: Send + Sync {
    async fn create_ledger(&self, name: &str, request: &CreateLedgerRequest) -> ApiResult<()>;
    async fn get_ledger(&self, name: &str) -> ApiResult<LedgerInfo>;

    /// Upsert the given metadata keys.
    async fn update_ledger_metadata(
        &self,
        name: &str,
        metadata: &BTreeMap<String, String>,
    ) -> ApiResult<()>;

    async fn delete_ledger_metadata(&self, name: &str, key: &str) -> ApiResult<()>;

    async fn insert_schema(
        &self,
        ledger: &str,
        version: &str,
        schema: &SchemaData,
        idempotency_key: Option<&str>,
    ) -> ApiResult<()>;

    async fn get_schema(&self, ledger: &str, version: &str) -> ApiResult<SchemaInfo>;
}

#[async_trait]
pub trait PaymentsApi: Send + Sync {
    /// Returns the new pool id.
    async fn create_pool(&self, request: &CreatePoolRequest) -> ApiResult<String>;
    async fn get_pool(&self, pool_id: &str) -> ApiResult<Pool>;
    async fn delete_pool(&self, pool_id: &str) -> ApiResult<()>;
    async fn add_account_to_pool(&self, pool_id: &str, account_id: &str) -> ApiResult<()>;
    async fn remove_account_from_pool(&self, pool_id: &str, account_id: &str) -> ApiResult<()>;
    async fn update_pool_query(&self, pool_id: &str, query: &DynamicValue) -> ApiResult<()>;

    /// Install a connector for `provider`. Returns the connector id.
    async fn install_connector(&self, provider: &str, config: &DynamicMap) -> ApiResult<String>;

    /// Flat connector configuration, credentials included when echoed.
    async fn get_connector_config(&self, connector_id: &str) -> ApiResult<DynamicMap>;

    async fn update_connector_config(&self, connector_id: &str, config: &DynamicMap) -> ApiResult<()>;
    async fn uninstall_connector(&self, connector_id: &str) -> ApiResult<()>;
}

#[async_trait]
pub trait WebhooksApi: Send + Sync {
    async fn insert_config(&self, request: &WebhookConfigRequest) -> ApiResult<WebhookConfig>;

    /// Configs filtered by id. Empty when none matches.
    async fn get_configs(&self, id: &str) -> ApiResult<Vec<WebhookConfig>>;

    async fn update_config(&self, id: &str, request: &WebhookConfigRequest) -> ApiResult<()>;
    async fn delete_config(&self, id: &str) -> ApiResult<()>;
}

#[async_trait]
pub trait ReconciliationApi: Send + Sync {
    async fn create_policy(&self, request: &PolicyRequest) -> ApiResult<Policy>;
    async fn get_policy(&self, policy_id: &str) -> ApiResult<Policy>;
    async fn delete_policy(&self, policy_id: &str) -> ApiResult<()>;
}
