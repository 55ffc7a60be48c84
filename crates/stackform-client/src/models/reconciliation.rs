use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stackform_core::DynamicMap;

/// Body of `POST /api/reconciliation/policies`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyRequest {
    pub name: String,
    pub ledger_name: String,

    #[serde(default)]
    pub ledger_query: DynamicMap,

    #[serde(rename = "paymentsPoolID")]
    pub payments_pool_id: String,
}

/// A reconciliation policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    pub id: String,
    pub name: String,
    pub ledger_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ledger_query: Option<DynamicMap>,

    #[serde(rename = "paymentsPoolID")]
    pub payments_pool_id: String,

    pub created_at: DateTime<Utc>,
}
