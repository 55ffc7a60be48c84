use serde::{Deserialize, Serialize};
use stackform_core::DynamicValue;

/// Body of `POST /api/payments/v3/pools`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreatePoolRequest {
    pub name: String,

    #[serde(rename = "accountIDs", default, skip_serializing_if = "Vec::is_empty")]
    pub account_ids: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<DynamicValue>,
}

/// A payments pool.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pool {
    pub id: String,
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,

    #[serde(default)]
    pub pool_accounts: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<DynamicValue>,
}

/// Body of `PUT /api/payments/v3/pools/{pool}/query`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdatePoolQueryRequest {
    pub query: DynamicValue,
}
