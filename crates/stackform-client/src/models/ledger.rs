use serde::{Deserialize, Serialize};
use stackform_core::DynamicValue;
use std::collections::BTreeMap;

/// Body of `POST /api/ledger/v2/{ledger}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateLedgerRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub features: BTreeMap<String, String>,
}

/// A ledger as returned by `GET /api/ledger/v2/{ledger}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerInfo {
    pub name: String,

    #[serde(default)]
    pub bucket: String,

    #[serde(default)]
    pub metadata: BTreeMap<String, String>,

    #[serde(default)]
    pub features: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added_at: Option<String>,
}

/// Body of `POST /api/ledger/v2/{ledger}/schema/{version}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart: Option<DynamicValue>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transactions: Option<DynamicValue>,
}

/// A stored ledger schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaInfo {
    pub version: String,

    #[serde(default)]
    pub chart: DynamicValue,

    #[serde(default)]
    pub transactions: DynamicValue,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}
