//! Request and response models, one module per stack component.

pub mod ledger;
pub mod payments;
pub mod reconciliation;
pub mod versions;
pub mod webhooks;

use serde::{Deserialize, Serialize};

/// `{"data": ...}` wrapper used by most stack responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Data<T> {
    pub data: T,
}

/// `{"cursor": {"data": [...]}}` wrapper used by list endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cursor<T> {
    pub cursor: CursorPage<T>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CursorPage<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,

    #[serde(default)]
    pub has_more: bool,
}
