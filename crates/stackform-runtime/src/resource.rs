//! The resource contract implemented by every convergence engine.

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use stackform_core::{Diagnostics, Transition};

use crate::context::OperationContext;

/// What `plan` decided for one resource instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanAction {
    Create,
    NoOp,
    Update,
    Replace,
}

/// Outcome of comparing prior state with desired configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Plan {
    pub action: PlanAction,
    /// Fields whose value differs.
    pub changed: Vec<&'static str>,
    /// Changed fields that cannot be updated in place.
    pub requires_replace: Vec<&'static str>,
}

impl Plan {
    pub fn create() -> Self {
        Self {
            action: PlanAction::Create,
            changed: Vec::new(),
            requires_replace: Vec::new(),
        }
    }

    /// Classify a list of changed fields against the replace-only set.
    pub fn from_changes(changed: Vec<&'static str>, replace_fields: &[&'static str]) -> Self {
        let requires_replace: Vec<&'static str> = changed
            .iter()
            .copied()
            .filter(|field| replace_fields.contains(field))
            .collect();

        let action = if changed.is_empty() {
            PlanAction::NoOp
        } else if requires_replace.is_empty() {
            PlanAction::Update
        } else {
            PlanAction::Replace
        };

        Self {
            action,
            changed,
            requires_replace,
        }
    }
}

/// One kind of remote object and its four state transitions.
///
/// Transitions never return `Err`. Everything that went wrong is in the
/// diagnostics of the returned [`Transition`].
#[async_trait]
pub trait Resource: Send + Sync {
    type Model: Clone + Send + Sync + Serialize + DeserializeOwned + 'static;

    /// Resource kind name, e.g. `payments_pool`.
    fn kind(&self) -> &'static str;

    /// Stack module the resource lives in; the health gate waits on it.
    fn module(&self) -> &'static str;

    /// Fields that force delete + create when they change.
    fn replace_fields(&self) -> &'static [&'static str] {
        &[]
    }

    /// Fields whose value differs between `prior` and `desired`.
    fn changed_fields(&self, prior: &Self::Model, desired: &Self::Model) -> Vec<&'static str>;

    fn plan(&self, prior: Option<&Self::Model>, desired: &Self::Model) -> Plan {
        match prior {
            None => Plan::create(),
            Some(prior) => Plan::from_changes(self.changed_fields(prior, desired), self.replace_fields()),
        }
    }

    async fn create(&self, ctx: &OperationContext, desired: Self::Model) -> Transition<Self::Model>;

    async fn read(&self, ctx: &OperationContext, state: Self::Model) -> Transition<Self::Model>;

    async fn update(
        &self,
        ctx: &OperationContext,
        observed: Self::Model,
        desired: Self::Model,
    ) -> Transition<Self::Model>;

    async fn delete(&self, ctx: &OperationContext, state: Self::Model) -> Diagnostics;

    /// Local configuration checks, when the kind has any.
    fn as_validator(&self) -> Option<&dyn ValidateConfig<Self::Model>> {
        None
    }

    /// Adoption of an existing remote object by identifier, when supported.
    fn as_importer(&self) -> Option<&dyn ImportState<Self::Model>> {
        None
    }
}

/// Local, zero-network validation of a desired configuration.
pub trait ValidateConfig<M>: Send + Sync {
    fn validate_config(&self, desired: &M) -> Diagnostics;
}

/// Build state for a remote object that already exists.
#[async_trait]
pub trait ImportState<M>: Send + Sync {
    async fn import_state(&self, ctx: &OperationContext, id: &str) -> Transition<M>;
}
