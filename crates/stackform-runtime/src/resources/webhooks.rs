//! Webhook subscription resource (`webhooks` module).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use stackform_client::models::webhooks::{WebhookConfig, WebhookConfigRequest};
use stackform_core::{Diagnostic, DiagnosticCategory, Diagnostics, Transition, reconcile};

use super::{ResourceEnv, require_non_empty};
use crate::context::OperationContext;
use crate::resource::{ImportState, Resource, ValidateConfig};

#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WebhooksModel {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    pub endpoint: String,

    pub event_types: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Signing secret. Generated by the remote when not given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
}

impl fmt::Debug for WebhooksModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebhooksModel")
            .field("id", &self.id)
            .field("endpoint", &self.endpoint)
            .field("event_types", &self.event_types)
            .field("name", &self.name)
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl WebhooksModel {
    fn request(&self) -> WebhookConfigRequest {
        WebhookConfigRequest {
            endpoint: self.endpoint.clone(),
            event_types: self.event_types.clone(),
            name: non_empty(&self.name),
            secret: non_empty(&self.secret),
        }
    }

    fn apply_remote(mut self, config: WebhookConfig) -> Self {
        self.id = Some(config.id);
        self.endpoint = config.endpoint;
        self.event_types = config.event_types;
        if let Some(name) = non_empty(&config.name) {
            self.name = Some(name);
        }
        if let Some(secret) = non_empty(&config.secret) {
            self.secret = Some(secret);
        }
        self
    }

    fn same_event_types(&self, other: &WebhooksModel) -> bool {
        reconcile::diff(&self.event_types, &other.event_types).is_empty()
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|v| !v.is_empty()).cloned()
}

pub struct WebhooksResource {
    env: ResourceEnv,
}

impl WebhooksResource {
    pub fn new(env: ResourceEnv) -> Self {
        Self { env }
    }

    fn missing_id() -> Diagnostic {
        Diagnostic::invalid("id", "webhook id is unknown; the webhook must be created first")
    }
}

#[async_trait]
impl Resource for WebhooksResource {
    type Model = WebhooksModel;

    fn kind(&self) -> &'static str {
        "webhooks"
    }

    fn module(&self) -> &'static str {
        "webhooks"
    }

    fn changed_fields(&self, prior: &WebhooksModel, desired: &WebhooksModel) -> Vec<&'static str> {
        let mut changed = Vec::new();
        if prior.endpoint != desired.endpoint {
            changed.push("endpoint");
        }
        if !prior.same_event_types(desired) {
            changed.push("event_types");
        }
        if desired.name.is_some() && prior.name != desired.name {
            changed.push("name");
        }
        if desired.secret.is_some() && prior.secret != desired.secret {
            changed.push("secret");
        }
        changed
    }

    async fn create(&self, ctx: &OperationContext, desired: WebhooksModel) -> Transition<WebhooksModel> {
        let diagnostics = self.validate_config(&desired);
        if diagnostics.has_error() {
            return Transition::failed(diagnostics);
        }
        if let Err(diag) = self.env.ready(ctx).await {
            return Transition::failed(diag);
        }

        match self
            .env
            .call(ctx, self.env.client().webhooks().insert_config(&desired.request()))
            .await
        {
            Ok(config) => Transition::ok(desired.apply_remote(config)),
            Err(diag) => Transition::failed(diag),
        }
    }

    async fn read(&self, ctx: &OperationContext, state: WebhooksModel) -> Transition<WebhooksModel> {
        let Some(id) = state.id.clone() else {
            return Transition::with(Some(state), Self::missing_id());
        };
        if let Err(diag) = self.env.ready(ctx).await {
            return Transition::with(Some(state), diag);
        }

        let configs = match self
            .env
            .call(ctx, self.env.client().webhooks().get_configs(&id))
            .await
        {
            Ok(configs) => configs,
            Err(diag) => return Transition::with(Some(state), diag),
        };

        match configs.into_iter().find(|c| c.id == id) {
            Some(config) => Transition::ok(state.apply_remote(config)),
            None => Transition::with(
                Some(state),
                Diagnostic::error(
                    DiagnosticCategory::Remote,
                    "WEBHOOK_NOT_FOUND",
                    format!("webhook configuration '{id}' not found"),
                )
                .with_attribute("id"),
            ),
        }
    }

    async fn update(
        &self,
        ctx: &OperationContext,
        observed: WebhooksModel,
        desired: WebhooksModel,
    ) -> Transition<WebhooksModel> {
        let diagnostics = self.validate_config(&desired);
        if diagnostics.has_error() {
            return Transition::with(Some(observed), diagnostics);
        }
        let Some(id) = observed.id.clone() else {
            return Transition::with(Some(observed), Self::missing_id());
        };
        if self.changed_fields(&observed, &desired).is_empty() {
            return Transition::ok(observed);
        }
        if let Err(diag) = self.env.ready(ctx).await {
            return Transition::with(Some(observed), diag);
        }

        let mut request = desired.request();
        if request.secret.is_none() {
            request.secret = non_empty(&observed.secret);
        }
        match self
            .env
            .call(ctx, self.env.client().webhooks().update_config(&id, &request))
            .await
        {
            Ok(()) => Transition::ok(WebhooksModel {
                id: Some(id),
                secret: request.secret,
                name: desired.name.or(observed.name),
                ..desired
            }),
            Err(diag) => Transition::with(Some(observed), diag),
        }
    }

    async fn delete(&self, ctx: &OperationContext, state: WebhooksModel) -> Diagnostics {
        let Some(id) = state.id else {
            return Self::missing_id().into();
        };
        if let Err(diag) = self.env.ready(ctx).await {
            return diag.into();
        }
        match self
            .env
            .call(ctx, self.env.client().webhooks().delete_config(&id))
            .await
        {
            Ok(()) => Diagnostics::new(),
            Err(diag) => diag.into(),
        }
    }

    fn as_validator(&self) -> Option<&dyn ValidateConfig<WebhooksModel>> {
        Some(self)
    }

    fn as_importer(&self) -> Option<&dyn ImportState<WebhooksModel>> {
        Some(self)
    }
}

impl ValidateConfig<WebhooksModel> for WebhooksResource {
    fn validate_config(&self, desired: &WebhooksModel) -> Diagnostics {
        let mut diagnostics = Diagnostics::new();
        require_non_empty(&desired.endpoint, "endpoint", &mut diagnostics);
        if desired.event_types.is_empty() {
            diagnostics.push(Diagnostic::invalid(
                "event_types",
                "at least one event type is required",
            ));
        }
        diagnostics
    }
}

#[async_trait]
impl ImportState<WebhooksModel> for WebhooksResource {
    async fn import_state(&self, ctx: &OperationContext, id: &str) -> Transition<WebhooksModel> {
        let state = WebhooksModel {
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
