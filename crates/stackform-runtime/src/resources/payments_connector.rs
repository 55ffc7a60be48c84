//! Payments connector resource (`payments` module).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use stackform_core::dynamic::{extract_keys, partition};
use stackform_core::{CodecError, Diagnostic, Diagnostics, DynamicMap, DynamicValue, Transition};

use super::{ResourceEnv, requires_replacement};
use crate::connectors::{ConnectorConfig, ConnectorProvider, PROVIDER_FIELD};
use crate::context::OperationContext;
use crate::resource::{Resource, ValidateConfig};

#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaymentsConnectorModel {
    /// Assigned by the remote on install.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Secret part of the configuration.
    #[serde(default)]
    pub credentials: DynamicMap,

    /// Non-secret part of the configuration, `provider` included.
    #[serde(default)]
    pub config: DynamicMap,
}

impl fmt::Debug for PaymentsConnectorModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaymentsConnectorModel")
            .field("id", &self.id)
            .field("credentials", &extract_keys(&self.credentials))
            .field("config", &self.config)
            .finish()
    }
}

impl PaymentsConnectorModel {
    /// Provider name in canonical spelling when it names a known provider.
    fn provider(&self) -> Option<String> {
        match self.config.get(PROVIDER_FIELD)? {
            DynamicValue::String(raw) => Some(
                raw.parse::<ConnectorProvider>()
                    .map(|provider| provider.as_str().to_string())
                    .unwrap_or_else(|_| raw.clone()),
            ),
            other => Some(other.to_string()),
        }
    }

    /// Split a flat remote configuration back into the declared groups.
    ///
    /// Remote keys declared in neither group are dropped. A credential the
    /// remote does not echo back keeps its last known value, and the declared
    /// spelling of the provider is kept when it names the same provider.
    fn apply_remote(mut self, flat: &DynamicMap) -> Self {
        let credential_keys = extract_keys(&self.credentials);
        let config_keys = extract_keys(&self.config);
        let (credentials, config) = partition(flat, &credential_keys, &config_keys);

        let declared_provider = self.config.get(PROVIDER_FIELD).cloned();
        let same_provider = {
            let prior = self.provider();
            self.config = config;
            prior == self.provider()
        };
        if same_provider && let Some(declared) = declared_provider {
            self.config.insert(PROVIDER_FIELD.to_string(), declared);
        }
        self.credentials.extend(credentials);
        self
    }
}

pub struct PaymentsConnectorResource {
    env: ResourceEnv,
}

impl PaymentsConnectorResource {
    pub fn new(env: ResourceEnv) -> Self {
        Self { env }
    }

    fn missing_id() -> Diagnostic {
        Diagnostic::invalid("id", "connector id is unknown; the connector must be installed first")
    }
}

fn codec_diagnostic(err: CodecError) -> Diagnostic {
    let attribute = match &err {
        CodecError::MissingDiscriminator { .. } | CodecError::UnknownDiscriminator { .. } => {
            "config.provider"
        }
        _ => "config",
    };
    Diagnostic::invalid(attribute, err.to_string())
}

#[async_trait]
impl Resource for PaymentsConnectorResource {
    type Model = PaymentsConnectorModel;

    fn kind(&self) -> &'static str {
        "payments_connector"
    }

    fn module(&self) -> &'static str {
        "payments"
    }

    fn replace_fields(&self) -> &'static [&'static str] {
        &["config.provider"]
    }

    fn changed_fields(
        &self,
        prior: &PaymentsConnectorModel,
        desired: &PaymentsConnectorModel,
    ) -> Vec<&'static str> {
        let mut changed = Vec::new();
        if prior.credentials != desired.credentials {
            changed.push("credentials");
        }
        if prior.config != desired.config {
            changed.push("config");
        }
        if prior.provider() != desired.provider() {
            changed.push("config.provider");
        }
        changed
    }

    async fn create(
        &self,
        ctx: &OperationContext,
        desired: PaymentsConnectorModel,
    ) -> Transition<PaymentsConnectorModel> {
        let diagnostics = self.validate_config(&desired);
        if diagnostics.has_error() {
            return Transition::failed(diagnostics);
        }
        let decoded = match ConnectorConfig::from_parts(&desired.credentials, &desired.config) {
            Ok(decoded) => decoded,
            Err(err) => return Transition::failed(codec_diagnostic(err)),
        };
        let payload = match decoded.encode() {
            Ok(payload) => payload,
            Err(err) => return Transition::failed(codec_diagnostic(err)),
        };
        if let Err(diag) = self.env.ready(ctx).await {
            return Transition::failed(diag);
        }

        let provider = decoded.provider();
        match self
            .env
            .call(
                ctx,
                self.env
                    .client()
                    .payments()
                    .install_connector(provider.as_str(), &payload),
            )
            .await
        {
            Ok(id) => {
                tracing::info!(connector = %id, provider = %provider, "connector installed");
                Transition::ok(PaymentsConnectorModel {
                    id: Some(id),
                    ..desired
                })
            }
            Err(diag) => Transition::failed(diag),
        }
    }

    async fn read(
        &self,
        ctx: &OperationContext,
        state: PaymentsConnectorModel,
    ) -> Transition<PaymentsConnectorModel> {
        let Some(id) = state.id.clone() else {
            return Transition::with(Some(state), Self::missing_id());
        };
        if let Err(diag) = self.env.ready(ctx).await {
            return Transition::with(Some(state), diag);
        }
        match self
            .env
            .call(ctx, self.env.client().payments().get_connector_config(&id))
            .await
        {
            Ok(flat) => Transition::ok(state.apply_remote(&flat)),
            Err(diag) => Transition::with(Some(state), diag),
        }
    }

    async fn update(
        &self,
        ctx: &OperationContext,
        observed: PaymentsConnectorModel,
        desired: PaymentsConnectorModel,
    ) -> Transition<PaymentsConnectorModel> {
        let Some(id) = observed.id.clone() else {
            return Transition::with(Some(observed), Self::missing_id());
        };
        if observed.provider() != desired.provider() {
            return Transition::with(Some(observed), requires_replacement("config.provider"));
        }
        let payload = match ConnectorConfig::from_parts(&desired.credentials, &desired.config)
            .and_then(|decoded| decoded.encode())
        {
            Ok(payload) => payload,
            Err(err) => return Transition::with(Some(observed), codec_diagnostic(err)),
        };
        if let Err(diag) = self.env.ready(ctx).await {
            return Transition::with(Some(observed), diag);
        }

        match self
            .env
            .call(
                ctx,
                self.env.client().payments().update_connector_config(&id, &payload),
            )
            .await
        {
            Ok(()) => Transition::ok(PaymentsConnectorModel {
                id: Some(id),
                ..desired
            }),
            Err(diag) => Transition::with(Some(observed), diag),
        }
    }

    async fn delete(&self, ctx: &OperationContext, state: PaymentsConnectorModel) -> Diagnostics {
        let Some(id) = state.id else {
            return Self::missing_id().into();
        };
        if let Err(diag) = self.env.ready(ctx).await {
            return diag.into();
        }
        match self
            .env
            .call(ctx, self.env.client().payments().uninstall_connector(&id))
            .await
        {
            Ok(()) => Diagnostics::new(),
            Err(diag) => diag.into(),
        }
    }

    fn as_validator(&self) -> Option<&dyn ValidateConfig<PaymentsConnectorModel>> {
        Some(self)
    }
}

impl ValidateConfig<PaymentsConnectorModel> for PaymentsConnectorResource {
    fn validate_config(&self, desired: &PaymentsConnectorModel) -> Diagnostics {
        let mut diagnostics = Diagnostics::new();
        if desired.credentials.is_empty() {
            diagnostics.push(Diagnostic::invalid("credentials", "credentials cannot be empty"));
        }
        if desired.config.is_empty() {
            diagnostics.push(Diagnostic::invalid("config", "config cannot be empty"));
        }
        if diagnostics.has_error() {
            return diagnostics;
        }
        if let Err(err) = ConnectorConfig::from_parts(&desired.credentials, &desired.config) {
            diagnostics.push(codec_diagnostic(err));
        }
        diagnostics
    }
}
