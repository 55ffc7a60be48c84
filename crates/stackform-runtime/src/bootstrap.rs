//! Provider bootstrap: from configuration to a shared stack client.
//!
//! The client is built once per configuration, with its request decorators
//! (traceparent stamping, bearer authentication) composed here and nowhere
//! else. Engines only ever see the resulting [`ProviderHandle`].

use std::sync::Arc;

use stackform_client::{BearerAuth, HttpStackClient, StackApi, StaticTokenSource, TokenSource, TraceparentStamper};
use stackform_core::config::HealthConfig;
use stackform_core::{
    ConfigError, CredentialDefaults, CredentialSet, Diagnostic, Diagnostics, StackformConfig,
};

use crate::context::OperationContext;
use crate::health::ModuleHealthGate;

#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("stack.uri is not set")]
    MissingStackUri,

    #[error("no stack access token: set auth.access_token or auth.access_token_env")]
    MissingToken,

    #[error("failed to build the stack client: {0}")]
    Client(String),
}

pub struct ProviderBootstrap {
    config: StackformConfig,
    defaults: CredentialDefaults,
}

impl ProviderBootstrap {
    pub fn new(config: StackformConfig, defaults: CredentialDefaults) -> Self {
        Self { config, defaults }
    }

    pub fn config(&self) -> &StackformConfig {
        &self.config
    }

    /// Offline checks of the provider configuration.
    ///
    /// A value missing from the configuration but present in the defaults is
    /// a warning; missing from both is an error.
    pub fn validate(&self) -> Diagnostics {
        let mut diagnostics = Diagnostics::new();
        let cloud = &self.config.cloud;
        let is_set = |value: Option<String>| value.is_some_and(|v| !v.is_empty());

        let checks = [
            (
                "cloud.client_id",
                is_set(cloud.client_id.clone()),
                self.defaults.client_id.is_some(),
            ),
            (
                "cloud.client_secret",
                is_set(cloud.get_client_secret()),
                self.defaults.client_secret.is_some(),
            ),
        ];
        for (attribute, configured, defaulted) in checks {
            match (configured, defaulted) {
                (true, _) => {}
                (false, true) => diagnostics.push(
                    Diagnostic::warning(
                        stackform_core::DiagnosticCategory::InvalidConfiguration,
                        "DEFAULT_CREDENTIAL",
                        format!("{attribute} is not set; using the value from the environment"),
                    )
                    .with_attribute(attribute),
                ),
                (false, false) => diagnostics.push(Diagnostic::invalid(
                    attribute,
                    format!("{attribute} is not set in the configuration or the environment"),
                )),
            }
        }

        if !diagnostics.has_error()
            && let Err(err) = self.credentials()
        {
            diagnostics.push(Diagnostic::invalid("cloud.client_id", err.to_string()));
        }
        if self.config.stack.uri.is_empty() {
            diagnostics.push(Diagnostic::invalid("stack.uri", BootstrapError::MissingStackUri.to_string()));
        }
        diagnostics
    }

    /// Resolve the cloud credential triple.
    pub fn credentials(&self) -> Result<CredentialSet, BootstrapError> {
        Ok(CredentialSet::resolve(&self.config.cloud, &self.defaults)?)
    }

    /// Token source backed by the configured access token.
    pub fn token_source(&self) -> Result<Arc<dyn TokenSource>, BootstrapError> {
        let token = self
            .config
            .auth
            .get_access_token()
            .filter(|token| !token.is_empty())
            .ok_or(BootstrapError::MissingToken)?;
        Ok(Arc::new(StaticTokenSource::new(token)))
    }

    /// Build the shared client.
    ///
    /// Credentials are validated first, so a malformed client id never
    /// reaches the network.
    pub fn connect(&self, tokens: Arc<dyn TokenSource>) -> Result<ProviderHandle, BootstrapError> {
        let credentials = self.credentials()?;
        let stack = &self.config.stack;
        if stack.uri.is_empty() {
            return Err(BootstrapError::MissingStackUri);
        }

        let mut builder = HttpStackClient::builder(stack.uri.clone())
            .timeout(self.config.http.request_timeout())
            .decorator(TraceparentStamper::new())
            .decorator(BearerAuth::new(tokens));
        if let Some(user_agent) = &self.config.http.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }
        let client = builder
            .build()
            .map_err(|err| BootstrapError::Client(err.to_string()))?;

        tracing::info!(
            stack_id = %stack.stack_id,
            organization_id = %stack.organization_id,
            uri = %client.base_url(),
            client_id = %credentials.client_id,
            "stack client ready"
        );
        Ok(ProviderHandle::new(Arc::new(client), self.config.health.clone()))
    }
}

/// What every engine is built from: the shared client and the gate settings.
#[derive(Clone)]
pub struct ProviderHandle {
    client: Arc<dyn StackApi>,
    health: HealthConfig,
}

impl ProviderHandle {
    pub fn new(client: Arc<dyn StackApi>, health: HealthConfig) -> Self {
        Self { client, health }
    }

    pub fn client(&self) -> Arc<dyn StackApi> {
        self.client.clone()
    }

    pub fn gate(&self, module: &str) -> ModuleHealthGate {
        ModuleHealthGate::new(self.client.clone(), module)
            .with_timeout(self.health.timeout())
            .with_poll_interval(self.health.poll_interval())
    }

    /// Wait for each module in turn. Stops at the first that fails.
    pub async fn await_modules(&self, ctx: &OperationContext, modules: &[String]) -> Diagnostics {
        for module in modules {
            if let Err(err) = self.gate(module).await_healthy(ctx).await {
                return err.to_diagnostic().into();
            }
        }
        Diagnostics::new()
    }

    /// Wait for the modules the configuration expects.
    pub async fn await_expected_modules(&self, ctx: &OperationContext, config: &StackformConfig) -> Diagnostics {
        self.await_modules(ctx, &config.stack.expected_modules).await
    }
}
