//! Cloud credential resolution.
//!
//! Caller-supplied values win over process-wide defaults. Defaults are
//! captured once by the binary (see [`CredentialDefaults::from_env`]) and passed
//! down explicitly, so nothing below reads the environment on its own.

use super::{CloudConfig, ConfigError};

/// Prefix every organization-scoped client id carries.
pub const ORGANIZATION_CLIENT_PREFIX: &str = "organization_";

/// Endpoint used when neither the caller nor the environment names one.
pub const DEFAULT_CLOUD_ENDPOINT: &str = "https://app.formance.cloud/api";

pub const ENV_CLIENT_ID: &str = "FORMANCE_CLOUD_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "FORMANCE_CLOUD_CLIENT_SECRET";
pub const ENV_API_ENDPOINT: &str = "FORMANCE_CLOUD_API_ENDPOINT";

/// Process-wide fallback credential values.
#[derive(Clone, Default)]
pub struct CredentialDefaults {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub endpoint: Option<String>,
}

impl CredentialDefaults {
    /// Capture defaults from the `FORMANCE_CLOUD_*` environment variables.
    pub fn from_env() -> Self {
        let read = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());
        Self {
            client_id: read(ENV_CLIENT_ID),
            client_secret: read(ENV_CLIENT_SECRET),
            endpoint: read(ENV_API_ENDPOINT),
        }
    }
}

impl std::fmt::Debug for CredentialDefaults {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialDefaults")
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "<redacted>"))
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

/// Fully resolved credential triple.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialSet {
    pub client_id: String,
    pub client_secret: String,
    pub endpoint: String,
}

impl CredentialSet {
    /// Merge `config` over `defaults` and validate the result.
    ///
    /// Rejects a missing client id or secret, and a client id that is not
    /// organization-scoped.
    pub fn resolve(config: &CloudConfig, defaults: &CredentialDefaults) -> Result<Self, ConfigError> {
        let pick = |own: Option<String>, fallback: &Option<String>| {
            own.filter(|v| !v.is_empty()).or_else(|| fallback.clone())
        };

        let client_id = pick(config.client_id.clone(), &defaults.client_id).ok_or_else(|| {
            ConfigError::Config(format!(
                "cloud.client_id is not set and {ENV_CLIENT_ID} is empty"
            ))
        })?;
        let client_secret =
            pick(config.get_client_secret(), &defaults.client_secret).ok_or_else(|| {
                ConfigError::Config(format!(
                    "cloud.client_secret is not set and {ENV_CLIENT_SECRET} is empty"
                ))
            })?;
        let endpoint = pick(config.endpoint.clone(), &defaults.endpoint)
            .unwrap_or_else(|| DEFAULT_CLOUD_ENDPOINT.to_string());

        let creds = Self {
            client_id,
            client_secret,
            endpoint,
        };
        if !creds.is_organization_client() {
            return Err(ConfigError::Config(format!(
                "cloud.client_id must start with '{ORGANIZATION_CLIENT_PREFIX}'"
            )));
        }
        tracing::debug!(
            client_id = %creds.client_id,
            endpoint = %creds.endpoint,
            "resolved cloud credentials"
        );
        Ok(creds)
    }

    pub fn is_organization_client(&self) -> bool {
        self.client_id.starts_with(ORGANIZATION_CLIENT_PREFIX)
    }
}

impl std::fmt::Debug for CredentialSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialSet")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}
