//! Configuration types for Stackform.
//!
//! Configuration is loaded from a single YAML file (`stackform.yaml` by
//! default). Every section has defaults so a minimal file only names the
//! target stack:
//!
//! ```yaml
//! stack:
//!   stack_id: abcd
//!   organization_id: org-1234
//!   uri: https://org-1234-abcd.formance.cloud
//! ```

pub mod credentials;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

pub use credentials::{CredentialDefaults, CredentialSet};

/// Complete Stackform configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StackformConfig {
    /// Target stack.
    #[serde(default)]
    pub stack: StackConfig,

    /// Cloud credentials used to obtain a stack token.
    #[serde(default)]
    pub cloud: CloudConfig,

    /// Module health polling.
    #[serde(default)]
    pub health: HealthConfig,

    /// HTTP client settings.
    #[serde(default)]
    pub http: HttpConfig,

    /// Pre-issued stack access token.
    #[serde(default)]
    pub auth: AuthConfig,

    /// Log output.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// The stack resources are converged against.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StackConfig {
    #[serde(default)]
    pub stack_id: String,

    #[serde(default)]
    pub organization_id: String,

    /// Base URI of the stack API.
    #[serde(default)]
    pub uri: String,

    /// Modules that must report healthy before the provider is handed out.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub expected_modules: Vec<String>,
}

/// Cloud credential triple. Empty values fall back to [`CredentialDefaults`].
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct CloudConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,

    /// Environment variable holding the client secret.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret_env: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

impl CloudConfig {
    /// Get the client secret, checking `client_secret_env` first.
    pub fn get_client_secret(&self) -> Option<String> {
        if let Some(env_var) = &self.client_secret_env
            && let Ok(secret) = std::env::var(env_var)
        {
            return Some(secret);
        }
        self.client_secret.clone()
    }
}

impl std::fmt::Debug for CloudConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "<redacted>"))
            .field("client_secret_env", &self.client_secret_env)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

/// Module health polling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthConfig {
    /// Overall time allowed for a module to report healthy.
    #[serde(default = "default_health_timeout")]
    pub timeout_seconds: u64,

    /// Delay between two health polls.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_health_timeout(),
            poll_interval_ms: default_poll_interval(),
        }
    }
}

impl HealthConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,

    /// Overrides the default `stackform/<version>` user agent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout_seconds: default_request_timeout(),
            user_agent: None,
        }
    }
}

impl HttpConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

/// Stack access token supplied out of band.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    /// Environment variable holding the access token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token_env: Option<String>,
}

impl AuthConfig {
    /// Get the access token, checking `access_token_env` first.
    pub fn get_access_token(&self) -> Option<String> {
        if let Some(env_var) = &self.access_token_env
            && let Ok(token) = std::env::var(env_var)
        {
            return Some(token);
        }
        self.access_token.clone()
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("access_token_env", &self.access_token_env)
            .finish()
    }
}

/// Log output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_health_timeout() -> u64 {
    120
}

fn default_poll_interval() -> u64 {
    2000
}

fn default_request_timeout() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl StackformConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML content.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that serde cannot.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.health.poll_interval_ms == 0 {
            return Err(ConfigError::Config(
                "health.poll_interval_ms must be greater than zero".into(),
            ));
        }
        if !self.stack.uri.is_empty()
            && !(self.stack.uri.starts_with("http://") || self.stack.uri.starts_with("https://"))
        {
            return Err(ConfigError::Config(format!(
                "stack.uri must be an http(s) URL, got '{}'",
                self.stack.uri
            )));
        }
        Ok(())
    }
}
