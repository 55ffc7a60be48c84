//! CLI command implementations for Stackform.

pub mod modules;
pub mod transition;
pub mod validate;
pub mod version;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use stackform_client::{HttpStackClient, StackApi};
use stackform_core::{CredentialDefaults, Diagnostics, StackformConfig, Transition};
use stackform_runtime::{OperationContext, ProviderBootstrap, ProviderHandle};

/// What a command prints on stdout.
#[derive(Debug, Serialize)]
pub struct Report {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<Value>,

    pub diagnostics: Diagnostics,
}

impl Report {
    pub fn diagnostics(diagnostics: Diagnostics) -> Self {
        Self {
            state: None,
            plan: None,
            diagnostics,
        }
    }

    pub fn print(&self) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(self)?);
        Ok(())
    }

    pub fn exit_code(&self) -> ExitCode {
        if self.diagnostics.has_error() {
            ExitCode::FAILURE
        } else {
            ExitCode::SUCCESS
        }
    }
}

impl From<Transition<Value>> for Report {
    fn from(transition: Transition<Value>) -> Self {
        Self {
            state: transition.state,
            plan: None,
            diagnostics: transition.diagnostics,
        }
    }
}

/// Context cancelled by Ctrl-C.
pub fn interruptible_context() -> OperationContext {
    let token = CancellationToken::new();
    let on_signal = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling");
            on_signal.cancel();
        }
    });
    OperationContext::with_cancellation(token)
}

/// Shared client for commands that talk to the stack.
pub fn connect(config: &StackformConfig, defaults: CredentialDefaults) -> Result<ProviderHandle> {
    let bootstrap = ProviderBootstrap::new(config.clone(), defaults);
    let tokens = bootstrap.token_source()?;
    bootstrap
        .connect(tokens)
        .context("failed to configure the stack client")
}

/// Handle for commands that never reach the network.
pub fn offline(config: &StackformConfig) -> Result<ProviderHandle> {
    let base = if config.stack.uri.is_empty() {
        "http://localhost"
    } else {
        config.stack.uri.as_str()
    };
    let client: Arc<dyn StackApi> = Arc::new(HttpStackClient::builder(base).build()?);
    Ok(ProviderHandle::new(client, config.health.clone()))
}
