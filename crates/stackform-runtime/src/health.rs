//! Module health gate.
//!
//! Every transition waits here before talking to a module. The gate polls
//! `GET /versions` until the named module reports healthy, the timeout
//! elapses, the caller interrupts, or the listing itself fails.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior, sleep_until};

use stackform_client::{ApiError, StackApi};
use stackform_core::{Diagnostic, DiagnosticCategory};

use crate::context::{Interrupted, OperationContext};
use crate::translate::ErrorTranslator;

pub const DEFAULT_HEALTH_TIMEOUT: Duration = Duration::from_secs(120);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Why a module could not be used.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GateError {
    #[error("module '{module}' did not become healthy after {elapsed:.1?} (timeout {timeout:?})")]
    Timeout {
        module: String,
        elapsed: Duration,
        timeout: Duration,
    },

    #[error("health check for module '{module}' stopped after {elapsed:.1?}: {reason}")]
    Interrupted {
        module: String,
        elapsed: Duration,
        reason: Interrupted,
    },

    #[error("health check for module '{module}' failed: {source}")]
    Remote {
        module: String,
        #[source]
        source: ApiError,
    },
}

impl GateError {
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            GateError::Timeout { .. } => Diagnostic::error(
                DiagnosticCategory::HealthTimeout,
                "MODULE_HEALTH_TIMEOUT",
                self.to_string(),
            ),
            GateError::Interrupted { reason, .. } => {
                let mut diagnostic = reason.to_diagnostic();
                diagnostic.message = self.to_string();
                diagnostic
            }
            GateError::Remote { source, .. } => ErrorTranslator::translate(source),
        }
    }
}

/// Blocks until one module reports healthy.
#[derive(Clone)]
pub struct ModuleHealthGate {
    client: Arc<dyn StackApi>,
    module: String,
    timeout: Duration,
    poll_interval: Duration,
}

impl ModuleHealthGate {
    pub fn new(client: Arc<dyn StackApi>, module: impl Into<String>) -> Self {
        Self {
            client,
            module: module.into(),
            timeout: DEFAULT_HEALTH_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval.max(Duration::from_millis(1));
        self
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    /// Wait for the module to report healthy.
    ///
    /// The first poll happens immediately. A module missing from the listing
    /// or reported unhealthy is polled again; a failing listing is returned
    /// at once.
    pub async fn await_healthy(&self, ctx: &OperationContext) -> Result<(), GateError> {
        let start = Instant::now();
        let deadline = start + self.timeout;
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                reason = ctx.interrupted() => return Err(self.interrupted(start, reason)),
                _ = sleep_until(deadline) => return Err(self.timed_out(start)),
                _ = ticker.tick() => {}
            }

            let listing = tokio::select! {
                biased;
                reason = ctx.interrupted() => return Err(self.interrupted(start, reason)),
                _ = sleep_until(deadline) => return Err(self.timed_out(start)),
                listing = self.client.list_module_versions() => listing,
            };

            let versions = listing.map_err(|source| GateError::Remote {
                module: self.module.clone(),
                source,
            })?;

            match versions.module(&self.module) {
                Some(version) if version.health => {
                    tracing::debug!(
                        module = %self.module,
                        version = %version.version,
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        "module healthy"
                    );
                    return Ok(());
                }
                Some(version) => tracing::debug!(
                    module = %self.module,
                    version = %version.version,
                    "module not healthy yet"
                ),
                None => tracing::debug!(module = %self.module, "module not listed yet"),
            }
        }
    }

    fn timed_out(&self, start: Instant) -> GateError {
        let err = GateError::Timeout {
            module: self.module.clone(),
            elapsed: start.elapsed(),
            timeout: self.timeout,
        };
        tracing::warn!(module = %self.module, "{err}");
        err
    }

    fn interrupted(&self, start: Instant, reason: Interrupted) -> GateError {
        GateError::Interrupted {
            module: self.module.clone(),
            elapsed: start.elapsed(),
            reason,
        }
    }
}
