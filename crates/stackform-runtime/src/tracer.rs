//! Span-per-transition wrapper around a [`Resource`].
//!
//! [`TracedResource`] holds one engine and checks once, at construction, which
//! optional capabilities it has. Every call it forwards runs inside a
//! `resource` span carrying the kind and operation name.

use std::future::Future;
use std::time::Instant;

use stackform_core::{Diagnostic, DiagnosticCategory, Diagnostics, Transition};
use tracing::Instrument;

use crate::context::OperationContext;
use crate::resource::{Plan, Resource};

pub struct TracedResource<R: Resource> {
    inner: R,
    validates: bool,
    imports: bool,
}

impl<R: Resource> TracedResource<R> {
    pub fn new(inner: R) -> Self {
        let validates = inner.as_validator().is_some();
        let imports = inner.as_importer().is_some();
        tracing::trace!(
            resource = inner.kind(),
            validates,
            imports,
            "wrapped resource"
        );
        Self {
            inner,
            validates,
            imports,
        }
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }

    pub fn kind(&self) -> &'static str {
        self.inner.kind()
    }

    pub fn module(&self) -> &'static str {
        self.inner.module()
    }

    pub fn supports_validation(&self) -> bool {
        self.validates
    }

    pub fn supports_import(&self) -> bool {
        self.imports
    }

    pub fn plan(&self, prior: Option<&R::Model>, desired: &R::Model) -> Plan {
        let plan = self.inner.plan(prior, desired);
        tracing::debug!(
            resource = self.kind(),
            action = ?plan.action,
            changed = ?plan.changed,
            requires_replace = ?plan.requires_replace,
            "planned"
        );
        plan
    }

    /// Local checks only. A kind without checks accepts everything.
    pub fn validate_config(&self, desired: &R::Model) -> Diagnostics {
        if !self.validates {
            return Diagnostics::new();
        }
        let span = tracing::debug_span!("resource", resource = self.kind(), operation = "validate_config");
        let _enter = span.enter();
        let diagnostics = self
            .inner
            .as_validator()
            .map(|v| v.validate_config(desired))
            .unwrap_or_default();
        log_outcome("validate_config", &diagnostics);
        diagnostics
    }

    pub async fn create(&self, ctx: &OperationContext, desired: R::Model) -> Transition<R::Model> {
        self.traced("create", self.inner.create(ctx, desired), |t| &t.diagnostics)
            .await
    }

    pub async fn read(&self, ctx: &OperationContext, state: R::Model) -> Transition<R::Model> {
        self.traced("read", self.inner.read(ctx, state), |t| &t.diagnostics)
            .await
    }

    pub async fn update(
        &self,
        ctx: &OperationContext,
        observed: R::Model,
        desired: R::Model,
    ) -> Transition<R::Model> {
        self.traced("update", self.inner.update(ctx, observed, desired), |t| &t.diagnostics)
            .await
    }

    pub async fn delete(&self, ctx: &OperationContext, state: R::Model) -> Diagnostics {
        self.traced("delete", self.inner.delete(ctx, state), |d| d).await
    }

    pub async fn import_state(&self, ctx: &OperationContext, id: &str) -> Transition<R::Model> {
        let importer = match self.inner.as_importer() {
            Some(importer) if self.imports => importer,
            _ => {
                tracing::warn!(resource = self.kind(), "import requested but not supported");
                return Transition::failed(Diagnostic::error(
                    DiagnosticCategory::Unsupported,
                    "IMPORT_UNSUPPORTED",
                    format!("resource '{}' cannot be imported", self.kind()),
                ));
            }
        };
        self.traced("import_state", importer.import_state(ctx, id), |t| &t.diagnostics)
            .await
    }

    async fn traced<T, F>(&self, operation: &'static str, call: F, diagnostics: fn(&T) -> &Diagnostics) -> T
    where
        F: Future<Output = T>,
    {
        let span = tracing::debug_span!("resource", resource = self.kind(), operation);
        async move {
            tracing::debug!("call");
            let started = Instant::now();
            let outcome = call.await;
            tracing::debug!(elapsed_ms = started.elapsed().as_millis() as u64, "completed");
            log_outcome(operation, diagnostics(&outcome));
            outcome
        }
        .instrument(span)
        .await
    }
}

fn log_outcome(operation: &str, diagnostics: &Diagnostics) {
    if diagnostics.is_empty() {
        tracing::info!(operation, "succeeded");
        return;
    }
    for diagnostic in diagnostics {
        if diagnostic.is_error() {
            tracing::warn!(
                operation,
                code = %diagnostic.code,
                category = %diagnostic.category,
                "{}",
                diagnostic.message
            );
        } else {
            tracing::info!(operation, code = %diagnostic.code, "{}", diagnostic.message);
        }
    }
}
