//! Request decorators applied to every outbound call.
//!
//! Decorators are handed to [`crate::HttpStackClient`] when it is built and run
//! in order on each request. They never touch shared state after construction.

use async_trait::async_trait;
use reqwest::RequestBuilder;
use std::sync::Arc;

use crate::error::RemoteError;

pub const TRACEPARENT_HEADER: &str = "traceparent";

/// Per-request facts collected by decorators.
#[derive(Debug, Clone, Default)]
pub struct RequestTrace {
    /// Trace context stamped on the request.
    pub traceparent: Option<String>,
}

/// Decorates one outbound request.
#[async_trait]
pub trait RequestDecorator: Send + Sync {
    async fn decorate(
        &self,
        request: RequestBuilder,
        trace: &mut RequestTrace,
    ) -> Result<RequestBuilder, RemoteError>;
}

/// Build a fresh W3C `traceparent` value (`00-<trace>-<span>-01`).
pub fn new_traceparent() -> String {
    format!(
        "00-{:032x}-{:016x}-01",
        rand::random::<u128>(),
        rand::random::<u64>()
    )
}

/// Stamps a new `traceparent` header on each request.
#[derive(Debug, Clone, Default)]
pub struct TraceparentStamper;

impl TraceparentStamper {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl RequestDecorator for TraceparentStamper {
    async fn decorate(
        &self,
        request: RequestBuilder,
        trace: &mut RequestTrace,
    ) -> Result<RequestBuilder, RemoteError> {
        let traceparent = new_traceparent();
        trace.traceparent = Some(traceparent.clone());
        Ok(request.header(TRACEPARENT_HEADER, traceparent))
    }
}

/// Supplies stack access tokens.
///
/// Exchanging cloud credentials for a stack token happens behind this trait:
/// an exchanging source is built from the resolved `CredentialSet` (client id
/// and secret) and trades it for the token returned here.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn access_token(&self) -> Result<String, RemoteError>;
}

/// A token fixed at construction.
#[derive(Clone)]
pub struct StaticTokenSource {
    token: String,
}

impl StaticTokenSource {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl std::fmt::Debug for StaticTokenSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticTokenSource").finish_non_exhaustive()
    }
}

#[async_trait]
impl TokenSource for StaticTokenSource {
    async fn access_token(&self) -> Result<String, RemoteError> {
        Ok(self.token.clone())
    }
}

/// Adds `Authorization: Bearer <token>` from a [`TokenSource`].
#[derive(Clone)]
pub struct BearerAuth {
    tokens: Arc<dyn TokenSource>,
}

impl BearerAuth {
    pub fn new(tokens: Arc<dyn TokenSource>) -> Self {
        Self { tokens }
    }
}

#[async_trait]
impl RequestDecorator for BearerAuth {
    async fn decorate(
        &self,
        request: RequestBuilder,
        _trace: &mut RequestTrace,
    ) -> Result<RequestBuilder, RemoteError> {
        let token = self.tokens.access_token().await?;
        Ok(request.bearer_auth(token))
    }
}
