//! `reqwest` implementation of the stack API traits.

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;
use stackform_core::{DynamicMap, DynamicValue};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use urlencoding::encode;

use crate::api::{LedgerApi, PaymentsApi, ReconciliationApi, StackApi, WebhooksApi};
use crate::error::{ApiError, ApiResult, ErrorFlavor, RemoteError, ResponseContext};
use crate::models::ledger::{CreateLedgerRequest, LedgerInfo, SchemaData, SchemaInfo};
use crate::models::payments::{CreatePoolRequest, Pool, UpdatePoolQueryRequest};
use crate::models::reconciliation::{Policy, PolicyRequest};
use crate::models::versions::VersionsResponse;
use crate::models::webhooks::{WebhookConfig, WebhookConfigRequest};
use crate::models::{Cursor, Data};
use crate::transport::{RequestDecorator, RequestTrace, TRACEPARENT_HEADER};

const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

/// Builder for [`HttpStackClient`].
pub struct HttpStackClientBuilder {
    base_url: String,
    timeout: Duration,
    user_agent: String,
    decorators: Vec<Arc<dyn RequestDecorator>>,
}

impl HttpStackClientBuilder {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Append a decorator. Decorators run in the order they were added.
    pub fn decorator(mut self, decorator: impl RequestDecorator + 'static) -> Self {
        self.decorators.push(Arc::new(decorator));
        self
    }

    pub fn build(self) -> Result<HttpStackClient, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(self.user_agent)
            .build()?;

        Ok(HttpStackClient {
            http,
            base_url: self.base_url.trim_end_matches('/').to_string(),
            decorators: self.decorators,
        })
    }
}

/// Stack API client over HTTP.
///
/// Cheap to share behind an `Arc`; nothing is mutated after [`build`].
///
/// [`build`]: HttpStackClientBuilder::build
pub struct HttpStackClient {
    http: reqwest::Client,
    base_url: String,
    decorators: Vec<Arc<dyn RequestDecorator>>,
}

impl HttpStackClient {
    pub fn builder(base_url: impl Into<String>) -> HttpStackClientBuilder {
        HttpStackClientBuilder {
            base_url: base_url.into(),
            timeout: Duration::from_secs(30),
            user_agent: format!("stackform/{}", stackform_core::VERSION),
            decorators: Vec::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http.request(method, format!("{}{}", self.base_url, path))
    }

    /// Decorate and send `request`, returning the body of a success response
    /// with the context it arrived under.
    async fn send(
        &self,
        flavor: ErrorFlavor,
        request: RequestBuilder,
    ) -> ApiResult<(String, ResponseContext)> {
        let mut trace = RequestTrace::default();
        let mut request = request;
        for decorator in &self.decorators {
            request = decorator.decorate(request, &mut trace).await.map_err(|error| {
                ApiError::new(
                    error,
                    ResponseContext {
                        status: None,
                        traceparent: trace.traceparent.clone(),
                    },
                )
            })?;
        }

        let response = request.send().await.map_err(|e| {
            ApiError::new(
                RemoteError::Transport(e.to_string()),
                ResponseContext {
                    status: None,
                    traceparent: trace.traceparent.clone(),
                },
            )
        })?;

        let status = response.status();
        let traceparent = response
            .headers()
            .get(TRACEPARENT_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .or(trace.traceparent);
        let context = ResponseContext {
            status: Some(status.as_u16()),
            traceparent,
        };

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return Err(ApiError::new(RemoteError::Transport(e.to_string()), context)),
        };

        tracing::debug!(
            status = status.as_u16(),
            traceparent = context.traceparent.as_deref().unwrap_or_default(),
            "stack API response"
        );

        if status.is_success() {
            Ok((body, context))
        } else {
            Err(ApiError::new(
                RemoteError::from_body(flavor, status.as_u16(), &body),
                context,
            ))
        }
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        flavor: ErrorFlavor,
        request: RequestBuilder,
    ) -> ApiResult<T> {
        let (body, context) = self.send(flavor, request).await?;
        serde_json::from_str(&body)
            .map_err(|e| ApiError::new(RemoteError::Decode(e.to_string()), context))
    }

    async fn send_empty(&self, flavor: ErrorFlavor, request: RequestBuilder) -> ApiResult<()> {
        self.send(flavor, request).await.map(|_| ())
    }

    fn with_json<B: Serialize + ?Sized>(request: RequestBuilder, body: &B) -> RequestBuilder {
        request.json(body)
    }
}

#[async_trait]
impl StackApi for HttpStackClient {
    async fn list_module_versions(&self) -> ApiResult<VersionsResponse> {
        self.send_json(ErrorFlavor::V1, self.request(Method::GET, "/versions"))
            .await
    }

    fn ledger(&self) -> &dyn LedgerApi {
        self
    }

    fn payments(&self) -> &dyn PaymentsApi {
        self
    }

    fn webhooks(&self) -> &dyn WebhooksApi {
        self
    }

    fn reconciliation(&self) -> &dyn ReconciliationApi {
        self
    }
}

#[async_trait]
impl LedgerApi for HttpStackClient {
    async fn create_ledger(&self, name: &str, request: &CreateLedgerRequest) -> ApiResult<()> {
        let path = format!("/api/ledger/v2/{}", encode(name));
        let req = Self::with_json(self.request(Method::POST, &path), request);
        self.send_empty(ErrorFlavor::LedgerV2, req).await
    }

    async fn get_ledger(&self, name: &str) -> ApiResult<LedgerInfo> {
        let path = format!("/api/ledger/v2/{}", encode(name));
        let resp: Data<LedgerInfo> = self
            .send_json(ErrorFlavor::LedgerV2, self.request(Method::GET, &path))
            .await?;
        Ok(resp.data)
    }

    async fn update_ledger_metadata(
        &self,
        name: &str,
        metadata: &BTreeMap<String, String>,
    ) -> ApiResult<()> {
        let path = format!("/api/ledger/v2/{}/metadata", encode(name));
        let req = Self::with_json(self.request(Method::PUT, &path), metadata);
        self.send_empty(ErrorFlavor::LedgerV2, req).await
    }

    async fn delete_ledger_metadata(&self, name: &str, key: &str) -> ApiResult<()> {
        let path = format!("/api/ledger/v2/{}/metadata/{}", encode(name), encode(key));
        self.send_empty(ErrorFlavor::LedgerV2, self.request(Method::DELETE, &path))
            .await
    }

    async fn insert_schema(
        &self,
        ledger: &str,
        version: &str,
        schema: &SchemaData,
        idempotency_key: Option<&str>,
    ) -> ApiResult<()> {
        let path = format!("/api/ledger/v2/{}/schema/{}", encode(ledger), encode(version));
        let mut req = Self::with_json(self.request(Method::POST, &path), schema);
        if let Some(key) = idempotency_key {
            req = req.header(IDEMPOTENCY_KEY_HEADER, key);
        }
        self.send_empty(ErrorFlavor::LedgerV2, req).await
    }

    async fn get_schema(&self, ledger: &str, version: &str) -> ApiResult<SchemaInfo> {
        let path = format!("/api/ledger/v2/{}/schema/{}", encode(ledger), encode(version));
        let resp: Data<SchemaInfo> = self
            .send_json(ErrorFlavor::LedgerV2, self.request(Method::GET, &path))
            .await?;
        Ok(resp.data)
    }
}

#[async_trait]
impl PaymentsApi for HttpStackClient {
    async fn create_pool(&self, request: &CreatePoolRequest) -> ApiResult<String> {
        let req = Self::with_json(self.request(Method::POST, "/api/payments/v3/pools"), request);
        let resp: Data<String> = self.send_json(ErrorFlavor::PaymentsV3, req).await?;
        Ok(resp.data)
    }

    async fn get_pool(&self, pool_id: &str) -> ApiResult<Pool> {
        let path = format!("/api/payments/v3/pools/{}", encode(pool_id));
        let resp: Data<Pool> = self
            .send_json(ErrorFlavor::PaymentsV3, self.request(Method::GET, &path))
            .await?;
        Ok(resp.data)
    }

    async fn delete_pool(&self, pool_id: &str) -> ApiResult<()> {
        let path = format!("/api/payments/v3/pools/{}", encode(pool_id));
        self.send_empty(ErrorFlavor::PaymentsV3, self.request(Method::DELETE, &path))
            .await
    }

    async fn add_account_to_pool(&self, pool_id: &str, account_id: &str) -> ApiResult<()> {
        let path = format!(
            "/api/payments/v3/pools/{}/accounts/{}",
            encode(pool_id),
            encode(account_id)
        );
        self.send_empty(ErrorFlavor::PaymentsV3, self.request(Method::POST, &path))
            .await
    }

    async fn remove_account_from_pool(&self, pool_id: &str, account_id: &str) -> ApiResult<()> {
        let path = format!(
            "/api/payments/v3/pools/{}/accounts/{}",
            encode(pool_id),
            encode(account_id)
        );
        self.send_empty(ErrorFlavor::PaymentsV3, self.request(Method::DELETE, &path))
            .await
    }

    async fn update_pool_query(&self, pool_id: &str, query: &DynamicValue) -> ApiResult<()> {
        let path = format!("/api/payments/v3/pools/{}/query", encode(pool_id));
        let body = UpdatePoolQueryRequest {
            query: query.clone(),
        };
        let req = Self::with_json(self.request(Method::PUT, &path), &body);
        self.send_empty(ErrorFlavor::PaymentsV3, req).await
    }

    async fn install_connector(&self, provider: &str, config: &DynamicMap) -> ApiResult<String> {
        let path = format!("/api/payments/v3/connectors/install/{}", encode(provider));
        let req = Self::with_json(self.request(Method::POST, &path), config);
        let resp: Data<String> = self.send_json(ErrorFlavor::PaymentsV3, req).await?;
        Ok(resp.data)
    }

    async fn get_connector_config(&self, connector_id: &str) -> ApiResult<DynamicMap> {
        let path = format!("/api/payments/v3/connectors/{}/config", encode(connector_id));
        let resp: Data<DynamicMap> = self
            .send_json(ErrorFlavor::PaymentsV3, self.request(Method::GET, &path))
            .await?;
        Ok(resp.data)
    }

    async fn update_connector_config(&self, connector_id: &str, config: &DynamicMap) -> ApiResult<()> {
        let path = format!("/api/payments/v3/connectors/{}/config", encode(connector_id));
        let req = Self::with_json(self.request(Method::PATCH, &path), config);
        self.send_empty(ErrorFlavor::PaymentsV3, req).await
    }

    async fn uninstall_connector(&self, connector_id: &str) -> ApiResult<()> {
        let path = format!("/api/payments/v3/connectors/{}", encode(connector_id));
        self.send_empty(ErrorFlavor::PaymentsV3, self.request(Method::DELETE, &path))
            .await
    }
}

#[async_trait]
impl WebhooksApi for HttpStackClient {
    async fn insert_config(&self, request: &WebhookConfigRequest) -> ApiResult<WebhookConfig> {
        let req = Self::with_json(self.request(Method::POST, "/api/webhooks/configs"), request);
        let resp: Data<WebhookConfig> = self.send_json(ErrorFlavor::V1, req).await?;
        Ok(resp.data)
    }

    async fn get_configs(&self, id: &str) -> ApiResult<Vec<WebhookConfig>> {
        let req = self
            .request(Method::GET, "/api/webhooks/configs")
            .query(&[("id", id)]);
        let resp: Cursor<WebhookConfig> = self.send_json(ErrorFlavor::V1, req).await?;
        Ok(resp.cursor.data)
    }

    async fn update_config(&self, id: &str, request: &WebhookConfigRequest) -> ApiResult<()> {
        let path = format!("/api/webhooks/configs/{}", encode(id));
        let req = Self::with_json(self.request(Method::PUT, &path), request);
        self.send_empty(ErrorFlavor::V1, req).await
    }

    async fn delete_config(&self, id: &str) -> ApiResult<()> {
        let path = format!("/api/webhooks/configs/{}", encode(id));
        self.send_empty(ErrorFlavor::V1, self.request(Method::DELETE, &path))
            .await
    }
}

#[async_trait]
impl ReconciliationApi for HttpStackClient {
    async fn create_policy(&self, request: &PolicyRequest) -> ApiResult<Policy> {
        let req = Self::with_json(
            self.request(Method::POST, "/api/reconciliation/policies"),
            request,
        );
        let resp: Data<Policy> = self.send_json(ErrorFlavor::V1, req).await?;
        Ok(resp.data)
    }

    async fn get_policy(&self, policy_id: &str) -> ApiResult<Policy> {
        let path = format!("/api/reconciliation/policies/{}", encode(policy_id));
        let resp: Data<Policy> = self
            .send_json(ErrorFlavor::V1, self.request(Method::GET, &path))
            .await?;
        Ok(resp.data)
    }

    async fn delete_policy(&self, policy_id: &str) -> ApiResult<()> {
        let path = format!("/api/reconciliation/policies/{}", encode(policy_id));
        self.send_empty(ErrorFlavor::V1, self.request(Method::DELETE, &path))
            .await
    }
}
