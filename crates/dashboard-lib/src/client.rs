//! HTTP client for the cost dashboard backend
//!
//! Every call returns the uniform [`ApiResponse`] envelope. Transport
//! failures (connection, non-2xx status, undecodable body) come back as
//! [`ApiError`]; application failures stay inside the envelope.

use std::time::Duration;

use reqwest::{Client, Method, Response};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::endpoints::{InventoryKind, InventorySource, MetricTarget, MetricView};
use crate::envelope::ApiResponse;
use crate::error::{ApiError, Result};
use crate::models::{
    ActiveAlert, AlertRules, InfoSettings, InventoryItem, LlmConfig, LogFiles, MetricResponse,
    Page, SystemStatus, UnitPrices,
};
use crate::query::QueryParams;

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// API client for the dashboard backend
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client with the default timeout
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    /// Create a new API client with an explicit request timeout
    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Transport(format!("failed to create HTTP client: {}", e)))?;

        let mut base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(format!(
                "{} cannot be used as a base URL",
                base_url
            )));
        }
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build an endpoint URL; each segment is percent-encoded
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, String)],
    ) -> Result<ApiResponse<T>> {
        let url = self.endpoint(segments)?;
        debug!(method = "GET", url = %url, "Sending request");

        let response = self.client.get(url).query(query).send().await?;
        Self::read_envelope(response).await
    }

    async fn send<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<&B>,
    ) -> Result<ApiResponse<T>> {
        let url = self.endpoint(segments)?;
        debug!(method = %method, url = %url, "Sending request");

        let mut request = self.client.request(method, url);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await?;
        Self::read_envelope(response).await
    }

    async fn read_envelope<T: DeserializeOwned>(response: Response) -> Result<ApiResponse<T>> {
        let status = response.status();
        debug!(status = status.as_u16(), "Received response");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    // ---- metrics ----

    /// Fetch any metric view, decoding the payload as `T`
    pub async fn metrics<T: DeserializeOwned>(
        &self,
        target: MetricTarget,
        id: Option<&str>,
        view: MetricView,
        params: &QueryParams,
    ) -> Result<ApiResponse<T>> {
        let mut segments = vec!["api", "v1", "metrics", target.as_str()];
        if let Some(id) = id.filter(|_| target.accepts_id()) {
            segments.push(id);
        }
        segments.extend_from_slice(view.segments());

        self.get(&segments, &params.to_query_pairs()).await
    }

    /// Fetch a metric view whose payload is a list of series
    pub async fn metric_series(
        &self,
        target: MetricTarget,
        id: Option<&str>,
        view: MetricView,
        params: &QueryParams,
    ) -> Result<ApiResponse<MetricResponse>> {
        self.metrics(target, id, view, params).await
    }

    // ---- system ----

    pub async fn system_status(&self) -> Result<ApiResponse<SystemStatus>> {
        self.get(&["api", "v1", "system", "status"], &[]).await
    }

    pub async fn trigger_resync(&self) -> Result<ApiResponse<Value>> {
        self.send::<_, Value>(Method::POST, &["api", "v1", "system", "resync"], None)
            .await
    }

    pub async fn trigger_backup(&self) -> Result<ApiResponse<Value>> {
        self.send::<_, Value>(Method::POST, &["api", "v1", "system", "backup"], None)
            .await
    }

    pub async fn log_files(&self) -> Result<ApiResponse<LogFiles>> {
        self.get(&["api", "v1", "system", "log-files"], &[]).await
    }

    // ---- inventory ----

    pub async fn inventory(
        &self,
        kind: InventoryKind,
        source: InventorySource,
        limit: Option<u64>,
        offset: Option<u64>,
    ) -> Result<ApiResponse<Page<InventoryItem>>> {
        let params = QueryParams {
            limit,
            offset,
            ..Default::default()
        };
        self.get(
            &["api", "v1", "info", "k8s", source.as_str(), kind.as_str()],
            &params.to_query_pairs(),
        )
        .await
    }

    // ---- info ----

    pub async fn settings(&self) -> Result<ApiResponse<InfoSettings>> {
        self.get(&["api", "v1", "info", "settings"], &[]).await
    }

    pub async fn upsert_settings(&self, settings: &InfoSettings) -> Result<ApiResponse<Value>> {
        self.send(Method::PUT, &["api", "v1", "info", "settings"], Some(settings))
            .await
    }

    pub async fn unit_prices(&self) -> Result<ApiResponse<UnitPrices>> {
        self.get(&["api", "v1", "info", "unit-prices"], &[]).await
    }

    pub async fn upsert_unit_prices(&self, prices: &UnitPrices) -> Result<ApiResponse<Value>> {
        self.send(Method::PUT, &["api", "v1", "info", "unit-prices"], Some(prices))
            .await
    }

    pub async fn alert_rules(&self) -> Result<ApiResponse<AlertRules>> {
        self.get(&["api", "v1", "info", "alerts"], &[]).await
    }

    pub async fn upsert_alert_rules(&self, rules: &AlertRules) -> Result<ApiResponse<Value>> {
        self.send(Method::PUT, &["api", "v1", "info", "alerts"], Some(rules))
            .await
    }

    pub async fn llm_config(&self) -> Result<ApiResponse<LlmConfig>> {
        self.get(&["api", "v1", "info", "llm"], &[]).await
    }

    pub async fn upsert_llm_config(&self, config: &LlmConfig) -> Result<ApiResponse<Value>> {
        self.send(Method::PUT, &["api", "v1", "info", "llm"], Some(config))
            .await
    }

    // ---- active alerts ----

    pub async fn active_alerts(&self) -> Result<ApiResponse<Vec<ActiveAlert>>> {
        self.get(&["api", "v1", "states", "alerts"], &[]).await
    }

    pub async fn resolve_alert(&self, id: &str) -> Result<ApiResponse<Value>> {
        self.send::<_, Value>(
            Method::POST,
            &["api", "v1", "states", "alerts", id, "resolve"],
            None,
        )
        .await
    }
}
