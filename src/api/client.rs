//! HTTP client for the VOID oracle backend.
//!
//! Thin request/response wrapper: no retries, no caching — every call is a
//! fresh request, and freshness policy lives in the sync watchers. Non-2xx
//! responses become `ApiError::Backend` carrying the server's own message.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Response};
use std::time::Duration;
use tracing::debug;

use super::{error_message, ApiError, OracleBackend, PredictRequest};
use crate::types::{
    CreateMarketRequest, CreateMarketResponse, DeleteMarketResponse, HealthStatus, HistoryPoint,
    HistoryResponse, ListMarketsResponse, Market, MarketFilters, OracleMarketsResponse,
    PredictionSnapshot,
};

/// Per-request timeout. A hung backend call fails this cycle; the watcher's
/// timer keeps firing on schedule regardless.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Typed client over the VOID backend REST API.
pub struct ApiClient {
    http: Client,
    /// Server origin, no trailing slash (e.g. `http://127.0.0.1:8000`).
    base: String,
    /// API path prefix with leading slash (e.g. `/api/v1`).
    prefix: String,
}

impl ApiClient {
    /// Create a new client for the given server origin and API prefix.
    pub fn new(base_url: &str, api_prefix: &str) -> Result<Self> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent("VOID/0.1.0 (dashboard-sync)")
            .build()
            .context("Failed to build HTTP client for VOID backend")?;

        let base = base_url.trim_end_matches('/').to_string();
        let prefix = if api_prefix.starts_with('/') {
            api_prefix.trim_end_matches('/').to_string()
        } else {
            format!("/{}", api_prefix.trim_end_matches('/'))
        };

        Ok(Self { http, base, prefix })
    }

    // -- Internal helpers ------------------------------------------------

    /// Full URL for a path under the API prefix.
    fn api_url(&self, path: &str) -> String {
        format!("{}{}{}", self.base, self.prefix, path)
    }

    /// Full URL for a path at the server root (health lives outside the
    /// API prefix).
    fn root_url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// Map a non-2xx response to `ApiError::Backend`, passing 2xx through.
    async fn check(resp: Response) -> Result<Response, ApiError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.bytes().await.unwrap_or_default();
        Err(ApiError::Backend {
            status,
            message: error_message(status, &body),
        })
    }

    /// Decode a 2xx response body as `T`.
    async fn decode<T: serde::de::DeserializeOwned>(resp: Response) -> Result<T, ApiError> {
        resp.json().await.map_err(ApiError::Decode)
    }

    // -- Market CRUD -----------------------------------------------------

    /// Create a new market. Validation happens client-side in `forms`
    /// before this is ever called.
    pub async fn create_market(
        &self,
        request: &CreateMarketRequest,
    ) -> Result<CreateMarketResponse, ApiError> {
        let url = self.api_url("/markets/create");
        debug!(url = %url, ticker = %request.ticker, "Creating market");

        let resp = self.http.post(&url).json(request).send().await?;
        Self::decode(Self::check(resp).await?).await
    }

    /// List markets with optional status/category/monitoring filters.
    pub async fn list_markets(
        &self,
        filters: &MarketFilters,
    ) -> Result<ListMarketsResponse, ApiError> {
        let url = self.api_url("/markets/list");

        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(status) = &filters.status {
            query.push(("status", status.clone()));
        }
        if let Some(category) = &filters.category {
            query.push(("category", category.clone()));
        }
        if let Some(active) = filters.monitoring_active {
            query.push(("monitoring_active", active.to_string()));
        }

        let resp = self.http.get(&url).query(&query).send().await?;
        Self::decode(Self::check(resp).await?).await
    }

    /// Fetch a single market by id.
    pub async fn get_market(&self, market_id: &str) -> Result<Market, ApiError> {
        let url = self.api_url(&format!("/markets/{}", urlencoding::encode(market_id)));
        let resp = self.http.get(&url).send().await?;
        Self::decode(Self::check(resp).await?).await
    }

    /// Delete a market by id.
    pub async fn delete_market(&self, market_id: &str) -> Result<DeleteMarketResponse, ApiError> {
        let url = self.api_url(&format!("/markets/{}", urlencoding::encode(market_id)));
        debug!(url = %url, "Deleting market");
        let resp = self.http.delete(&url).send().await?;
        Self::decode(Self::check(resp).await?).await
    }
}

// ---------------------------------------------------------------------------
// OracleBackend implementation
// ---------------------------------------------------------------------------

#[async_trait]
impl OracleBackend for ApiClient {
    async fn predict(&self, request: PredictRequest) -> Result<PredictionSnapshot, ApiError> {
        let url = self.api_url("/oracle/predict");
        debug!(url = %url, ticker = %request.ticker, "Requesting oracle prediction");

        let resp = self.http.post(&url).json(&request).send().await?;
        Self::decode(Self::check(resp).await?).await
    }

    async fn history(
        &self,
        market_id: &str,
        limit: Option<u32>,
        time_range_hours: Option<u32>,
    ) -> Result<HistoryResponse, ApiError> {
        let url = self.api_url(&format!(
            "/oracle/history/{}",
            urlencoding::encode(market_id)
        ));

        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(limit) = limit {
            query.push(("limit", limit.to_string()));
        }
        if let Some(hours) = time_range_hours {
            query.push(("time_range_hours", hours.to_string()));
        }

        let resp = self.http.get(&url).query(&query).send().await?;
        Self::decode(Self::check(resp).await?).await
    }

    async fn latest(
        &self,
        market_id: &str,
        time_range_hours: u32,
    ) -> Result<HistoryPoint, ApiError> {
        let url = self.api_url(&format!(
            "/oracle/latest/{}",
            urlencoding::encode(market_id)
        ));

        let resp = self
            .http
            .get(&url)
            .query(&[("time_range_hours", time_range_hours.to_string())])
            .send()
            .await?;
        Self::decode(Self::check(resp).await?).await
    }

    async fn oracle_markets(&self) -> Result<Vec<Market>, ApiError> {
        let url = self.api_url("/oracle/markets");
        let resp = self.http.get(&url).send().await?;
        let body: OracleMarketsResponse = Self::decode(Self::check(resp).await?).await?;
        Ok(body.markets)
    }

    async fn health(&self) -> Result<HealthStatus, ApiError> {
        let url = self.root_url("/health");
        let resp = self.http.get(&url).send().await?;
        Self::decode(Self::check(resp).await?).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
