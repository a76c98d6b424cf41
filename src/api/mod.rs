//! Backend API integration.
//!
//! Defines the `OracleBackend` trait (the read/poll surface the sync
//! watchers depend on) and the concrete `ApiClient` implementation over
//! the VOID REST API. Market CRUD lives on `ApiClient` directly — nothing
//! in the sync layer writes markets.

pub mod client;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use thiserror::Error;

use crate::types::{HealthStatus, HistoryPoint, HistoryResponse, Market, PredictionSnapshot};

pub use client::ApiClient;

/// Default data-collection window for predictions, in hours.
pub const DEFAULT_TIME_RANGE_HOURS: u32 = 24;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failure of a single backend call.
///
/// `Backend` carries the server's own message verbatim (extracted from the
/// JSON error body) so the UI layer can surface it unchanged.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Non-2xx response. Displays as exactly the server-provided message.
    #[error("{message}")]
    Backend { status: StatusCode, message: String },

    /// Transport-level failure (connect, timeout, TLS, ...).
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// 2xx response whose body did not decode as the expected shape.
    #[error("unexpected response body: {0}")]
    Decode(#[source] reqwest::Error),
}

/// Extract a human-readable message from an error response body.
///
/// The backend reports errors as JSON with either an `error` or a `detail`
/// field. Anything else (HTML proxy pages, empty bodies) falls back to the
/// HTTP status text.
pub(crate) fn error_message(status: StatusCode, body: &[u8]) -> String {
    let from_body = serde_json::from_slice::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .or_else(|| v.get("detail"))
                .and_then(|m| m.as_str().map(String::from))
        });

    from_body.unwrap_or_else(|| {
        status
            .canonical_reason()
            .map(String::from)
            .unwrap_or_else(|| format!("API error: {}", status.as_u16()))
    })
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Body for `POST /oracle/predict` — triggers a fresh backend analysis.
#[derive(Debug, Clone, Serialize)]
pub struct PredictRequest {
    pub ticker: String,
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_id: Option<String>,
    pub time_range_hours: u32,
}

impl PredictRequest {
    pub fn new(ticker: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            query: query.into(),
            market_id: None,
            time_range_hours: DEFAULT_TIME_RANGE_HOURS,
        }
    }

    pub fn with_market_id(mut self, market_id: impl Into<String>) -> Self {
        self.market_id = Some(market_id.into());
        self
    }

    pub fn with_time_range(mut self, hours: u32) -> Self {
        self.time_range_hours = hours;
        self
    }
}

// ---------------------------------------------------------------------------
// Backend trait
// ---------------------------------------------------------------------------

/// Read/poll surface of the VOID oracle backend.
///
/// The sync watchers depend on this trait rather than on `ApiClient`
/// directly so tests can substitute a deterministic mock.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OracleBackend: Send + Sync {
    /// Trigger a fresh analysis and return the resulting snapshot.
    async fn predict(&self, request: PredictRequest) -> Result<PredictionSnapshot, ApiError>;

    /// Fetch the persisted prediction series for a market, newest first.
    async fn history(
        &self,
        market_id: &str,
        limit: Option<u32>,
        time_range_hours: Option<u32>,
    ) -> Result<HistoryResponse, ApiError>;

    /// Fetch the single most recent persisted point for a market.
    async fn latest(
        &self,
        market_id: &str,
        time_range_hours: u32,
    ) -> Result<HistoryPoint, ApiError>;

    /// Fetch all markets known to the oracle (grid source).
    async fn oracle_markets(&self) -> Result<Vec<Market>, ApiError>;

    /// Backend liveness probe.
    async fn health(&self) -> Result<HealthStatus, ApiError>;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
