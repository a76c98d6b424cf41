//! Mock backend for integration testing.
//!
//! Provides a deterministic `OracleBackend` implementation with scripted
//! markets and history, a failure switch, and call counters — all
//! in-memory with no external dependencies.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use void::api::{ApiError, OracleBackend, PredictRequest};
use void::types::*;

/// A deterministic oracle backend for tests.
///
/// Each `predict` call returns an AI score that increments by one, so tests
/// can observe replacement across polls. History is scripted per market in
/// backend (newest-first) order.
pub struct MockBackend {
    markets: Mutex<Vec<Market>>,
    history: Mutex<Vec<(String, Vec<HistoryPoint>)>>,
    /// If set, all operations return this error as a 503.
    force_error: Mutex<Option<String>>,
    pub predict_calls: AtomicU64,
    pub history_calls: AtomicU64,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            markets: Mutex::new(Vec::new()),
            history: Mutex::new(Vec::new()),
            force_error: Mutex::new(None),
            predict_calls: AtomicU64::new(0),
            history_calls: AtomicU64::new(0),
        }
    }

    pub fn with_markets(markets: Vec<Market>) -> Self {
        let mock = Self::new();
        *mock.markets.lock().unwrap() = markets;
        mock
    }

    /// Script the newest-first history for a market.
    pub fn set_history(&self, market_id: &str, points: Vec<HistoryPoint>) {
        let mut history = self.history.lock().unwrap();
        history.retain(|(id, _)| id != market_id);
        history.push((market_id.to_string(), points));
    }

    /// Force all subsequent operations to fail with the given message.
    pub fn set_error(&self, msg: &str) {
        *self.force_error.lock().unwrap() = Some(msg.to_string());
    }

    /// Clear any forced error.
    pub fn clear_error(&self) {
        *self.force_error.lock().unwrap() = None;
    }

    fn check_error(&self) -> Result<(), ApiError> {
        if let Some(msg) = self.force_error.lock().unwrap().clone() {
            return Err(ApiError::Backend {
                status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
                message: msg,
            });
        }
        Ok(())
    }

    pub fn point(id: i64, market_id: &str, ai: f64, ts: &str) -> HistoryPoint {
        HistoryPoint {
            id,
            market_id: market_id.to_string(),
            ticker: "TEST".to_string(),
            ai_score: ai,
            market_score: 50.0,
            divergence_index: (ai - 50.0).abs(),
            confidence: 0.8,
            vocal_summary: String::new(),
            timestamp: ts.to_string(),
        }
    }

    pub fn market(market_id: &str, ticker: &str, category: Option<&str>) -> Market {
        Market {
            id: 0,
            market_id: market_id.to_string(),
            ticker: ticker.to_string(),
            query: format!("Will {ticker} resolve YES?"),
            description: None,
            category: category.map(String::from),
            deadline: Some("2026-12-31T23:59:59".to_string()),
            status: Some("active".to_string()),
            created_at: None,
            completed_at: None,
            created_by: None,
            monitoring_active: 1,
            check_interval_minutes: None,
            external_market_url: None,
            ai_score: None,
            market_score: None,
            divergence_index: None,
            confidence: None,
            vocal_summary: None,
            last_prediction: None,
        }
    }
}

#[async_trait]
impl OracleBackend for MockBackend {
    async fn predict(&self, request: PredictRequest) -> Result<PredictionSnapshot, ApiError> {
        self.check_error()?;
        let n = self.predict_calls.fetch_add(1, Ordering::SeqCst) as f64;
        Ok(PredictionSnapshot {
            ticker: request.ticker,
            ai_score: 60.0 + n,
            market_score: 50.0,
            divergence_index: 10.0 + n,
            vocal_summary: "scripted".to_string(),
            confidence: 0.9,
            data_sources: None,
            sentiment_analysis: None,
            bot_detection: None,
            timestamp: "2026-02-01T12:00:00".to_string(),
            processing_time_ms: Some(10),
        })
    }

    async fn history(
        &self,
        market_id: &str,
        _limit: Option<u32>,
        _time_range_hours: Option<u32>,
    ) -> Result<HistoryResponse, ApiError> {
        self.check_error()?;
        self.history_calls.fetch_add(1, Ordering::SeqCst);
        let points = self
            .history
            .lock()
            .unwrap()
            .iter()
            .find(|(id, _)| id == market_id)
            .map(|(_, p)| p.clone())
            .unwrap_or_default();
        Ok(HistoryResponse {
            market_id: market_id.to_string(),
            count: points.len(),
            history: points,
        })
    }

    async fn latest(
        &self,
        market_id: &str,
        _time_range_hours: u32,
    ) -> Result<HistoryPoint, ApiError> {
        self.check_error()?;
        self.history
            .lock()
            .unwrap()
            .iter()
            .find(|(id, _)| id == market_id)
            .and_then(|(_, p)| p.first().cloned())
            .ok_or(ApiError::Backend {
                status: reqwest::StatusCode::NOT_FOUND,
                message: "not found".to_string(),
            })
    }

    async fn oracle_markets(&self) -> Result<Vec<Market>, ApiError> {
        self.check_error()?;
        Ok(self.markets.lock().unwrap().clone())
    }

    async fn health(&self) -> Result<HealthStatus, ApiError> {
        self.check_error()?;
        Ok(HealthStatus {
            status: "ok".to_string(),
            service: "mock-oracle".to_string(),
        })
    }
}
