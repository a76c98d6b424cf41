//! Dashboard API route handlers.
//!
//! All endpoints return JSON views over the watchers' synchronized state.
//! State is shared via `Arc<DashboardState>`; derived metrics are
//! recomputed on every request from whatever snapshot is current.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{watch, RwLock};

use crate::grid::{MarketCard, MarketFilter};
use crate::metrics::{divergence, DivergencePolicy};
use crate::sync::{HistoryState, LiveState};
use crate::types::HistoryPoint;

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Latest market-grid refresh. Cards survive a failed refresh; only the
/// error is replaced.
#[derive(Debug, Default)]
pub struct GridSnapshot {
    pub cards: Vec<MarketCard>,
    pub error: Option<String>,
    pub refreshed_at: Option<DateTime<Utc>>,
}

/// Shared state accessible by all route handlers.
pub struct DashboardState {
    pub service: String,
    pub started_at: DateTime<Utc>,
    pub divergence: DivergencePolicy,
    /// Live prediction feeds, keyed by ticker.
    live: RwLock<HashMap<String, watch::Receiver<LiveState>>>,
    /// History feeds, keyed by market id.
    history: RwLock<HashMap<String, watch::Receiver<HistoryState>>>,
    grid: RwLock<GridSnapshot>,
}

impl DashboardState {
    pub fn new(service: impl Into<String>, divergence: DivergencePolicy) -> Self {
        Self {
            service: service.into(),
            started_at: Utc::now(),
            divergence,
            live: RwLock::new(HashMap::new()),
            history: RwLock::new(HashMap::new()),
            grid: RwLock::new(GridSnapshot::default()),
        }
    }

    /// Attach a live watcher's feed under its ticker.
    pub async fn register_live(&self, ticker: impl Into<String>, rx: watch::Receiver<LiveState>) {
        self.live.write().await.insert(ticker.into(), rx);
    }

    /// Attach a history watcher's feed under its market id.
    pub async fn register_history(
        &self,
        market_id: impl Into<String>,
        rx: watch::Receiver<HistoryState>,
    ) {
        self.history.write().await.insert(market_id.into(), rx);
    }

    /// Store a grid refresh result. Failures keep the previous cards.
    pub async fn update_grid(&self, result: Result<Vec<MarketCard>, String>) {
        let mut grid = self.grid.write().await;
        match result {
            Ok(cards) => {
                grid.cards = cards;
                grid.error = None;
                grid.refreshed_at = Some(Utc::now());
            }
            Err(message) => grid.error = Some(message),
        }
    }
}

pub type AppState = Arc<DashboardState>;

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub service: String,
    pub status: String,
    pub uptime_secs: i64,
    pub live_feeds: usize,
    pub history_feeds: usize,
    pub grid_markets: usize,
}

/// One live prediction feed, with divergence recomputed at read time.
#[derive(Debug, Clone, Serialize)]
pub struct LiveView {
    pub ticker: String,
    pub ai_score: Option<f64>,
    pub market_score: Option<f64>,
    pub divergence: Option<f64>,
    pub high_divergence: Option<bool>,
    pub summary: Option<String>,
    pub confidence: Option<f64>,
    pub is_loading: bool,
    pub error: Option<String>,
    pub last_update: Option<DateTime<Utc>>,
}

impl LiveView {
    fn build(ticker: &str, state: &LiveState, policy: &DivergencePolicy) -> Self {
        let snapshot = state.result.as_ref().map(|r| &r.snapshot);
        Self {
            ticker: ticker.to_string(),
            ai_score: snapshot.map(|s| s.ai_score),
            market_score: snapshot.map(|s| s.market_score),
            divergence: snapshot.map(|s| divergence(s.ai_score, s.market_score)),
            high_divergence: snapshot.map(|s| policy.is_high(s.ai_score, s.market_score)),
            summary: snapshot.map(|s| s.vocal_summary.clone()),
            confidence: snapshot.map(|s| s.confidence),
            is_loading: state.is_loading,
            error: state.error.clone(),
            last_update: state.last_update,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryView {
    pub market_id: String,
    pub count: usize,
    pub current: Option<HistoryPoint>,
    pub history: Vec<HistoryPoint>,
    pub error: Option<String>,
    pub last_update: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GridResponse {
    pub count: usize,
    pub markets: Vec<MarketCard>,
    pub error: Option<String>,
    pub refreshed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct GridQuery {
    pub category: Option<String>,
    pub search: Option<String>,
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

/// GET /api/status
pub async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    let uptime = (Utc::now() - state.started_at).num_seconds();
    Json(StatusResponse {
        service: state.service.clone(),
        status: "ok".to_string(),
        uptime_secs: uptime,
        live_feeds: state.live.read().await.len(),
        history_feeds: state.history.read().await.len(),
        grid_markets: state.grid.read().await.cards.len(),
    })
}

/// GET /api/live
pub async fn get_live_all(State(state): State<AppState>) -> Json<Vec<LiveView>> {
    let live = state.live.read().await;
    let mut views: Vec<LiveView> = live
        .iter()
        .map(|(ticker, rx)| LiveView::build(ticker, &rx.borrow(), &state.divergence))
        .collect();
    views.sort_by(|a, b| a.ticker.cmp(&b.ticker));
    Json(views)
}

/// GET /api/live/:ticker
pub async fn get_live(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
) -> Result<Json<LiveView>, StatusCode> {
    let live = state.live.read().await;
    let rx = live.get(&ticker).ok_or(StatusCode::NOT_FOUND)?;
    let view = LiveView::build(&ticker, &rx.borrow(), &state.divergence);
    Ok(Json(view))
}

/// GET /api/history/:market_id
pub async fn get_history(
    State(state): State<AppState>,
    Path(market_id): Path<String>,
) -> Result<Json<HistoryView>, StatusCode> {
    let history = state.history.read().await;
    let rx = history.get(&market_id).ok_or(StatusCode::NOT_FOUND)?;
    let snapshot = rx.borrow().clone();
    Ok(Json(HistoryView {
        market_id,
        count: snapshot.history.len(),
        current: snapshot.current,
        history: snapshot.history,
        error: snapshot.error,
        last_update: snapshot.last_update,
    }))
}

/// GET /api/markets?category=&search=
pub async fn get_markets(
    State(state): State<AppState>,
    Query(query): Query<GridQuery>,
) -> Json<GridResponse> {
    let grid = state.grid.read().await;

    let filter = MarketFilter {
        category: query.category.unwrap_or_else(|| "all".to_string()),
        search: query.search.unwrap_or_default(),
    };
    let markets: Vec<MarketCard> = filter.apply(&grid.cards).into_iter().cloned().collect();

    Json(GridResponse {
        count: markets.len(),
        markets,
        error: grid.error.clone(),
        refreshed_at: grid.refreshed_at,
    })
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok", "service": state.service }))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
