//! End-to-end tests: watchers feeding the dashboard API.
//!
//! Spawns real polling tasks against the scripted mock backend, registers
//! their feeds on the dashboard state, and asserts on what the HTTP
//! endpoints actually serve. Time is paused, so polling cycles complete
//! instantly and deterministically.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tower::ServiceExt;

use void::api::OracleBackend;
use void::dashboard::{build_router, AppState, DashboardState};
use void::grid;
use void::metrics::{DivergencePolicy, ScoreDefaults};
use void::sync::{HistoryOptions, HistoryWatcher, LiveOptions, LiveWatcher};

use super::mock_backend::MockBackend;

fn test_state() -> AppState {
    Arc::new(DashboardState::new("VOID-TEST", DivergencePolicy::default()))
}

fn live_options(ticker: &str) -> LiveOptions {
    LiveOptions {
        ticker: ticker.to_string(),
        query: format!("Will {ticker} resolve YES?"),
        market_id: None,
        time_range_hours: 24,
        update_interval: Duration::from_secs(600),
        initial_delay: Duration::ZERO,
    }
}

fn history_options(market_id: &str) -> HistoryOptions {
    HistoryOptions {
        market_id: market_id.to_string(),
        time_range_hours: 24,
        limit: 100,
        refresh_interval: Duration::from_secs(30),
    }
}

async fn wait_for<T: Clone, F: Fn(&T) -> bool>(rx: &mut watch::Receiver<T>, pred: F) -> T {
    loop {
        if pred(&rx.borrow()) {
            return rx.borrow().clone();
        }
        rx.changed().await.unwrap();
    }
}

async fn get_json(router: axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let resp = router
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = resp.status();
    let body = axum::body::to_bytes(resp.into_body(), 1_000_000).await.unwrap();
    let json = if body.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

#[tokio::test(start_paused = true)]
async fn test_live_watcher_feeds_dashboard() {
    let backend = Arc::new(MockBackend::new());
    let state = test_state();

    let watcher = LiveWatcher::spawn(
        backend.clone() as Arc<dyn OracleBackend>,
        live_options("BTC100K"),
    );
    state.register_live("BTC100K", watcher.subscribe()).await;

    let mut rx = watcher.subscribe();
    wait_for(&mut rx, |s| s.result.is_some()).await;

    let (status, json) = get_json(build_router(state), "/api/live/BTC100K").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["ticker"], "BTC100K");
    // First scripted snapshot: ai 60, market 50. Divergence is recomputed
    // at read time, 10 points is not high under the default 20 threshold.
    assert_eq!(json["ai_score"], 60.0);
    assert_eq!(json["market_score"], 50.0);
    assert_eq!(json["divergence"], 10.0);
    assert_eq!(json["high_divergence"], false);
    assert!(json["error"].is_null());
}

#[tokio::test(start_paused = true)]
async fn test_live_poll_replaces_served_value() {
    let backend = Arc::new(MockBackend::new());
    let state = test_state();

    let mut options = live_options("BTC100K");
    options.update_interval = Duration::from_secs(60);
    let watcher = LiveWatcher::spawn(backend.clone() as Arc<dyn OracleBackend>, options);
    state.register_live("BTC100K", watcher.subscribe()).await;

    let mut rx = watcher.subscribe();
    wait_for(&mut rx, |s| s.result.is_some()).await;
    // Scores increment per scripted fetch; wait for at least one repoll.
    wait_for(&mut rx, |s| {
        s.result
            .as_ref()
            .map(|r| r.snapshot.ai_score > 60.0)
            .unwrap_or(false)
    })
    .await;

    let (_, json) = get_json(build_router(state), "/api/live/BTC100K").await;
    assert!(json["ai_score"].as_f64().unwrap() > 60.0);
    assert!(backend.predict_calls.load(Ordering::SeqCst) >= 2);
}

#[tokio::test(start_paused = true)]
async fn test_live_failure_serves_stale_data_with_error() {
    let backend = Arc::new(MockBackend::new());
    let state = test_state();

    let mut options = live_options("BTC100K");
    options.update_interval = Duration::from_secs(30);
    let watcher = LiveWatcher::spawn(backend.clone() as Arc<dyn OracleBackend>, options);
    state.register_live("BTC100K", watcher.subscribe()).await;

    let mut rx = watcher.subscribe();
    wait_for(&mut rx, |s| s.result.is_some()).await;

    backend.set_error("oracle overloaded");
    let state_snapshot = wait_for(&mut rx, |s| s.error.is_some()).await;
    assert!(state_snapshot.result.is_some());

    let (status, json) = get_json(build_router(state), "/api/live/BTC100K").await;
    assert_eq!(status, StatusCode::OK);
    // Last good snapshot still served alongside the error.
    assert_eq!(json["ai_score"], 60.0);
    assert_eq!(json["error"], "oracle overloaded");
}

#[tokio::test(start_paused = true)]
async fn test_history_served_chronologically_with_current() {
    let backend = Arc::new(MockBackend::new());
    backend.set_history(
        "mkt-1",
        vec![
            MockBackend::point(3, "mkt-1", 62.0, "2026-02-01T14:00:00"),
            MockBackend::point(2, "mkt-1", 58.0, "2026-02-01T13:00:00"),
            MockBackend::point(1, "mkt-1", 55.0, "2026-02-01T12:00:00"),
        ],
    );
    let state = test_state();

    let watcher = HistoryWatcher::spawn(
        backend.clone() as Arc<dyn OracleBackend>,
        history_options("mkt-1"),
    );
    state.register_history("mkt-1", watcher.subscribe()).await;

    let mut rx = watcher.subscribe();
    wait_for(&mut rx, |s| !s.history.is_empty()).await;

    let (status, json) = get_json(build_router(state), "/api/history/mkt-1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["count"], 3);
    let ids: Vec<i64> = json["history"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert_eq!(json["current"]["id"], 3);
    assert_eq!(json["current"]["ai_score"], 62.0);
}

#[tokio::test(start_paused = true)]
async fn test_history_failure_keeps_series_served() {
    let backend = Arc::new(MockBackend::new());
    backend.set_history(
        "mkt-1",
        vec![MockBackend::point(1, "mkt-1", 55.0, "2026-02-01T12:00:00")],
    );
    let state = test_state();

    let watcher = HistoryWatcher::spawn(
        backend.clone() as Arc<dyn OracleBackend>,
        history_options("mkt-1"),
    );
    state.register_history("mkt-1", watcher.subscribe()).await;

    let mut rx = watcher.subscribe();
    wait_for(&mut rx, |s| !s.history.is_empty()).await;

    backend.set_error("db offline");
    wait_for(&mut rx, |s| s.error.is_some()).await;

    let (_, json) = get_json(build_router(state.clone()), "/api/history/mkt-1").await;
    assert_eq!(json["count"], 1);
    assert_eq!(json["history"][0]["id"], 1);
    assert_eq!(json["error"], "db offline");

    // Once the backend recovers, the next poll clears the error.
    backend.clear_error();
    wait_for(&mut rx, |s| s.error.is_none() && s.last_update.is_some()).await;

    let (_, json) = get_json(build_router(state), "/api/history/mkt-1").await;
    assert!(json["error"].is_null());
    assert!(backend.history_calls.load(Ordering::SeqCst) >= 2);
}

#[tokio::test(start_paused = true)]
async fn test_grid_refresh_applies_defaults_and_filters() {
    // One scored market and one freshly created market with no scores yet.
    let mut scored = MockBackend::market("mkt-1", "BTC100K", Some("crypto"));
    scored.ai_score = Some(72.0);
    scored.market_score = Some(48.0);
    let unscored = MockBackend::market("mkt-2", "ELECT26", Some("politics"));

    let backend = Arc::new(MockBackend::with_markets(vec![scored, unscored]));
    let state = test_state();

    let defaults = ScoreDefaults::default();
    let policy = DivergencePolicy::default();
    let markets = backend.oracle_markets().await.unwrap();
    let cards: Vec<_> = markets
        .iter()
        .map(|m| grid::to_card(m, &defaults, &policy))
        .collect();
    state.update_grid(Ok(cards)).await;

    let (status, json) = get_json(build_router(state.clone()), "/api/markets").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["count"], 2);

    let cards = json["markets"].as_array().unwrap();
    let btc = cards.iter().find(|c| c["ticker"] == "BTC100K").unwrap();
    assert_eq!(btc["ai_truth_score"], 72);
    assert_eq!(btc["market_probability"], 48);
    assert_eq!(btc["divergence"], 24.0);
    assert_eq!(btc["high_divergence"], true);

    // Score-less market falls back to the 50/50 defaults.
    let elect = cards.iter().find(|c| c["ticker"] == "ELECT26").unwrap();
    assert_eq!(elect["ai_truth_score"], 50);
    assert_eq!(elect["market_probability"], 50);
    assert_eq!(elect["high_divergence"], false);

    let (_, filtered) = get_json(build_router(state), "/api/markets?category=politics").await;
    assert_eq!(filtered["count"], 1);
    assert_eq!(filtered["markets"][0]["ticker"], "ELECT26");
}

#[tokio::test(start_paused = true)]
async fn test_grid_refresh_with_no_markets_is_empty_not_error() {
    let backend = Arc::new(MockBackend::new());
    let state = test_state();

    let markets = backend.oracle_markets().await.unwrap();
    assert!(markets.is_empty());
    state.update_grid(Ok(Vec::new())).await;

    let (status, json) = get_json(build_router(state), "/api/markets").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["count"], 0);
    assert!(json["error"].is_null());
}

#[tokio::test(start_paused = true)]
async fn test_dropped_watcher_stops_polling() {
    let backend = Arc::new(MockBackend::new());

    let mut options = live_options("BTC100K");
    options.update_interval = Duration::from_secs(10);
    let watcher = LiveWatcher::spawn(backend.clone() as Arc<dyn OracleBackend>, options);

    let mut rx = watcher.subscribe();
    wait_for(&mut rx, |s| s.result.is_some()).await;
    drop(watcher);

    let before = backend.predict_calls.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(backend.predict_calls.load(Ordering::SeqCst), before);
}

#[tokio::test(start_paused = true)]
async fn test_status_reflects_registered_feeds() {
    let backend = Arc::new(MockBackend::new());
    let state = test_state();

    let live = LiveWatcher::spawn(
        backend.clone() as Arc<dyn OracleBackend>,
        live_options("BTC100K"),
    );
    let history = HistoryWatcher::spawn(
        backend.clone() as Arc<dyn OracleBackend>,
        history_options("mkt-1"),
    );
    state.register_live("BTC100K", live.subscribe()).await;
    state.register_history("mkt-1", history.subscribe()).await;

    let (status, json) = get_json(build_router(state), "/api/status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["service"], "VOID-TEST");
    assert_eq!(json["live_feeds"], 1);
    assert_eq!(json["history_feeds"], 1);
}
