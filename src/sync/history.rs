//! Persisted history watcher.
//!
//! Keeps a local chronological view of one market's prediction series
//! fresh: an immediate fetch on spawn, then one per `refresh_interval`.
//! The backend returns points newest-first; the watcher reverses them to
//! oldest-first and exposes the final (most recent) point as `current`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::api::{ApiError, OracleBackend};
use crate::types::{HistoryPoint, HistoryResponse};

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Synchronization state exposed to consumers.
#[derive(Debug, Clone, Default)]
pub struct HistoryState {
    /// Chronological (oldest-first) series. Replaced wholesale on success,
    /// retained unchanged on failure.
    pub history: Vec<HistoryPoint>,
    /// The most recent point. An empty refresh window keeps the last known
    /// point rather than clearing it.
    pub current: Option<HistoryPoint>,
    pub is_loading: bool,
    pub error: Option<String>,
    pub last_update: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Options & commands
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct HistoryOptions {
    pub market_id: String,
    pub time_range_hours: u32,
    /// Maximum points per fetch.
    pub limit: u32,
    pub refresh_interval: Duration,
}

enum Command {
    SetMarket(String),
    SetTimeRange(u32),
    Refetch,
}

// ---------------------------------------------------------------------------
// Watcher
// ---------------------------------------------------------------------------

/// Handle to a spawned history polling task. Dropping it aborts the task.
pub struct HistoryWatcher {
    state: watch::Receiver<HistoryState>,
    commands: mpsc::UnboundedSender<Command>,
    handle: JoinHandle<()>,
}

impl HistoryWatcher {
    /// Spawn the polling task. The first fetch happens immediately.
    pub fn spawn(backend: Arc<dyn OracleBackend>, options: HistoryOptions) -> Self {
        let (state_tx, state_rx) = watch::channel(HistoryState::default());
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        let handle = tokio::spawn(run(backend, options, state_tx, command_rx));

        Self {
            state: state_rx,
            commands: command_tx,
            handle,
        }
    }

    /// Subscribe to state updates.
    pub fn subscribe(&self) -> watch::Receiver<HistoryState> {
        self.state.clone()
    }

    /// The current state, cloned.
    pub fn current(&self) -> HistoryState {
        self.state.borrow().clone()
    }

    /// Trigger an immediate out-of-schedule fetch.
    pub fn refetch(&self) {
        let _ = self.commands.send(Command::Refetch);
    }

    /// Switch to a different market and refetch immediately.
    pub fn set_market(&self, market_id: impl Into<String>) {
        let _ = self.commands.send(Command::SetMarket(market_id.into()));
    }

    /// Change the refresh window and refetch immediately.
    pub fn set_time_range(&self, hours: u32) {
        let _ = self.commands.send(Command::SetTimeRange(hours));
    }
}

impl Drop for HistoryWatcher {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

// ---------------------------------------------------------------------------
// Polling task
// ---------------------------------------------------------------------------

async fn run(
    backend: Arc<dyn OracleBackend>,
    mut options: HistoryOptions,
    state_tx: watch::Sender<HistoryState>,
    mut command_rx: mpsc::UnboundedReceiver<Command>,
) {
    // Same sequencing discipline as the live watcher: only the latest
    // issued fetch may update state.
    let issued = Arc::new(AtomicU64::new(0));
    let (result_tx, mut result_rx) =
        mpsc::unbounded_channel::<(u64, Result<HistoryResponse, ApiError>)>();

    // First fetch is immediate.
    start_fetch(&backend, &options, &issued, &state_tx, &result_tx);
    let mut next_at = Instant::now() + options.refresh_interval;

    loop {
        tokio::select! {
            _ = tokio::time::sleep_until(next_at) => {
                start_fetch(&backend, &options, &issued, &state_tx, &result_tx);
                next_at = Instant::now() + options.refresh_interval;
            }

            cmd = command_rx.recv() => match cmd {
                Some(Command::Refetch) => {
                    start_fetch(&backend, &options, &issued, &state_tx, &result_tx);
                }
                Some(Command::SetMarket(market_id)) => {
                    debug!(market_id = %market_id, "History watcher switched market");
                    options.market_id = market_id;
                    start_fetch(&backend, &options, &issued, &state_tx, &result_tx);
                    next_at = Instant::now() + options.refresh_interval;
                }
                Some(Command::SetTimeRange(hours)) => {
                    options.time_range_hours = hours;
                    start_fetch(&backend, &options, &issued, &state_tx, &result_tx);
                    next_at = Instant::now() + options.refresh_interval;
                }
                None => break,
            },

            Some((seq, result)) = result_rx.recv() => {
                apply_result(&state_tx, &issued, seq, result, &options.market_id);
            }
        }
    }
}

fn start_fetch(
    backend: &Arc<dyn OracleBackend>,
    options: &HistoryOptions,
    issued: &Arc<AtomicU64>,
    state_tx: &watch::Sender<HistoryState>,
    result_tx: &mpsc::UnboundedSender<(u64, Result<HistoryResponse, ApiError>)>,
) {
    let seq = issued.fetch_add(1, Ordering::SeqCst) + 1;

    state_tx.send_modify(|s| s.is_loading = true);

    let backend = Arc::clone(backend);
    let result_tx = result_tx.clone();
    let market_id = options.market_id.clone();
    let limit = options.limit;
    let hours = options.time_range_hours;
    tokio::spawn(async move {
        let result = backend.history(&market_id, Some(limit), Some(hours)).await;
        let _ = result_tx.send((seq, result));
    });
}

fn apply_result(
    state_tx: &watch::Sender<HistoryState>,
    issued: &AtomicU64,
    seq: u64,
    result: Result<HistoryResponse, ApiError>,
    market_id: &str,
) {
    if seq != issued.load(Ordering::SeqCst) {
        debug!(seq, market_id, "Discarding superseded history response");
        return;
    }

    state_tx.send_modify(|s| {
        s.is_loading = false;
        match result {
            Ok(response) => {
                // Backend order is newest-first; expose oldest-first.
                let mut chronological = response.history;
                chronological.reverse();

                if let Some(latest) = chronological.last() {
                    s.current = Some(latest.clone());
                }
                s.history = chronological;
                s.error = None;
                s.last_update = Some(Utc::now());
            }
            Err(e) => {
                warn!(market_id, error = %e, "History fetch failed");
                // Previous series stays visible; only the error is replaced.
                s.error = Some(e.to_string());
            }
        }
    });
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
