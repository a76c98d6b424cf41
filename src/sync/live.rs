//! Live prediction watcher.
//!
//! Keeps a single "live" oracle prediction fresh for one ticker/query pair
//! without user interaction: one fetch after `initial_delay`, then one per
//! `update_interval`. Each success replaces the exposed result; each failure
//! stores the error and leaves the previous result visible. Retargeting to
//! a new ticker/query restarts the schedule from a fresh initial delay.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::api::{ApiError, OracleBackend, PredictRequest};
use crate::types::PredictionSnapshot;

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// A successfully fetched live prediction.
#[derive(Debug, Clone)]
pub struct LiveResult {
    pub snapshot: PredictionSnapshot,
    /// Client-side receive time (the snapshot's own timestamp is backend time).
    pub fetched_at: DateTime<Utc>,
}

/// Synchronization state exposed to consumers.
///
/// `result` survives fetch failures — it always holds the last good value.
#[derive(Debug, Clone, Default)]
pub struct LiveState {
    pub result: Option<LiveResult>,
    pub is_loading: bool,
    pub error: Option<String>,
    pub last_update: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Options & commands
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct LiveOptions {
    pub ticker: String,
    pub query: String,
    pub market_id: Option<String>,
    pub time_range_hours: u32,
    pub update_interval: Duration,
    pub initial_delay: Duration,
}

enum Command {
    Retarget { ticker: String, query: String },
    SetTimeRange(u32),
    Refetch,
}

// ---------------------------------------------------------------------------
// Watcher
// ---------------------------------------------------------------------------

/// Handle to a spawned live-prediction polling task.
///
/// Dropping the handle aborts the task and its timers; responses still in
/// flight are discarded.
pub struct LiveWatcher {
    state: watch::Receiver<LiveState>,
    commands: mpsc::UnboundedSender<Command>,
    handle: JoinHandle<()>,
}

impl LiveWatcher {
    /// Spawn the polling task.
    pub fn spawn(backend: Arc<dyn OracleBackend>, options: LiveOptions) -> Self {
        let (state_tx, state_rx) = watch::channel(LiveState::default());
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        let handle = tokio::spawn(run(backend, options, state_tx, command_rx));

        Self {
            state: state_rx,
            commands: command_tx,
            handle,
        }
    }

    /// Subscribe to state updates.
    pub fn subscribe(&self) -> watch::Receiver<LiveState> {
        self.state.clone()
    }

    /// The current state, cloned.
    pub fn current(&self) -> LiveState {
        self.state.borrow().clone()
    }

    /// Trigger an immediate out-of-schedule fetch.
    pub fn refetch(&self) {
        let _ = self.commands.send(Command::Refetch);
    }

    /// Switch to a new ticker/query pair, restarting the schedule from a
    /// fresh initial delay.
    pub fn retarget(&self, ticker: impl Into<String>, query: impl Into<String>) {
        let _ = self.commands.send(Command::Retarget {
            ticker: ticker.into(),
            query: query.into(),
        });
    }

    /// Change the data-collection window and refetch immediately.
    pub fn set_time_range(&self, hours: u32) {
        let _ = self.commands.send(Command::SetTimeRange(hours));
    }
}

impl Drop for LiveWatcher {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

// ---------------------------------------------------------------------------
// Polling task
// ---------------------------------------------------------------------------

async fn run(
    backend: Arc<dyn OracleBackend>,
    mut options: LiveOptions,
    state_tx: watch::Sender<LiveState>,
    mut command_rx: mpsc::UnboundedReceiver<Command>,
) {
    // Monotonic fetch sequence. A response is applied only if its sequence
    // number is still the latest issued, so a slow early response can never
    // overwrite a newer one.
    let issued = Arc::new(AtomicU64::new(0));
    let (result_tx, mut result_rx) =
        mpsc::unbounded_channel::<(u64, Result<PredictionSnapshot, ApiError>)>();

    let mut next_at = Instant::now() + options.initial_delay;

    loop {
        tokio::select! {
            _ = tokio::time::sleep_until(next_at) => {
                start_fetch(&backend, &options, &issued, &state_tx, &result_tx);
                next_at = Instant::now() + options.update_interval;
            }

            cmd = command_rx.recv() => match cmd {
                Some(Command::Refetch) => {
                    start_fetch(&backend, &options, &issued, &state_tx, &result_tx);
                }
                Some(Command::Retarget { ticker, query }) => {
                    debug!(ticker = %ticker, "Live watcher retargeted");
                    options.ticker = ticker;
                    options.query = query;
                    // Fresh schedule, fresh initial delay.
                    next_at = Instant::now() + options.initial_delay;
                }
                Some(Command::SetTimeRange(hours)) => {
                    options.time_range_hours = hours;
                    start_fetch(&backend, &options, &issued, &state_tx, &result_tx);
                }
                // All handles dropped — nobody can observe us any more.
                None => break,
            },

            Some((seq, result)) = result_rx.recv() => {
                apply_result(&state_tx, &issued, seq, result, &options.ticker);
            }
        }
    }
}

/// Issue a sequence number and spawn the fetch so a hung request stalls
/// only its own cycle, never the timer.
fn start_fetch(
    backend: &Arc<dyn OracleBackend>,
    options: &LiveOptions,
    issued: &Arc<AtomicU64>,
    state_tx: &watch::Sender<LiveState>,
    result_tx: &mpsc::UnboundedSender<(u64, Result<PredictionSnapshot, ApiError>)>,
) {
    let seq = issued.fetch_add(1, Ordering::SeqCst) + 1;

    state_tx.send_modify(|s| s.is_loading = true);

    let mut request = PredictRequest::new(options.ticker.clone(), options.query.clone())
        .with_time_range(options.time_range_hours);
    if let Some(id) = &options.market_id {
        request = request.with_market_id(id.clone());
    }

    let backend = Arc::clone(backend);
    let result_tx = result_tx.clone();
    tokio::spawn(async move {
        let result = backend.predict(request).await;
        let _ = result_tx.send((seq, result));
    });
}

fn apply_result(
    state_tx: &watch::Sender<LiveState>,
    issued: &AtomicU64,
    seq: u64,
    result: Result<PredictionSnapshot, ApiError>,
    ticker: &str,
) {
    if seq != issued.load(Ordering::SeqCst) {
        debug!(seq, ticker, "Discarding superseded prediction response");
        return;
    }

    state_tx.send_modify(|s| {
        s.is_loading = false;
        match result {
            Ok(snapshot) => {
                let now = Utc::now();
                s.result = Some(LiveResult {
                    snapshot,
                    fetched_at: now,
                });
                s.error = None;
                s.last_update = Some(now);
            }
            Err(e) => {
                warn!(ticker, error = %e, "Live prediction fetch failed");
                // Last good result stays visible (stale-while-revalidate).
                s.error = Some(e.to_string());
            }
        }
    });
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
