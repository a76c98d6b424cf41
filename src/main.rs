//! VOID — Prediction-market divergence dashboard synchronizer
//!
//! Entry point. Loads configuration, initialises structured logging,
//! checks backend health, spawns the live/history watchers and the
//! dashboard server, and runs the market-grid refresh loop with graceful
//! shutdown.

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use void::api::{ApiClient, OracleBackend};
use void::config;
use void::dashboard::{spawn_dashboard, DashboardState};
use void::grid;
use void::sync::{HistoryOptions, HistoryWatcher, LiveOptions, LiveWatcher};

const BANNER: &str = r#"
__     __ ___  ___ ____
\ \   / // _ \|_ _|  _ \
 \ \ / /| | | || || | | |
  \ V / | |_| || || |_| |
   \_/   \___/|___|____/

  Vocal Oracle Intelligence Divergence — dashboard sync
  v0.1.0
"#;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    // Load configuration from TOML
    let cfg = config::AppConfig::load("config.toml")?;

    // Initialise structured logging
    init_logging();

    // Print startup banner
    println!("{BANNER}");
    let base_url = cfg.backend.resolved_base_url();
    info!(
        service = %cfg.service.name,
        backend = %base_url,
        api_prefix = %cfg.backend.api_prefix,
        watched = cfg.watch.len(),
        "VOID starting up"
    );

    // -- Backend client ---------------------------------------------------

    let backend = Arc::new(ApiClient::new(&base_url, &cfg.backend.api_prefix)?);

    match backend.health().await {
        Ok(h) => info!(status = %h.status, service = %h.service, "Backend reachable"),
        Err(e) => warn!(error = %e, "Backend health check failed — continuing, watchers will retry"),
    }

    // -- Dashboard state and server ---------------------------------------

    let state = Arc::new(DashboardState::new(
        cfg.service.name.clone(),
        cfg.divergence,
    ));

    if cfg.dashboard.enabled {
        spawn_dashboard(state.clone(), cfg.dashboard.port)?;
    }

    // -- Watchers ----------------------------------------------------------

    // Handles are held for the process lifetime; dropping one aborts its
    // polling task.
    let mut live_watchers = Vec::new();
    let mut history_watchers = Vec::new();

    for entry in &cfg.watch {
        let live = LiveWatcher::spawn(
            backend.clone() as Arc<dyn OracleBackend>,
            LiveOptions {
                ticker: entry.ticker.clone(),
                query: entry.query.clone(),
                market_id: entry.market_id.clone(),
                time_range_hours: cfg.polling.time_range_hours,
                update_interval: Duration::from_secs(cfg.polling.live_interval_secs),
                initial_delay: Duration::from_secs(cfg.polling.live_initial_delay_secs),
            },
        );
        state.register_live(entry.ticker.clone(), live.subscribe()).await;
        info!(ticker = %entry.ticker, "Live watcher spawned");
        live_watchers.push(live);

        if let Some(market_id) = &entry.market_id {
            let history = HistoryWatcher::spawn(
                backend.clone() as Arc<dyn OracleBackend>,
                HistoryOptions {
                    market_id: market_id.clone(),
                    time_range_hours: cfg.polling.time_range_hours,
                    limit: cfg.polling.history_limit,
                    refresh_interval: Duration::from_secs(cfg.polling.history_refresh_secs),
                },
            );
            state
                .register_history(market_id.clone(), history.subscribe())
                .await;
            info!(market_id = %market_id, "History watcher spawned");
            history_watchers.push(history);
        }
    }

    // -- Grid refresh loop -------------------------------------------------

    let mut interval = tokio::time::interval(Duration::from_secs(cfg.polling.grid_refresh_secs));
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    info!(
        grid_refresh_secs = cfg.polling.grid_refresh_secs,
        "Entering grid refresh loop. Press Ctrl+C to stop."
    );

    loop {
        tokio::select! {
            _ = interval.tick() => {
                refresh_grid(&*backend, &state, &cfg).await;
            }
            _ = &mut shutdown => {
                info!("Shutdown signal received.");
                break;
            }
        }
    }

    info!("VOID shut down cleanly.");
    Ok(())
}

/// Fetch all oracle markets and replace the dashboard grid. A failed
/// refresh keeps the previous cards visible alongside the error.
async fn refresh_grid(backend: &dyn OracleBackend, state: &DashboardState, cfg: &config::AppConfig) {
    match backend.oracle_markets().await {
        Ok(markets) => {
            let cards: Vec<_> = markets
                .iter()
                .map(|m| grid::to_card(m, &cfg.defaults, &cfg.divergence))
                .collect();
            info!(count = cards.len(), "Market grid refreshed");
            state.update_grid(Ok(cards)).await;
        }
        Err(e) => {
            error!(error = %e, "Market grid refresh failed");
            state.update_grid(Err(e.to_string())).await;
        }
    }
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("void=info"));

    let json_logging = std::env::var("VOID_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
