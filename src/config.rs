//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! The backend URL can be overridden at runtime via the `VOID_API_URL`
//! environment variable so deployments don't need to edit the file.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;

use crate::metrics::{DivergencePolicy, ScoreDefaults};

/// Environment variable overriding `backend.base_url`.
pub const API_URL_ENV: &str = "VOID_API_URL";

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub service: ServiceConfig,
    pub backend: BackendConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub divergence: DivergencePolicy,
    #[serde(default)]
    pub defaults: ScoreDefaults,
    pub dashboard: DashboardConfig,
    /// Markets whose live prediction and history should be kept fresh.
    #[serde(default)]
    pub watch: Vec<WatchConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    pub name: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BackendConfig {
    /// Server origin, e.g. `http://127.0.0.1:8000`.
    pub base_url: String,
    /// API path prefix on that origin.
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,
}

fn default_api_prefix() -> String {
    "/api/v1".to_string()
}

impl BackendConfig {
    /// The effective base URL: `VOID_API_URL` if set, else the config value.
    pub fn resolved_base_url(&self) -> String {
        std::env::var(API_URL_ENV).unwrap_or_else(|_| self.base_url.clone())
    }
}

/// Polling cadences. These are policy, not protocol — any value works, the
/// defaults just match the dashboard's original behaviour.
#[derive(Debug, Deserialize, Clone)]
pub struct PollingConfig {
    /// Seconds between live prediction refreshes (each triggers a full
    /// backend re-analysis, so this is deliberately slow).
    #[serde(default = "default_live_interval")]
    pub live_interval_secs: u64,
    /// Delay before the first live fetch, to stagger startup load.
    #[serde(default)]
    pub live_initial_delay_secs: u64,
    /// Seconds between history refreshes (cheap DB reads).
    #[serde(default = "default_history_refresh")]
    pub history_refresh_secs: u64,
    /// Seconds between market grid refreshes.
    #[serde(default = "default_grid_refresh")]
    pub grid_refresh_secs: u64,
    /// Data-collection window passed to the backend, in hours.
    #[serde(default = "default_time_range")]
    pub time_range_hours: u32,
    /// Maximum history points fetched per refresh.
    #[serde(default = "default_history_limit")]
    pub history_limit: u32,
}

fn default_live_interval() -> u64 {
    600
}
fn default_history_refresh() -> u64 {
    30
}
fn default_grid_refresh() -> u64 {
    60
}
fn default_time_range() -> u32 {
    24
}
fn default_history_limit() -> u32 {
    100
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            live_interval_secs: default_live_interval(),
            live_initial_delay_secs: 0,
            history_refresh_secs: default_history_refresh(),
            grid_refresh_secs: default_grid_refresh(),
            time_range_hours: default_time_range(),
            history_limit: default_history_limit(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DashboardConfig {
    pub enabled: bool,
    pub port: u16,
}

/// One market to keep synchronized.
#[derive(Debug, Deserialize, Clone)]
pub struct WatchConfig {
    pub ticker: String,
    pub query: String,
    #[serde(default)]
    pub market_id: Option<String>,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::parse(&contents).with_context(|| format!("Failed to parse config file: {path}"))
    }

    /// Parse configuration from a TOML string.
    pub fn parse(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        Ok(config)
    }
}
