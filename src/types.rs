//! Shared types for the VOID dashboard synchronizer.
//!
//! Wire-level shapes mirror the backend JSON exactly; everything here is
//! deserialization-tolerant because the backend evolves independently of
//! this client. Timestamps stay as the ISO-8601 strings the backend sends —
//! they are display/ordering payload, never arithmetic operands.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Market
// ---------------------------------------------------------------------------

/// A user-created prediction market as persisted by the backend.
///
/// Score fields are a denormalized snapshot of the latest analysis and are
/// only ever written by the backend; this client treats them as read-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Market {
    #[serde(default)]
    pub id: i64,
    pub market_id: String,
    pub ticker: String,
    pub query: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub deadline: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub completed_at: Option<String>,
    #[serde(default)]
    pub created_by: Option<String>,
    /// Backend serialises this as 0/1, not a bool.
    #[serde(default)]
    pub monitoring_active: i64,
    #[serde(default)]
    pub check_interval_minutes: Option<u32>,
    #[serde(default)]
    pub external_market_url: Option<String>,

    // Latest-known analysis snapshot (absent until the first cycle runs)
    #[serde(default)]
    pub ai_score: Option<f64>,
    #[serde(default)]
    pub market_score: Option<f64>,
    #[serde(default)]
    pub divergence_index: Option<f64>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub vocal_summary: Option<String>,
    #[serde(default)]
    pub last_prediction: Option<String>,
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} (AI: {} | market: {})",
            self.ticker,
            self.query,
            self.ai_score.map_or("—".into(), |s| format!("{s:.0}")),
            self.market_score.map_or("—".into(), |s| format!("{s:.0}")),
        )
    }
}

impl Market {
    /// Whether the backend has produced at least one analysis for this market.
    pub fn has_prediction(&self) -> bool {
        self.ai_score.is_some() && self.market_score.is_some()
    }

    /// Helper to build a test/sample market with sensible defaults.
    #[cfg(test)]
    pub fn sample() -> Self {
        Market {
            id: 1,
            market_id: "mkt-001".to_string(),
            ticker: "BTC100K".to_string(),
            query: "Will Bitcoin reach $100k by end of 2026?".to_string(),
            description: Some("Resolves YES on any exchange print >= $100,000.".to_string()),
            category: Some("crypto".to_string()),
            deadline: Some("2026-12-31T23:59:59".to_string()),
            status: Some("active".to_string()),
            created_at: Some("2026-01-15T09:30:00".to_string()),
            completed_at: None,
            created_by: Some("anon".to_string()),
            monitoring_active: 1,
            check_interval_minutes: Some(30),
            external_market_url: None,
            ai_score: Some(62.4),
            market_score: Some(48.1),
            divergence_index: Some(14.3),
            confidence: Some(0.81),
            vocal_summary: Some("Sentiment leans bullish vs. market pricing.".to_string()),
            last_prediction: Some("2026-02-01T12:00:00".to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Prediction snapshots
// ---------------------------------------------------------------------------

/// Point-in-time oracle result from `POST /oracle/predict`.
///
/// Immutable once received — later snapshots supersede, never edit, it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionSnapshot {
    pub ticker: String,
    /// AI-estimated probability, 0–100.
    pub ai_score: f64,
    /// Market-implied probability, 0–100.
    pub market_score: f64,
    /// Backend-computed |ai - market|, in percentage points.
    pub divergence_index: f64,
    pub vocal_summary: String,
    pub confidence: f64,
    #[serde(default)]
    pub data_sources: Option<DataSourceStats>,
    #[serde(default)]
    pub sentiment_analysis: Option<SentimentAnalysis>,
    #[serde(default)]
    pub bot_detection: Option<BotDetection>,
    pub timestamp: String,
    #[serde(default)]
    pub processing_time_ms: Option<u64>,
}

/// Volume/quality statistics for the data underlying a snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DataSourceStats {
    #[serde(default)]
    pub twitter_posts: u32,
    #[serde(default)]
    pub influencer_posts: u32,
    #[serde(default)]
    pub bot_ratio: f64,
    #[serde(default)]
    pub total_engagement: u64,
    #[serde(default)]
    pub unique_accounts: u32,
    #[serde(default)]
    pub time_span_hours: f64,
}

/// Optional sentiment breakdown attached to a snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentimentAnalysis {
    pub sentiment_score: SentimentScore,
    #[serde(default)]
    pub key_phrases: Vec<String>,
    #[serde(default)]
    pub trending_topics: Vec<String>,
    #[serde(default)]
    pub sentiment_momentum: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentimentScore {
    pub bullish: f64,
    pub bearish: f64,
    pub neutral: f64,
    pub overall: f64,
    pub confidence: f64,
}

/// Optional bot-detection summary attached to a snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotDetection {
    pub bot_probability: f64,
    pub authentic_ratio: f64,
    #[serde(default)]
    pub suspicious_patterns: Vec<String>,
    #[serde(default)]
    pub top_influencers: Vec<InfluencerProfile>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfluencerProfile {
    pub username: String,
    #[serde(default)]
    pub followers: u64,
    #[serde(default)]
    pub verified: bool,
    #[serde(default)]
    pub engagement_rate: f64,
    #[serde(default)]
    pub credibility_score: f64,
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

/// A persisted snapshot with stable identity (market id + timestamp).
///
/// Backend history is append-only: a point's values never change after
/// being observed, though new points appear at increasing timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryPoint {
    #[serde(default)]
    pub id: i64,
    pub market_id: String,
    pub ticker: String,
    pub ai_score: f64,
    pub market_score: f64,
    pub divergence_index: f64,
    pub confidence: f64,
    #[serde(default)]
    pub vocal_summary: String,
    pub timestamp: String,
}

/// Response from `GET /oracle/history/{market_id}` — newest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub market_id: String,
    pub count: usize,
    pub history: Vec<HistoryPoint>,
}

// ---------------------------------------------------------------------------
// Market CRUD
// ---------------------------------------------------------------------------

/// Body for `POST /markets/create`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMarketRequest {
    pub ticker: String,
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_interval_minutes: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_market_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMarketResponse {
    pub success: bool,
    pub message: String,
    pub market: Market,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListMarketsResponse {
    pub count: usize,
    pub markets: Vec<Market>,
}

/// Response from `GET /oracle/markets` (dashboard grid source).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleMarketsResponse {
    pub markets: Vec<Market>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteMarketResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: String,
}

/// Query-string filters for `GET /markets/list`.
#[derive(Debug, Clone, Default)]
pub struct MarketFilters {
    pub status: Option<String>,
    pub category: Option<String>,
    pub monitoring_active: Option<bool>,
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub service: String,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
