//! Market grid presentation transform.
//!
//! Normalizes heterogeneous backend market records into the display shape
//! the dashboard renders: score defaults for unanalysed markets, integer
//! rounding, deadline formatting, and the pure category/search filter.
//! Everything here is a pure function of its inputs.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::metrics::{divergence, DivergencePolicy, ScoreDefaults};
use crate::types::Market;

/// Category tabs shown by the dashboard. Immutable configuration — the
/// filter itself accepts any category string the backend produces.
pub const CATEGORIES: &[&str] = &["all", "crypto", "tech", "politics", "sports", "other"];

/// Category assigned to markets the backend left uncategorised.
const FALLBACK_CATEGORY: &str = "markets";

// ---------------------------------------------------------------------------
// Card
// ---------------------------------------------------------------------------

/// One market, normalised for display.
#[derive(Debug, Clone, Serialize)]
pub struct MarketCard {
    pub market_id: String,
    pub ticker: String,
    /// The full market question.
    pub title: String,
    pub description: String,
    pub category: String,
    /// Market-implied probability, rounded to the nearest point.
    pub market_probability: i64,
    /// AI-estimated probability, rounded to the nearest point.
    pub ai_truth_score: i64,
    /// Unrounded |ai - market|, in percentage points.
    pub divergence: f64,
    pub high_divergence: bool,
    /// Short deadline label, or "TBD" when no deadline is set.
    pub deadline_label: String,
    pub last_update: Option<String>,
}

/// Normalise one backend record into a display card.
pub fn to_card(market: &Market, defaults: &ScoreDefaults, policy: &DivergencePolicy) -> MarketCard {
    let ai = defaults.resolve_ai(market.ai_score);
    let implied = defaults.resolve_market(market.market_score);

    MarketCard {
        market_id: market.market_id.clone(),
        ticker: market.ticker.clone(),
        title: market.query.clone(),
        description: market
            .description
            .clone()
            .unwrap_or_else(|| market.query.clone()),
        category: market
            .category
            .clone()
            .unwrap_or_else(|| FALLBACK_CATEGORY.to_string()),
        market_probability: implied.round() as i64,
        ai_truth_score: ai.round() as i64,
        divergence: divergence(ai, implied),
        high_divergence: policy.is_high(ai, implied),
        deadline_label: format_deadline(market.deadline.as_deref()),
        last_update: market.last_prediction.clone(),
    }
}

/// Format a nullable ISO deadline as a short date label.
///
/// `None` becomes "TBD"; an unparseable string passes through unchanged
/// rather than erroring.
pub fn format_deadline(deadline: Option<&str>) -> String {
    let Some(raw) = deadline else {
        return "TBD".to_string();
    };

    let date = DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.date_naive())
        .or_else(|_| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S").map(|dt| dt.date())
        })
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y-%m-%d"));

    match date {
        Ok(d) => d.format("%b %-d, %Y").to_string(),
        Err(_) => raw.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Filter
// ---------------------------------------------------------------------------

/// Pure client-side grid filter: exact category match (or "all") combined
/// with a case-insensitive substring search over title, description, and
/// ticker.
#[derive(Debug, Clone)]
pub struct MarketFilter {
    pub category: String,
    pub search: String,
}

impl Default for MarketFilter {
    fn default() -> Self {
        Self {
            category: "all".to_string(),
            search: String::new(),
        }
    }
}

impl MarketFilter {
    pub fn matches(&self, card: &MarketCard) -> bool {
        let category_ok = self.category == "all" || card.category == self.category;

        let search_ok = if self.search.is_empty() {
            true
        } else {
            let needle = self.search.to_lowercase();
            card.title.to_lowercase().contains(&needle)
                || card.description.to_lowercase().contains(&needle)
                || card.ticker.to_lowercase().contains(&needle)
        };

        category_ok && search_ok
    }

    /// Apply the filter, preserving input order.
    pub fn apply<'a>(&self, cards: &'a [MarketCard]) -> Vec<&'a MarketCard> {
        cards.iter().filter(|c| self.matches(c)).collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
