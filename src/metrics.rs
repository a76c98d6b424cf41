//! Derived divergence metrics.
//!
//! Pure, stateless functions over whatever snapshot is currently available —
//! recomputed on every read, never cached. The high-divergence threshold is
//! policy (overridden by config.toml at runtime), not a constant baked into
//! call sites.

use serde::Deserialize;

/// Absolute divergence between AI-estimated and market-implied probability,
/// in percentage points.
pub fn divergence(ai_score: f64, market_score: f64) -> f64 {
    (ai_score - market_score).abs()
}

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

/// Threshold policy for flagging a market as highly divergent.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct DivergencePolicy {
    /// Divergence must strictly exceed this to count as "high".
    pub threshold: f64,
}

impl Default for DivergencePolicy {
    fn default() -> Self {
        Self { threshold: 20.0 }
    }
}

impl DivergencePolicy {
    /// Whether the given score pair diverges beyond the threshold.
    pub fn is_high(&self, ai_score: f64, market_score: f64) -> bool {
        divergence(ai_score, market_score) > self.threshold
    }
}

// ---------------------------------------------------------------------------
// Score defaults
// ---------------------------------------------------------------------------

/// Explicit default resolution for markets the backend has not analysed yet.
///
/// A missing score renders as an even 50/50 rather than a hole in the UI.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ScoreDefaults {
    pub ai_score: f64,
    pub market_score: f64,
}

impl Default for ScoreDefaults {
    fn default() -> Self {
        Self {
            ai_score: 50.0,
            market_score: 50.0,
        }
    }
}

impl ScoreDefaults {
    pub fn resolve_ai(&self, score: Option<f64>) -> f64 {
        score.unwrap_or(self.ai_score)
    }

    pub fn resolve_market(&self, score: Option<f64>) -> f64 {
        score.unwrap_or(self.market_score)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
