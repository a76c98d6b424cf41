//! Market creation form handling.
//!
//! Validates user input entirely client-side and assembles the
//! `CreateMarketRequest` body. Validation failures are field-specific and
//! happen before any network request is issued.

use thiserror::Error;

use crate::types::CreateMarketRequest;

/// Time-of-day appended when a deadline date is given without a time.
const END_OF_DAY: &str = "23:59:59";

/// Client-side validation failure, tied to a single form field.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormError {
    #[error("{field} is required")]
    MissingField { field: &'static str },
}

/// Raw market-creation form input, exactly as the user typed it.
/// Empty strings mean "not filled in".
#[derive(Debug, Clone, Default)]
pub struct MarketForm {
    pub ticker: String,
    pub query: String,
    pub description: String,
    pub category: String,
    /// `YYYY-MM-DD`, or empty for no deadline.
    pub end_date: String,
    /// `HH:MM`, or empty for end-of-day.
    pub end_time: String,
    pub check_interval_minutes: Option<u32>,
    pub external_market_url: String,
}

impl MarketForm {
    /// Validate the form and build the request body.
    ///
    /// Never issues a request itself — callers submit the returned body via
    /// `ApiClient::create_market` only after this succeeds.
    pub fn into_request(self) -> Result<CreateMarketRequest, FormError> {
        let ticker = self.ticker.trim();
        if ticker.is_empty() {
            return Err(FormError::MissingField { field: "ticker" });
        }

        let query = self.query.trim();
        if query.is_empty() {
            return Err(FormError::MissingField { field: "query" });
        }

        let non_empty = |s: &str| {
            let t = s.trim();
            (!t.is_empty()).then(|| t.to_string())
        };

        Ok(CreateMarketRequest {
            ticker: ticker.to_string(),
            query: query.to_string(),
            description: non_empty(&self.description),
            category: non_empty(&self.category),
            deadline: build_deadline(&self.end_date, &self.end_time),
            check_interval_minutes: self.check_interval_minutes,
            external_market_url: non_empty(&self.external_market_url),
        })
    }
}

/// Combine a date and optional time-of-day into a deadline string.
///
/// No date means no deadline; a date without a time gets the end-of-day
/// default so a "due March 1st" market stays open through March 1st.
pub fn build_deadline(end_date: &str, end_time: &str) -> Option<String> {
    let date = end_date.trim();
    if date.is_empty() {
        return None;
    }

    let time = end_time.trim();
    if time.is_empty() {
        Some(format!("{date}T{END_OF_DAY}"))
    } else {
        Some(format!("{date}T{time}"))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
