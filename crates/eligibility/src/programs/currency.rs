use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::programs::similarity::round2;

/// Pivot currency every `rate_to_usd` is quoted against.
pub const BASE_CURRENCY: &str = "USD";

/// One row of the exchange rate feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRate {
    pub currency_code: String,
    pub rate_to_usd: f64,
    pub created_at: DateTime<Utc>,
}

/// Latest rate per currency, keyed by upper-cased ISO code.
#[derive(Debug, Clone, PartialEq)]
pub struct RateTable {
    rates: HashMap<String, f64>,
}

impl RateTable {
    /// Build the lookup table, keeping the newest row per currency. The base currency is
    /// implicitly `1.0` unless the feed lists it.
    pub fn from_rates(rows: &[ExchangeRate]) -> Self {
        let mut newest: HashMap<String, (DateTime<Utc>, f64)> = HashMap::new();
        for row in rows {
            let code = row.currency_code.trim().to_ascii_uppercase();
            match newest.get(&code) {
                Some((created_at, _)) if *created_at >= row.created_at => {}
                _ => {
                    newest.insert(code, (row.created_at, row.rate_to_usd));
                }
            }
        }

        let mut rates: HashMap<String, f64> = newest
            .into_iter()
            .map(|(code, (_, rate))| (code, rate))
            .collect();
        rates.entry(BASE_CURRENCY.to_string()).or_insert(1.0);

        Self { rates }
    }

    pub fn base_currency(&self) -> &'static str {
        BASE_CURRENCY
    }

    pub fn rate(&self, currency: &str) -> Option<f64> {
        self.rates.get(&currency.trim().to_ascii_uppercase()).copied()
    }

    /// Convert `amount` by pivoting through the base currency, rounded to cents.
    pub fn convert(&self, amount: f64, from: &str, to: &str) -> Result<f64, EngineError> {
        let from_rate = self
            .rate(from)
            .ok_or_else(|| EngineError::UnsupportedCurrency(from.to_string()))?;
        let to_rate = self
            .rate(to)
            .ok_or_else(|| EngineError::UnsupportedCurrency(to.to_string()))?;

        Ok(round2((amount / from_rate) * to_rate))
    }
}

impl Default for RateTable {
    fn default() -> Self {
        Self::from_rates(&[])
    }
}
