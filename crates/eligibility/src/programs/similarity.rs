//! Pure scoring primitives shared by every state handler.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::currency::RateTable;
use super::domain::Money;

/// Comparison used by [`percentage_similarity`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparison {
    #[serde(rename = ">=")]
    AtLeast,
    #[serde(rename = "<=")]
    AtMost,
    #[serde(rename = "==")]
    Equal,
}

/// Strict date comparison used by [`date_similarity`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DateComparison {
    #[serde(rename = ">")]
    After,
    #[serde(rename = "<")]
    Before,
}

pub fn boolean_similarity(condition: bool) -> f64 {
    if condition {
        1.0
    } else {
        0.0
    }
}

/// Graded numeric comparison.
///
/// `Equal` returns the relative distance `|actual - expected| / expected`, where 0 is an exact
/// match and the value is unbounded. A zero `expected` is not special-cased.
pub fn percentage_similarity(expected: f64, actual: f64, op: Comparison) -> f64 {
    match op {
        Comparison::AtLeast => {
            if actual >= expected {
                1.0
            } else {
                actual / expected
            }
        }
        Comparison::AtMost => {
            if actual <= expected {
                1.0
            } else {
                expected / actual
            }
        }
        Comparison::Equal => (actual - expected).abs() / expected,
    }
}

/// Compare two amounts after converting both to the table's base currency.
///
/// Unsupported currencies score 0 instead of failing, unlike [`RateTable::convert`].
pub fn monetary_similarity(expected: &Money, actual: &Money, rates: &RateTable) -> f64 {
    let base = rates.base_currency();
    let converted = rates
        .convert(expected.amount, &expected.currency, base)
        .and_then(|expected| {
            rates
                .convert(actual.amount, &actual.currency, base)
                .map(|actual| (expected, actual))
        });

    match converted {
        Ok((expected, actual)) => percentage_similarity(expected, actual, Comparison::AtLeast),
        Err(err) => {
            warn!(error = %err, "monetary comparison degraded to zero similarity");
            0.0
        }
    }
}

/// Binary date comparison; both operators are exclusive.
pub fn date_similarity(expected: NaiveDate, actual: NaiveDate, op: DateComparison) -> f64 {
    match op {
        DateComparison::After => boolean_similarity(actual > expected),
        DateComparison::Before => boolean_similarity(actual < expected),
    }
}

/// Case-insensitive intersection test between an expected and an observed set of codes.
pub fn set_intersects(expected: &[String], actual: &[String]) -> bool {
    actual
        .iter()
        .any(|value| expected.iter().any(|code| code.eq_ignore_ascii_case(value)))
}

/// Keep a score inside `[0, 1]`; NaN (from a zero divisor) counts as no match.
pub fn clamp_similarity(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::programs::currency::ExchangeRate;
    use chrono::{TimeZone, Utc};

    fn rates() -> RateTable {
        let created_at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        RateTable::from_rates(&[
            ExchangeRate {
                currency_code: "EUR".to_string(),
                rate_to_usd: 0.85,
                created_at,
            },
            ExchangeRate {
                currency_code: "AUD".to_string(),
                rate_to_usd: 1.5,
                created_at,
            },
        ])
    }

    #[test]
    fn percentage_similarity_grades_shortfalls() {
        assert_eq!(percentage_similarity(50.0, 75.0, Comparison::AtLeast), 1.0);
        assert_eq!(percentage_similarity(100.0, 50.0, Comparison::AtLeast), 0.5);
        assert_eq!(percentage_similarity(40.0, 50.0, Comparison::AtMost), 0.8);
        assert_eq!(percentage_similarity(40.0, 30.0, Comparison::AtMost), 1.0);
    }

    #[test]
    fn equality_is_an_unbounded_distance() {
        assert_eq!(percentage_similarity(100.0, 100.0, Comparison::Equal), 0.0);
        assert_eq!(percentage_similarity(100.0, 350.0, Comparison::Equal), 2.5);
        assert!(percentage_similarity(0.0, 5.0, Comparison::Equal).is_infinite());
    }

    #[test]
    fn monetary_similarity_normalizes_currencies() {
        let rates = rates();
        let expected = Money::new(1000.0, "USD");
        let actual = Money::new(750.0, "AUD");
        assert_eq!(monetary_similarity(&expected, &actual, &rates), 0.5);

        let enough = Money::new(900.0, "EUR");
        assert_eq!(monetary_similarity(&expected, &enough, &rates), 1.0);
    }

    #[test]
    fn monetary_similarity_degrades_on_unknown_currency() {
        let rates = rates();
        let expected = Money::new(1000.0, "USD");
        let actual = Money::new(1_000_000.0, "XYZ");
        assert_eq!(monetary_similarity(&expected, &actual, &rates), 0.0);
    }

    #[test]
    fn date_similarity_is_strict() {
        let day = NaiveDate::from_ymd_opt(2022, 5, 1).unwrap();
        let later = NaiveDate::from_ymd_opt(2022, 5, 2).unwrap();
        assert_eq!(date_similarity(day, later, DateComparison::After), 1.0);
        assert_eq!(date_similarity(day, day, DateComparison::After), 0.0);
        assert_eq!(date_similarity(day, day, DateComparison::Before), 0.0);
        assert_eq!(date_similarity(later, day, DateComparison::Before), 1.0);
    }

    #[test]
    fn clamp_maps_nan_to_zero() {
        assert_eq!(clamp_similarity(f64::NAN), 0.0);
        assert_eq!(clamp_similarity(1.7), 1.0);
        assert_eq!(clamp_similarity(-0.3), 0.0);
    }
}
