//! Aggregation algorithms reused across per-entity modules.

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use super::collection::{AggregationOutput, Record};
use super::conditions::{DurationSpec, DurationUnit};
use crate::error::EngineError;
use crate::programs::context::Context;
use crate::programs::domain::Money;
use crate::programs::similarity::{percentage_similarity, round2, Comparison};

const AVERAGE_DAYS_PER_MONTH: f64 = 30.436875;

/// Half-open `[start, end)` date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Interval {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Sort by start and collapse overlapping or touching intervals.
pub fn merge_intervals(mut intervals: Vec<Interval>) -> Vec<Interval> {
    intervals.sort_by_key(|interval| interval.start);

    let mut merged: Vec<Interval> = Vec::with_capacity(intervals.len());
    for interval in intervals {
        match merged.last_mut() {
            Some(current) if interval.start <= current.end => {
                if interval.end > current.end {
                    current.end = interval.end;
                }
            }
            _ => merged.push(interval),
        }
    }
    merged
}

/// Calendar months between two dates, with the partial month as a fraction.
pub fn months_between(start: NaiveDate, end: NaiveDate) -> f64 {
    if end <= start {
        return 0.0;
    }

    let mut months = (end.year() - start.year()) * 12 + end.month() as i32 - start.month() as i32;
    if end.day() < start.day() {
        months -= 1;
    }
    let months = months.max(0) as u32;
    let anchor = start
        .checked_add_months(Months::new(months))
        .unwrap_or(start);
    let remainder = (end - anchor).num_days().max(0) as f64;

    f64::from(months) + remainder / AVERAGE_DAYS_PER_MONTH
}

pub fn interval_length(interval: &Interval, unit: DurationUnit) -> f64 {
    match unit {
        DurationUnit::Days => (interval.end - interval.start).num_days().max(0) as f64,
        DurationUnit::Months => months_between(interval.start, interval.end),
        DurationUnit::Years => months_between(interval.start, interval.end) / 12.0,
    }
}

/// Total covered time across possibly overlapping date ranges.
///
/// Ranges without a start are dropped; a missing end means the range is still open at `now`.
pub fn merged_duration<I>(ranges: I, now: NaiveDate, unit: DurationUnit) -> f64
where
    I: IntoIterator<Item = (Option<NaiveDate>, Option<NaiveDate>)>,
{
    let intervals = ranges
        .into_iter()
        .filter_map(|(start, end)| {
            let start = start?;
            let end = end.unwrap_or(now).max(start);
            Some(Interval { start, end })
        })
        .collect();

    let total: f64 = merge_intervals(intervals)
        .iter()
        .map(|interval| interval_length(interval, unit))
        .sum();
    round2(total)
}

/// Convert and add amounts in `currency`. Unsupported currencies are fatal.
pub fn sum_money<I>(context: &Context, amounts: I, currency: &str) -> Result<Money, EngineError>
where
    I: IntoIterator<Item = Money>,
{
    let mut total = 0.0;
    for amount in amounts {
        total += context
            .rates()
            .convert(amount.amount, &amount.currency, currency)?;
    }
    Ok(Money::new(round2(total), currency))
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CountExpectation {
    pub value: f64,
}

/// Duration-sum aggregation over records carrying a date range.
pub(crate) fn duration_aggregation<R, S>(
    context: &Context,
    aggregation: &S,
    expected: &DurationSpec,
    records: &[&R],
    range: impl Fn(&R) -> (Option<NaiveDate>, Option<NaiveDate>),
) -> AggregationOutput
where
    R: Record,
    S: Serialize,
{
    let total = merged_duration(
        records.iter().map(|record| range(*record)),
        context.now(),
        expected.unit,
    );
    let similarity = percentage_similarity(expected.value, total, Comparison::AtLeast);
    AggregationOutput::new(
        aggregation,
        DurationSpec {
            value: total,
            unit: expected.unit,
        },
        records,
        similarity,
    )
}

pub(crate) fn count_aggregation<R, S>(
    aggregation: &S,
    expected: &CountExpectation,
    records: &[&R],
) -> AggregationOutput
where
    R: Record,
    S: Serialize,
{
    let count = records.len();
    let similarity = percentage_similarity(expected.value, count as f64, Comparison::AtLeast);
    AggregationOutput::new(aggregation, count, records, similarity)
}
