//! Operator/expected pairs shared by leaf states and record filters.

use chrono::{Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use super::collection::FilterScores;
use crate::error::EngineError;
use crate::programs::context::Context;
use crate::programs::domain::StateInput;
use crate::programs::reference::Reference;
use crate::programs::similarity::{
    boolean_similarity, clamp_similarity, date_similarity, percentage_similarity,
    set_intersects, Comparison, DateComparison,
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

/// Graded comparison over a single number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op")]
pub enum NumericCondition {
    #[serde(rename = ">=")]
    AtLeast { expected: f64 },
    #[serde(rename = "<=")]
    AtMost { expected: f64 },
    #[serde(rename = "==")]
    Equal { expected: f64 },
    #[serde(rename = "between")]
    Between { expected: Range },
}

impl NumericCondition {
    pub fn score(&self, actual: f64) -> f64 {
        let similarity = match self {
            NumericCondition::AtLeast { expected } => {
                percentage_similarity(*expected, actual, Comparison::AtLeast)
            }
            NumericCondition::AtMost { expected } => {
                percentage_similarity(*expected, actual, Comparison::AtMost)
            }
            NumericCondition::Equal { expected } => {
                1.0 - percentage_similarity(*expected, actual, Comparison::Equal)
            }
            NumericCondition::Between { expected } => {
                percentage_similarity(expected.min, actual, Comparison::AtLeast).min(
                    percentage_similarity(expected.max, actual, Comparison::AtMost),
                )
            }
        };
        clamp_similarity(similarity)
    }
}

/// Set membership over country or category codes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op")]
pub enum MembershipCondition {
    #[serde(rename = "in")]
    In { expected: Vec<String> },
    #[serde(rename = "not_in")]
    NotIn { expected: Vec<String> },
}

impl MembershipCondition {
    pub fn score(&self, actual: &[String]) -> f64 {
        match self {
            MembershipCondition::In { expected } => {
                boolean_similarity(set_intersects(expected, actual))
            }
            MembershipCondition::NotIn { expected } => {
                boolean_similarity(!set_intersects(expected, actual))
            }
        }
    }

    pub fn score_one(&self, actual: &str) -> f64 {
        self.score(&[actual.to_string()])
    }
}

/// Membership over a closed vocabulary such as relationships or funding kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op")]
pub enum ChoiceCondition<T> {
    #[serde(rename = "in")]
    In { expected: Vec<T> },
    #[serde(rename = "not_in")]
    NotIn { expected: Vec<T> },
}

impl<T: PartialEq> ChoiceCondition<T> {
    pub fn score(&self, actual: &T) -> f64 {
        match self {
            ChoiceCondition::In { expected } => boolean_similarity(expected.contains(actual)),
            ChoiceCondition::NotIn { expected } => boolean_similarity(!expected.contains(actual)),
        }
    }
}

/// A literal date or a reference resolved against the profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DateValue {
    Date(NaiveDate),
    Reference(Reference),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateCondition {
    pub op: DateComparison,
    pub expected: DateValue,
}

impl DateCondition {
    /// The comparison date, or `None` when a reference has nothing to point at.
    pub fn resolve(
        &self,
        context: &Context,
        input: &StateInput,
    ) -> Result<Option<NaiveDate>, EngineError> {
        match &self.expected {
            DateValue::Date(date) => Ok(Some(*date)),
            DateValue::Reference(reference) => context.resolve_date(reference, input),
        }
    }

    pub fn score(&self, expected: NaiveDate, actual: NaiveDate) -> f64 {
        date_similarity(expected, actual, self.op)
    }

    /// Score a record date as a named filter. An unresolved comparison date counts as missing.
    pub(crate) fn observe(
        &self,
        name: &str,
        context: &Context,
        input: &StateInput,
        actual: Option<NaiveDate>,
        scores: &mut FilterScores,
    ) -> Result<(), EngineError> {
        let compared_to = self.resolve(context, input)?;
        let observation = actual
            .zip(compared_to)
            .map(|(date, compared_to)| DateObservation { date, compared_to });
        scores.observe(name, self, observation, |observed| {
            self.score(observed.compared_to, observed.date)
        });
        Ok(())
    }
}

/// A record date next to the date it was compared against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateObservation {
    pub date: NaiveDate,
    pub compared_to: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DurationUnit {
    Years,
    Months,
    Days,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DurationSpec {
    pub value: f64,
    pub unit: DurationUnit,
}

impl DurationSpec {
    /// Start of the trailing window of this length ending at `now`.
    pub fn window_start(&self, now: NaiveDate) -> NaiveDate {
        let value = self.value.max(0.0);
        let start = match self.unit {
            DurationUnit::Years => {
                now.checked_sub_months(Months::new((value * 12.0).round() as u32))
            }
            DurationUnit::Months => now.checked_sub_months(Months::new(value.round() as u32)),
            DurationUnit::Days => now.checked_sub_days(Days::new(value.round() as u64)),
        };
        start.unwrap_or(NaiveDate::MIN)
    }
}

/// Bounds on how many records fully satisfy a filter set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountConstraint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<usize>,
}

impl CountConstraint {
    pub fn accepts(&self, count: usize) -> bool {
        self.min.map_or(true, |min| count >= min) && self.max.map_or(true, |max| count <= max)
    }
}

/// Rank threshold inside a named league table; lower ranks are better.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingCondition<S> {
    pub system: S,
    pub max_rank: u32,
}

impl<S> RankingCondition<S> {
    pub fn score(&self, rank: u32) -> f64 {
        clamp_similarity(percentage_similarity(
            f64::from(self.max_rank),
            f64::from(rank),
            Comparison::AtMost,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn between_grades_both_sides() {
        let condition = NumericCondition::Between {
            expected: Range {
                min: 20.0,
                max: 40.0,
            },
        };
        assert_eq!(condition.score(30.0), 1.0);
        assert_eq!(condition.score(10.0), 0.5);
        assert_eq!(condition.score(50.0), 0.8);
    }

    #[test]
    fn equality_scores_inverse_distance() {
        let condition = NumericCondition::Equal { expected: 100.0 };
        assert_eq!(condition.score(100.0), 1.0);
        assert_eq!(condition.score(75.0), 0.75);
        assert_eq!(condition.score(400.0), 0.0);
    }

    #[test]
    fn membership_is_case_insensitive() {
        let condition = MembershipCondition::In {
            expected: vec!["AU".to_string(), "NZ".to_string()],
        };
        assert_eq!(condition.score_one("nz"), 1.0);
        assert_eq!(condition.score_one("GB"), 0.0);

        let excluded = MembershipCondition::NotIn {
            expected: vec!["IR".to_string()],
        };
        assert_eq!(excluded.score(&["FR".to_string(), "DE".to_string()]), 1.0);
        assert_eq!(excluded.score(&["FR".to_string(), "IR".to_string()]), 0.0);
    }

    #[test]
    fn count_bounds_are_inclusive() {
        let constraint = CountConstraint {
            min: Some(1),
            max: Some(2),
        };
        assert!(!constraint.accepts(0));
        assert!(constraint.accepts(1));
        assert!(constraint.accepts(2));
        assert!(!constraint.accepts(3));
    }

    #[test]
    fn date_values_accept_literals_and_references() {
        let literal: DateValue = serde_json::from_str(r#""2020-02-01""#).unwrap();
        assert_eq!(
            literal,
            DateValue::Date(NaiveDate::from_ymd_opt(2020, 2, 1).unwrap())
        );

        let reference: DateValue =
            serde_json::from_str(r#""graduation_date.bachelor_or_higher""#).unwrap();
        assert!(matches!(reference, DateValue::Reference(_)));
    }

    #[test]
    fn window_start_subtracts_calendar_units() {
        let now = NaiveDate::from_ymd_opt(2024, 5, 31).unwrap();
        let window = DurationSpec {
            value: 1.0,
            unit: DurationUnit::Years,
        };
        assert_eq!(
            window.window_start(now),
            NaiveDate::from_ymd_opt(2023, 5, 31).unwrap()
        );
    }
}
