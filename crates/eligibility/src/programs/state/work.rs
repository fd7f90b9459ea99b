use serde::{Deserialize, Serialize};

use super::aggregation::{count_aggregation, duration_aggregation, sum_money, CountExpectation};
use super::collection::{
    Aggregation, AggregationOutput, CollectionActual, CollectionDefaults, CollectionState,
    FilterScores, Record, RecordFilters,
};
use super::conditions::{
    DateCondition, DurationSpec, MembershipCondition, NumericCondition, RankingCondition,
};
use super::LeafOutput;
use crate::error::EngineError;
use crate::programs::context::{Context, EmployerRanking};
use crate::programs::domain::{Money, StateInput, WorkExperience};
use crate::programs::occupation::OccupationFilter;
use crate::programs::similarity::{boolean_similarity, monetary_similarity};

const DEFAULTS: CollectionDefaults = CollectionDefaults {
    kind: "work_experiences",
    absent: 0.2,
    missing: 0.2,
};

pub type WorkState = CollectionState<WorkFilters, WorkAggregation>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmployerRankingSystem {
    Fortune,
    Forbes,
}

impl EmployerRankingSystem {
    fn rank(self, employer: &EmployerRanking) -> Option<u32> {
        match self {
            EmployerRankingSystem::Fortune => employer.fortune,
            EmployerRankingSystem::Forbes => employer.forbes,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayPeriod {
    Monthly,
    Annual,
}

/// Minimum compensation for a pay period, e.g.
/// `{"amount": 5000, "currency": "EUR", "period": "monthly"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalaryCondition {
    #[serde(flatten)]
    pub expected: Money,
    pub period: PayPeriod,
}

/// Compensation of a record for `period`, deriving one period from the other when needed.
pub fn compensation(record: &WorkExperience, period: PayPeriod) -> Option<Money> {
    match period {
        PayPeriod::Monthly => record.monthly_salary.clone().or_else(|| {
            record
                .annual_salary
                .as_ref()
                .map(|annual| Money::new(annual.amount / 12.0, annual.currency.clone()))
        }),
        PayPeriod::Annual => record.annual_salary.clone().or_else(|| {
            record
                .monthly_salary
                .as_ref()
                .map(|monthly| Money::new(monthly.amount * 12.0, monthly.currency.clone()))
        }),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occupation: Option<OccupationFilter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<MembershipCondition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hours_per_week: Option<NumericCondition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employer_ranking: Option<RankingCondition<EmployerRankingSystem>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateCondition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub self_employed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salary: Option<SalaryCondition>,
}

impl Record for WorkExperience {
    fn id(&self) -> &str {
        &self.id
    }
}

impl RecordFilters<WorkExperience> for WorkFilters {
    fn is_empty(&self) -> bool {
        self.occupation.is_none()
            && self.country.is_none()
            && self.hours_per_week.is_none()
            && self.employer_ranking.is_none()
            && self.start_date.is_none()
            && self.self_employed.is_none()
            && self.salary.is_none()
    }

    fn score(
        &self,
        context: &Context,
        input: &StateInput,
        record: &WorkExperience,
        scores: &mut FilterScores,
    ) -> Result<(), EngineError> {
        if let Some(filter) = &self.occupation {
            let matched = record
                .occupation
                .as_ref()
                .map(|code| context.match_occupation(code, filter));
            scores.observe("occupation", filter, matched, |matched| {
                boolean_similarity(matched.is_match())
            });
        }
        if let Some(condition) = &self.country {
            scores.observe("country", condition, record.country.as_ref(), |country| {
                condition.score_one(country)
            });
        }
        if let Some(condition) = &self.hours_per_week {
            scores.observe("hours_per_week", condition, record.hours_per_week, |hours| {
                condition.score(*hours)
            });
        }
        if let Some(condition) = &self.employer_ranking {
            let rank = record
                .employer_id
                .as_deref()
                .and_then(|id| context.employer(id))
                .and_then(|employer| condition.system.rank(employer));
            scores.observe("employer_ranking", condition, rank, |rank| {
                condition.score(*rank)
            });
        }
        if let Some(condition) = &self.start_date {
            condition.observe("start_date", context, input, record.start_date, scores)?;
        }
        if let Some(expected) = self.self_employed {
            scores.observe("self_employed", &expected, record.self_employed, |actual| {
                boolean_similarity(*actual == expected)
            });
        }
        if let Some(condition) = &self.salary {
            let salary = compensation(record, condition.period);
            scores.observe("salary", condition, salary, |salary| {
                monetary_similarity(&condition.expected, salary, context.rates())
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WorkAggregation {
    /// Experience time with concurrent positions counted once.
    Duration { expected: DurationSpec },
    /// Combined compensation, optionally limited to positions started within a trailing window.
    Salary {
        expected: SalaryCondition,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        within: Option<DurationSpec>,
    },
    Count { expected: CountExpectation },
}

impl Aggregation<WorkExperience> for WorkAggregation {
    fn aggregate(
        &self,
        context: &Context,
        records: &[&WorkExperience],
    ) -> Result<AggregationOutput, EngineError> {
        match self {
            WorkAggregation::Duration { expected } => Ok(duration_aggregation(
                context,
                self,
                expected,
                records,
                |record| (record.start_date, record.end_date),
            )),
            WorkAggregation::Salary { expected, within } => {
                let window_start = within.map(|window| window.window_start(context.now()));
                let recent: Vec<&WorkExperience> = records
                    .iter()
                    .copied()
                    .filter(|record| match window_start {
                        Some(window_start) => record
                            .start_date
                            .is_some_and(|start| start >= window_start),
                        None => true,
                    })
                    .collect();

                let total = sum_money(
                    context,
                    recent
                        .iter()
                        .filter_map(|record| compensation(record, expected.period)),
                    &expected.expected.currency,
                )?;
                let similarity = monetary_similarity(&expected.expected, &total, context.rates());
                Ok(AggregationOutput::new(self, total, &recent, similarity))
            }
            WorkAggregation::Count { expected } => Ok(count_aggregation(self, expected, records)),
        }
    }
}

pub(crate) fn evaluate(
    context: &Context,
    state: &WorkState,
    input: &StateInput,
) -> Result<LeafOutput<WorkState, CollectionActual>, EngineError> {
    let (actual, similarity) =
        state.evaluate(context, input, input.work_experiences.as_deref(), DEFAULTS)?;

    Ok(LeafOutput {
        state: state.clone(),
        actual,
        similarity,
    })
}
