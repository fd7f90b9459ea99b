use serde::{Deserialize, Serialize};

use super::aggregation::{count_aggregation, sum_money, CountExpectation};
use super::collection::{
    Aggregation, AggregationOutput, CollectionActual, CollectionDefaults, CollectionState,
    FilterScores, Record, RecordFilters,
};
use super::conditions::{ChoiceCondition, DurationSpec};
use super::LeafOutput;
use crate::error::EngineError;
use crate::programs::context::Context;
use crate::programs::domain::{Funding, FundingKind, Money, StateInput};
use crate::programs::similarity::monetary_similarity;

const DEFAULTS: CollectionDefaults = CollectionDefaults {
    kind: "funding",
    absent: 0.2,
    missing: 0.2,
};

pub type FundingState = CollectionState<FundingFilters, FundingAggregation>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FundingFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ChoiceCondition<FundingKind>>,
    /// Minimum amount of a single source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<Money>,
}

impl Record for Funding {
    fn id(&self) -> &str {
        &self.id
    }
}

impl RecordFilters<Funding> for FundingFilters {
    fn is_empty(&self) -> bool {
        self.kind.is_none() && self.amount.is_none()
    }

    fn score(
        &self,
        context: &Context,
        _input: &StateInput,
        funding: &Funding,
        scores: &mut FilterScores,
    ) -> Result<(), EngineError> {
        if let Some(condition) = &self.kind {
            scores.observe("kind", condition, Some(funding.kind), |kind| condition.score(kind));
        }
        if let Some(expected) = &self.amount {
            scores.observe("amount", expected, funding.amount.as_ref(), |amount| {
                monetary_similarity(expected, amount, context.rates())
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FundingAggregation {
    /// Combined amount, optionally limited to sources available within a trailing window.
    Amount {
        expected: Money,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        within: Option<DurationSpec>,
    },
    Count { expected: CountExpectation },
}

impl Aggregation<Funding> for FundingAggregation {
    fn aggregate(
        &self,
        context: &Context,
        records: &[&Funding],
    ) -> Result<AggregationOutput, EngineError> {
        match self {
            FundingAggregation::Amount { expected, within } => {
                let window_start = within.map(|window| window.window_start(context.now()));
                let available: Vec<&Funding> = records
                    .iter()
                    .copied()
                    .filter(|funding| match window_start {
                        Some(window_start) => funding
                            .start_date
                            .is_some_and(|start| start >= window_start),
                        None => true,
                    })
                    .collect();

                let total = sum_money(
                    context,
                    available.iter().filter_map(|funding| funding.amount.clone()),
                    &expected.currency,
                )?;
                let similarity = monetary_similarity(expected, &total, context.rates());
                Ok(AggregationOutput::new(self, total, &available, similarity))
            }
            FundingAggregation::Count { expected } => {
                Ok(count_aggregation(self, expected, records))
            }
        }
    }
}

pub(crate) fn evaluate(
    context: &Context,
    state: &FundingState,
    input: &StateInput,
) -> Result<LeafOutput<FundingState, CollectionActual>, EngineError> {
    let (actual, similarity) = state.evaluate(context, input, input.funding.as_deref(), DEFAULTS)?;

    Ok(LeafOutput {
        state: state.clone(),
        actual,
        similarity,
    })
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};

    use super::*;
    use crate::programs::context::ContextInput;
    use crate::programs::currency::ExchangeRate;
    use crate::programs::state::collection::MatchesExpectation;

    fn context() -> Context {
        Context::new(&ContextInput {
            exchange_rates: vec![ExchangeRate {
                currency_code: "EUR".to_string(),
                rate_to_usd: 0.85,
                created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            }],
            now: NaiveDate::from_ymd_opt(2024, 6, 1),
            ..ContextInput::default()
        })
    }

    fn funding(id: &str, kind: FundingKind, amount: f64, currency: &str) -> Funding {
        Funding {
            id: id.to_string(),
            kind,
            amount: Some(Money::new(amount, currency)),
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1),
        }
    }

    #[test]
    fn total_savings_are_summed_across_currencies() {
        let state = FundingState::Matches {
            expected: MatchesExpectation {
                filters: Some(FundingFilters {
                    kind: Some(ChoiceCondition::In {
                        expected: vec![FundingKind::Savings],
                    }),
                    amount: None,
                }),
                aggregations: vec![FundingAggregation::Amount {
                    expected: Money::new(20_000.0, "USD"),
                    within: None,
                }],
            },
        };
        let input = StateInput {
            funding: Some(vec![
                funding("s1", FundingKind::Savings, 10_000.0, "USD"),
                funding("s2", FundingKind::Savings, 8_500.0, "EUR"),
                funding("l1", FundingKind::Loan, 50_000.0, "USD"),
            ]),
            ..StateInput::default()
        };

        let output = evaluate(&context(), &state, &input).expect("evaluates");
        let actual = output.actual.expect("records supplied");
        assert_eq!(actual.aggregations[0].records, vec!["s1", "s2"]);
        assert_eq!(actual.aggregations[0].actual["amount"], 20_000.0);
        assert_eq!(output.similarity, 1.0);
    }

    #[test]
    fn unknown_currency_in_a_sum_is_fatal() {
        let state = FundingState::Matches {
            expected: MatchesExpectation {
                filters: None,
                aggregations: vec![FundingAggregation::Amount {
                    expected: Money::new(1_000.0, "USD"),
                    within: None,
                }],
            },
        };
        let input = StateInput {
            funding: Some(vec![funding("s1", FundingKind::Savings, 500.0, "XYZ")]),
            ..StateInput::default()
        };

        let err = evaluate(&context(), &state, &input).unwrap_err();
        assert_eq!(err, EngineError::UnsupportedCurrency("XYZ".to_string()));
    }

    #[test]
    fn single_source_amount_is_graded() {
        let state = FundingState::Contains {
            expected: FundingFilters {
                kind: None,
                amount: Some(Money::new(10_000.0, "USD")),
            },
            count: None,
        };
        let input = StateInput {
            funding: Some(vec![funding("s1", FundingKind::Savings, 5_000.0, "USD")]),
            ..StateInput::default()
        };
        let output = evaluate(&context(), &state, &input).expect("evaluates");
        assert_eq!(output.similarity, 0.5);
    }
}
