//! Filter application and the collection-level operations shared by per-entity modules.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::conditions::CountConstraint;
use crate::error::EngineError;
use crate::programs::context::Context;
use crate::programs::domain::StateInput;
use crate::programs::similarity::{boolean_similarity, clamp_similarity, mean, round2};

/// Records addressable by an opaque identifier.
pub(crate) trait Record {
    fn id(&self) -> &str;
}

/// A named set of per-record filters.
pub(crate) trait RecordFilters<R> {
    fn is_empty(&self) -> bool;

    fn score(
        &self,
        context: &Context,
        input: &StateInput,
        record: &R,
        scores: &mut FilterScores,
    ) -> Result<(), EngineError>;
}

/// An aggregation computed over the records selected by a `matches` state.
pub(crate) trait Aggregation<R> {
    fn aggregate(&self, context: &Context, records: &[&R])
        -> Result<AggregationOutput, EngineError>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterOutput {
    pub expected: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual: Option<Value>,
    pub similarity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordOutput {
    pub id: String,
    pub filters: BTreeMap<String, FilterOutput>,
    pub similarity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregationOutput {
    #[serde(flatten)]
    pub aggregation: Value,
    pub actual: Value,
    pub records: Vec<String>,
    pub similarity: f64,
}

impl AggregationOutput {
    pub(crate) fn new<A, V, R>(aggregation: &A, actual: V, records: &[&R], similarity: f64) -> Self
    where
        A: Serialize,
        V: Serialize,
        R: Record,
    {
        Self {
            aggregation: json!(aggregation),
            actual: json!(actual),
            records: records.iter().map(|record| record.id().to_string()).collect(),
            similarity: clamp_similarity(similarity),
        }
    }
}

/// Accumulates filter outcomes for one record.
pub(crate) struct FilterScores {
    missing: f64,
    outputs: BTreeMap<String, FilterOutput>,
}

impl FilterScores {
    pub(crate) fn new(missing: f64) -> Self {
        Self {
            missing,
            outputs: BTreeMap::new(),
        }
    }

    /// Record a filter outcome; an absent attribute scores the module's missing default.
    pub(crate) fn observe<E, A>(
        &mut self,
        name: &str,
        expected: &E,
        actual: Option<A>,
        score: impl FnOnce(&A) -> f64,
    ) where
        E: Serialize + ?Sized,
        A: Serialize,
    {
        let output = match actual {
            Some(actual) => FilterOutput {
                expected: json!(expected),
                similarity: clamp_similarity(score(&actual)),
                actual: Some(json!(actual)),
            },
            None => FilterOutput {
                expected: json!(expected),
                actual: None,
                similarity: self.missing,
            },
        };
        self.outputs.insert(name.to_string(), output);
    }

    fn finish(self) -> (BTreeMap<String, FilterOutput>, Option<f64>) {
        let similarities: Vec<f64> = self
            .outputs
            .values()
            .map(|output| output.similarity)
            .collect();
        let similarity = mean(&similarities).map(round2);
        (self.outputs, similarity)
    }
}

/// Score every record against `filters`.
pub(crate) fn apply_filters<R, F>(
    kind: &'static str,
    context: &Context,
    input: &StateInput,
    filters: &F,
    records: &[R],
    missing: f64,
) -> Result<Vec<RecordOutput>, EngineError>
where
    R: Record,
    F: RecordFilters<R>,
{
    if filters.is_empty() {
        return Err(EngineError::EmptyFilterSet { kind });
    }

    records
        .iter()
        .map(|record| {
            let mut scores = FilterScores::new(missing);
            filters.score(context, input, record, &mut scores)?;
            let (filters, similarity) = scores.finish();
            let similarity = similarity.ok_or(EngineError::EmptyFilterSet { kind })?;
            Ok(RecordOutput {
                id: record.id().to_string(),
                filters,
                similarity,
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "F: Deserialize<'de>, A: Deserialize<'de>"))]
pub struct MatchesExpectation<F, A> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<F>,
    #[serde(default)]
    pub aggregations: Vec<A>,
}

/// Collection-level operation over one kind of record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op")]
pub enum CollectionState<F, A> {
    #[serde(rename = "contains")]
    Contains {
        expected: F,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        count: Option<CountConstraint>,
    },
    #[serde(rename = "not_contains")]
    NotContains { expected: F },
    #[serde(rename = "matches")]
    Matches { expected: MatchesExpectation<F, A> },
}

/// Observed side of a collection state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionActual {
    pub records: Vec<RecordOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub aggregations: Vec<AggregationOutput>,
}

/// Similarity constants of one per-entity module.
#[derive(Debug, Clone, Copy)]
pub(crate) struct CollectionDefaults {
    pub kind: &'static str,
    /// Score when the profile supplies no records at all.
    pub absent: f64,
    /// Score of a filter whose attribute is missing on a record.
    pub missing: f64,
}

impl<F, A> CollectionState<F, A> {
    fn validate<R>(&self, kind: &'static str) -> Result<(), EngineError>
    where
        F: RecordFilters<R>,
    {
        match self {
            CollectionState::Contains { expected, .. }
            | CollectionState::NotContains { expected } => {
                if expected.is_empty() {
                    return Err(EngineError::EmptyFilterSet { kind });
                }
            }
            CollectionState::Matches { expected } => {
                if expected.aggregations.is_empty() {
                    return Err(EngineError::EmptyAggregationSet { kind });
                }
                if expected.filters.as_ref().is_some_and(|filters| filters.is_empty()) {
                    return Err(EngineError::EmptyFilterSet { kind });
                }
            }
        }
        Ok(())
    }

    pub(crate) fn evaluate<R>(
        &self,
        context: &Context,
        input: &StateInput,
        records: Option<&[R]>,
        defaults: CollectionDefaults,
    ) -> Result<(Option<CollectionActual>, f64), EngineError>
    where
        R: Record,
        F: RecordFilters<R>,
        A: Aggregation<R>,
    {
        self.validate::<R>(defaults.kind)?;

        let records = match records {
            Some(records) if !records.is_empty() => records,
            _ => return Ok((None, defaults.absent)),
        };

        match self {
            CollectionState::Contains { expected, count } => {
                let outputs = apply_filters(
                    defaults.kind,
                    context,
                    input,
                    expected,
                    records,
                    defaults.missing,
                )?;
                let similarity = record_mean(&outputs);
                let satisfied = outputs.iter().filter(|output| output.similarity >= 1.0).count();
                let (count, similarity) = match count {
                    Some(constraint) => {
                        (Some(satisfied), boolean_similarity(constraint.accepts(satisfied)))
                    }
                    None => (None, similarity),
                };
                Ok((
                    Some(CollectionActual {
                        records: outputs,
                        count,
                        aggregations: Vec::new(),
                    }),
                    similarity,
                ))
            }
            CollectionState::NotContains { expected } => {
                let outputs = apply_filters(
                    defaults.kind,
                    context,
                    input,
                    expected,
                    records,
                    defaults.missing,
                )?;
                let similarity = round2(1.0 - record_mean(&outputs));
                Ok((
                    Some(CollectionActual {
                        records: outputs,
                        count: None,
                        aggregations: Vec::new(),
                    }),
                    similarity,
                ))
            }
            CollectionState::Matches { expected } => {
                let (outputs, selected): (Vec<RecordOutput>, Vec<&R>) = match &expected.filters {
                    Some(filters) => {
                        let outputs = apply_filters(
                            defaults.kind,
                            context,
                            input,
                            filters,
                            records,
                            defaults.missing,
                        )?;
                        let selected = records
                            .iter()
                            .zip(&outputs)
                            .filter(|(_, output)| output.similarity >= 1.0)
                            .map(|(record, _)| record)
                            .collect();
                        (outputs, selected)
                    }
                    None => (Vec::new(), records.iter().collect()),
                };

                let aggregations = expected
                    .aggregations
                    .iter()
                    .map(|aggregation| aggregation.aggregate(context, &selected))
                    .collect::<Result<Vec<_>, _>>()?;
                let similarities: Vec<f64> = aggregations
                    .iter()
                    .map(|aggregation| aggregation.similarity)
                    .collect();
                let similarity = mean(&similarities).map(round2).unwrap_or(0.0);

                Ok((
                    Some(CollectionActual {
                        records: outputs,
                        count: None,
                        aggregations,
                    }),
                    similarity,
                ))
            }
        }
    }
}

fn record_mean(outputs: &[RecordOutput]) -> f64 {
    let similarities: Vec<f64> = outputs.iter().map(|output| output.similarity).collect();
    mean(&similarities).map(round2).unwrap_or(0.0)
}
