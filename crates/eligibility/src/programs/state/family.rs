use serde::{Deserialize, Serialize};

use super::aggregation::{count_aggregation, CountExpectation};
use super::collection::{
    Aggregation, AggregationOutput, CollectionActual, CollectionDefaults, CollectionState,
    FilterScores, Record, RecordFilters,
};
use super::conditions::{ChoiceCondition, MembershipCondition, NumericCondition};
use super::LeafOutput;
use crate::error::EngineError;
use crate::programs::context::Context;
use crate::programs::domain::{FamilyMember, Relationship, StateInput};

const DEFAULTS: CollectionDefaults = CollectionDefaults {
    kind: "family_members",
    absent: 0.1,
    missing: 0.3,
};

pub type FamilyState = CollectionState<FamilyFilters, FamilyAggregation>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FamilyFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship: Option<ChoiceCondition<Relationship>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<NumericCondition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citizenship: Option<MembershipCondition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permanent_residency: Option<MembershipCondition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country_of_residence: Option<MembershipCondition>,
}

impl Record for FamilyMember {
    fn id(&self) -> &str {
        &self.id
    }
}

impl RecordFilters<FamilyMember> for FamilyFilters {
    fn is_empty(&self) -> bool {
        self.relationship.is_none()
            && self.age.is_none()
            && self.citizenship.is_none()
            && self.permanent_residency.is_none()
            && self.country_of_residence.is_none()
    }

    fn score(
        &self,
        _context: &Context,
        _input: &StateInput,
        member: &FamilyMember,
        scores: &mut FilterScores,
    ) -> Result<(), EngineError> {
        if let Some(condition) = &self.relationship {
            scores.observe("relationship", condition, Some(member.relationship), |relationship| {
                condition.score(relationship)
            });
        }
        if let Some(condition) = &self.age {
            scores.observe("age", condition, member.age, |age| {
                condition.score(f64::from(*age))
            });
        }
        if let Some(condition) = &self.citizenship {
            scores.observe(
                "citizenship",
                condition,
                non_empty(member.citizenships.as_deref()),
                |countries| condition.score(countries),
            );
        }
        if let Some(condition) = &self.permanent_residency {
            scores.observe(
                "permanent_residency",
                condition,
                non_empty(member.permanent_residencies.as_deref()),
                |countries| condition.score(countries),
            );
        }
        if let Some(condition) = &self.country_of_residence {
            scores.observe(
                "country_of_residence",
                condition,
                member.country_of_residence.as_ref(),
                |country| condition.score_one(country),
            );
        }
        Ok(())
    }
}

fn non_empty(values: Option<&[String]>) -> Option<&[String]> {
    values.filter(|values| !values.is_empty())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FamilyAggregation {
    Count { expected: CountExpectation },
}

impl Aggregation<FamilyMember> for FamilyAggregation {
    fn aggregate(
        &self,
        _context: &Context,
        records: &[&FamilyMember],
    ) -> Result<AggregationOutput, EngineError> {
        match self {
            FamilyAggregation::Count { expected } => Ok(count_aggregation(self, expected, records)),
        }
    }
}

pub(crate) fn evaluate(
    context: &Context,
    state: &FamilyState,
    input: &StateInput,
) -> Result<LeafOutput<FamilyState, CollectionActual>, EngineError> {
    let (actual, similarity) =
        state.evaluate(context, input, input.family_members.as_deref(), DEFAULTS)?;

    Ok(LeafOutput {
        state: state.clone(),
        actual,
        similarity,
    })
}
