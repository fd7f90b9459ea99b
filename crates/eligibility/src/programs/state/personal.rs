//! Scalar applicant facts: age, nationality, residency, and the running point total.

use super::conditions::{MembershipCondition, NumericCondition};
use super::LeafOutput;
use crate::programs::domain::StateInput;

const AGE_ABSENT_SIMILARITY: f64 = 0.2;
const CITIZENSHIP_ABSENT_SIMILARITY: f64 = 0.1;
const COUNTRY_OF_BIRTH_ABSENT_SIMILARITY: f64 = 0.1;
const PERMANENT_RESIDENCY_ABSENT_SIMILARITY: f64 = 0.1;
const POINTS_ABSENT_SIMILARITY: f64 = 0.1;

pub(crate) fn age(
    condition: &NumericCondition,
    input: &StateInput,
) -> LeafOutput<NumericCondition, u32> {
    LeafOutput::observe(condition, input.age, AGE_ABSENT_SIMILARITY, |age| {
        condition.score(f64::from(*age))
    })
}

pub(crate) fn points(
    condition: &NumericCondition,
    input: &StateInput,
) -> LeafOutput<NumericCondition, f64> {
    LeafOutput::observe(condition, input.points, POINTS_ABSENT_SIMILARITY, |points| {
        condition.score(*points)
    })
}

pub(crate) fn citizenship(
    condition: &MembershipCondition,
    input: &StateInput,
) -> LeafOutput<MembershipCondition, Vec<String>> {
    LeafOutput::observe(
        condition,
        non_empty(&input.citizenships),
        CITIZENSHIP_ABSENT_SIMILARITY,
        |countries| condition.score(countries),
    )
}

pub(crate) fn country_of_birth(
    condition: &MembershipCondition,
    input: &StateInput,
) -> LeafOutput<MembershipCondition, String> {
    LeafOutput::observe(
        condition,
        input.country_of_birth.clone(),
        COUNTRY_OF_BIRTH_ABSENT_SIMILARITY,
        |country| condition.score_one(country),
    )
}

pub(crate) fn permanent_residency(
    condition: &MembershipCondition,
    input: &StateInput,
) -> LeafOutput<MembershipCondition, Vec<String>> {
    LeafOutput::observe(
        condition,
        non_empty(&input.permanent_residencies),
        PERMANENT_RESIDENCY_ABSENT_SIMILARITY,
        |countries| condition.score(countries),
    )
}

fn non_empty(values: &Option<Vec<String>>) -> Option<Vec<String>> {
    values.as_ref().filter(|values| !values.is_empty()).cloned()
}
