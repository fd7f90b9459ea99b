//! State tree evaluation.
//!
//! A [`State`] is either an `and`/`or` combinator or a leaf predicate over one profile fact.
//! Evaluating it produces a [`StateOutput`] that echoes the node, attaches the observed value,
//! and carries a similarity in `[0, 1]`.

pub mod aggregation;
pub mod collection;
pub mod conditions;
pub mod country;
pub mod education;
pub mod family;
pub mod funding;
pub mod personal;
pub mod work;

use serde::{Deserialize, Serialize};

use self::collection::CollectionActual;
use self::conditions::{MembershipCondition, NumericCondition};
use self::country::{AustraliaState, IsraelState};
use self::education::EducationState;
use self::family::FamilyState;
use self::funding::FundingState;
use self::work::WorkState;
use super::context::Context;
use super::domain::StateInput;
use super::similarity::clamp_similarity;
use crate::error::EngineError;

pub use self::collection::RecordOutput;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum State {
    And { states: Vec<State> },
    Or { states: Vec<State> },
    Age(NumericCondition),
    Citizenship(MembershipCondition),
    CountryOfBirth(MembershipCondition),
    PermanentResidency(MembershipCondition),
    Funding(FundingState),
    Points(NumericCondition),
    EducationExperiences(EducationState),
    WorkExperiences(WorkState),
    FamilyMembers(FamilyState),
    Australia(AustraliaState),
    Israel(IsraelState),
}

impl State {
    /// Wire name of the node's `kind` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            State::And { .. } => "and",
            State::Or { .. } => "or",
            State::Age(_) => "age",
            State::Citizenship(_) => "citizenship",
            State::CountryOfBirth(_) => "country_of_birth",
            State::PermanentResidency(_) => "permanent_residency",
            State::Funding(_) => "funding",
            State::Points(_) => "points",
            State::EducationExperiences(_) => "education_experiences",
            State::WorkExperiences(_) => "work_experiences",
            State::FamilyMembers(_) => "family_members",
            State::Australia(_) => "australia",
            State::Israel(_) => "israel",
        }
    }

    /// Number of leaves under this node.
    pub fn leaf_count(&self) -> usize {
        match self {
            State::And { states } | State::Or { states } => {
                states.iter().map(State::leaf_count).sum()
            }
            _ => 1,
        }
    }
}

/// Evaluated leaf: the authored node, what was observed, and how well it matched.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeafOutput<S, A> {
    #[serde(flatten)]
    pub state: S,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual: Option<A>,
    pub similarity: f64,
}

impl<S: Clone, A> LeafOutput<S, A> {
    /// Score an optional fact; absence yields `absent` rather than a pass or a failure.
    pub(crate) fn observe(
        state: &S,
        actual: Option<A>,
        absent: f64,
        score: impl FnOnce(&A) -> f64,
    ) -> Self {
        let similarity = match &actual {
            Some(actual) => clamp_similarity(score(actual)),
            None => absent,
        };
        Self {
            state: state.clone(),
            actual,
            similarity,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StateOutput {
    And {
        states: Vec<StateOutput>,
        similarity: f64,
    },
    Or {
        states: Vec<StateOutput>,
        similarity: f64,
    },
    Age(LeafOutput<NumericCondition, u32>),
    Citizenship(LeafOutput<MembershipCondition, Vec<String>>),
    CountryOfBirth(LeafOutput<MembershipCondition, String>),
    PermanentResidency(LeafOutput<MembershipCondition, Vec<String>>),
    Funding(LeafOutput<FundingState, CollectionActual>),
    Points(LeafOutput<NumericCondition, f64>),
    EducationExperiences(LeafOutput<EducationState, CollectionActual>),
    WorkExperiences(LeafOutput<WorkState, CollectionActual>),
    FamilyMembers(LeafOutput<FamilyState, CollectionActual>),
    Australia(LeafOutput<AustraliaState, RecordOutput>),
    Israel(LeafOutput<IsraelState, RecordOutput>),
}

impl StateOutput {
    pub fn similarity(&self) -> f64 {
        match self {
            StateOutput::And { similarity, .. } | StateOutput::Or { similarity, .. } => *similarity,
            StateOutput::Age(output) => output.similarity,
            StateOutput::Citizenship(output) => output.similarity,
            StateOutput::CountryOfBirth(output) => output.similarity,
            StateOutput::PermanentResidency(output) => output.similarity,
            StateOutput::Funding(output) => output.similarity,
            StateOutput::Points(output) => output.similarity,
            StateOutput::EducationExperiences(output) => output.similarity,
            StateOutput::WorkExperiences(output) => output.similarity,
            StateOutput::FamilyMembers(output) => output.similarity,
            StateOutput::Australia(output) => output.similarity,
            StateOutput::Israel(output) => output.similarity,
        }
    }
}

/// Evaluate a state tree. Every child of a combinator is evaluated so the output reports it.
pub fn evaluate(
    context: &Context,
    state: &State,
    input: &StateInput,
) -> Result<StateOutput, EngineError> {
    let output = match state {
        State::And { states } => {
            let states = evaluate_all(context, states, input)?;
            let similarity = combine(&states, f64::min);
            StateOutput::And { states, similarity }
        }
        State::Or { states } => {
            let states = evaluate_all(context, states, input)?;
            let similarity = combine(&states, f64::max);
            StateOutput::Or { states, similarity }
        }
        State::Age(condition) => StateOutput::Age(personal::age(condition, input)),
        State::Citizenship(condition) => {
            StateOutput::Citizenship(personal::citizenship(condition, input))
        }
        State::CountryOfBirth(condition) => {
            StateOutput::CountryOfBirth(personal::country_of_birth(condition, input))
        }
        State::PermanentResidency(condition) => {
            StateOutput::PermanentResidency(personal::permanent_residency(condition, input))
        }
        State::Points(condition) => StateOutput::Points(personal::points(condition, input)),
        State::Funding(state) => StateOutput::Funding(funding::evaluate(context, state, input)?),
        State::EducationExperiences(state) => {
            StateOutput::EducationExperiences(education::evaluate(context, state, input)?)
        }
        State::WorkExperiences(state) => {
            StateOutput::WorkExperiences(work::evaluate(context, state, input)?)
        }
        State::FamilyMembers(state) => {
            StateOutput::FamilyMembers(family::evaluate(context, state, input)?)
        }
        State::Australia(state) => {
            StateOutput::Australia(country::evaluate_australia(context, state, input)?)
        }
        State::Israel(state) => {
            StateOutput::Israel(country::evaluate_israel(context, state, input)?)
        }
    };

    Ok(output)
}

fn evaluate_all(
    context: &Context,
    states: &[State],
    input: &StateInput,
) -> Result<Vec<StateOutput>, EngineError> {
    states
        .iter()
        .map(|state| evaluate(context, state, input))
        .collect()
}

/// Fold child similarities; no children never counts as satisfied.
fn combine(states: &[StateOutput], pick: fn(f64, f64) -> f64) -> f64 {
    states
        .iter()
        .map(StateOutput::similarity)
        .reduce(pick)
        .unwrap_or(0.0)
}
