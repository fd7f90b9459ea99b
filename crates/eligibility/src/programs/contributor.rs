//! Point contributors gated on a state's similarity.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::context::Context;
use super::domain::{StateInput, StateInputOverrides};
use super::state::{self, State, StateOutput};
use crate::error::EngineError;

const DEFAULT_THRESHOLD: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArithmeticOp {
    #[serde(rename = "+")]
    Add,
    #[serde(rename = "-")]
    Subtract,
    #[serde(rename = "*")]
    Multiply,
    #[serde(rename = "/")]
    Divide,
}

impl ArithmeticOp {
    pub fn apply(self, current: f64, value: f64) -> f64 {
        match self {
            ArithmeticOp::Add => current + value,
            ArithmeticOp::Subtract => current - value,
            ArithmeticOp::Multiply => current * value,
            ArithmeticOp::Divide => current / value,
        }
    }
}

/// Adjusts the running point total when `expected_state` is satisfied well enough.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointsContributor {
    pub op: ArithmeticOp,
    pub value: f64,
    pub expected_state: State,
    /// Minimum similarity, inclusive; `1` when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_state_similarity: Option<f64>,
}

impl PointsContributor {
    pub fn threshold(&self) -> f64 {
        self.expected_state_similarity.unwrap_or(DEFAULT_THRESHOLD)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Contributor {
    Points(PointsContributor),
    /// Applies the first child that qualifies; later children are still evaluated.
    Or { contributors: Vec<PointsContributor> },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointsContributorOutput {
    pub op: ArithmeticOp,
    pub value: f64,
    pub expected_state: StateOutput,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_state_similarity: Option<f64>,
    pub is_applied: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContributorOutput {
    Points(PointsContributorOutput),
    Or {
        contributors: Vec<PointsContributorOutput>,
        is_applied: bool,
    },
}

impl ContributorOutput {
    pub fn is_applied(&self) -> bool {
        match self {
            ContributorOutput::Points(output) => output.is_applied,
            ContributorOutput::Or { is_applied, .. } => *is_applied,
        }
    }
}

/// Evaluate a contributor and apply it to `overrides` when its gate holds.
///
/// Gating states see the profile merged with the overrides written so far.
pub fn contribute(
    context: &Context,
    contributor: &Contributor,
    input: &StateInput,
    overrides: &mut StateInputOverrides,
) -> Result<ContributorOutput, EngineError> {
    match contributor {
        Contributor::Points(points) => {
            let output = gate(context, points, input, overrides)?;
            if output.is_applied {
                apply(points, overrides);
            }
            Ok(ContributorOutput::Points(output))
        }
        Contributor::Or { contributors } => {
            let mut outputs = Vec::with_capacity(contributors.len());
            let mut applied = false;
            for child in contributors {
                let mut output = gate(context, child, input, overrides)?;
                if output.is_applied && !applied {
                    apply(child, overrides);
                    applied = true;
                } else {
                    output.is_applied = false;
                }
                outputs.push(output);
            }
            Ok(ContributorOutput::Or {
                contributors: outputs,
                is_applied: applied,
            })
        }
    }
}

fn gate(
    context: &Context,
    contributor: &PointsContributor,
    input: &StateInput,
    overrides: &StateInputOverrides,
) -> Result<PointsContributorOutput, EngineError> {
    let effective = input.with_overrides(overrides);
    let expected_state = state::evaluate(context, &contributor.expected_state, &effective)?;
    let is_applied = expected_state.similarity() >= contributor.threshold();

    Ok(PointsContributorOutput {
        op: contributor.op,
        value: contributor.value,
        expected_state,
        expected_state_similarity: contributor.expected_state_similarity,
        is_applied,
    })
}

fn apply(contributor: &PointsContributor, overrides: &mut StateInputOverrides) {
    let current = overrides.points.unwrap_or(0.0);
    let points = contributor.op.apply(current, contributor.value);
    debug!(
        op = ?contributor.op,
        value = contributor.value,
        before = current,
        after = points,
        "contributor applied"
    );
    overrides.points = Some(points);
}
