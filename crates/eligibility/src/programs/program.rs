//! Program runtime: ordered clauses over one profile, one override bag per run.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::context::{Context, ContextInput};
use super::contributor::{contribute, Contributor, ContributorOutput};
use super::domain::{StateInput, StateInputOverrides};
use super::similarity::clamp_similarity;
use super::state::{self, State, StateOutput};
use crate::error::EngineError;

const DEFAULT_WEIGHT: f64 = 1.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub id: String,
    /// Profile keys the program reads; reported when missing, never enforced.
    #[serde(default)]
    pub dependencies: Vec<String>,
    pub clauses: Vec<Clause>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Clause {
    Output(OutputClause),
    Eval(EvalClause),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputClause {
    pub state: State,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub decisive: bool,
}

impl OutputClause {
    pub fn weight(&self) -> f64 {
        self.weight.unwrap_or(DEFAULT_WEIGHT)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalClause {
    pub contributors: Vec<Contributor>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputClauseOutput {
    pub state: StateOutput,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(skip_serializing_if = "is_false")]
    pub decisive: bool,
    pub similarity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvalClauseOutput {
    pub contributors: Vec<ContributorOutput>,
    /// Override bag as left by this clause.
    pub state_input_overrides: StateInputOverrides,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClauseOutput {
    Output(OutputClauseOutput),
    Eval(EvalClauseOutput),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgramOutput {
    pub id: String,
    pub dependencies: Vec<String>,
    pub clauses: Vec<ClauseOutput>,
    pub similarity: f64,
    pub state_input_overrides: StateInputOverrides,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub missing_dependencies: Vec<String>,
}

/// Build a context from `context_input` and run `program` against `input`.
pub fn run(
    program: &Program,
    context_input: &ContextInput,
    input: &StateInput,
) -> Result<ProgramOutput, EngineError> {
    run_with_context(program, &Context::new(context_input), input)
}

/// Run `program` against a prepared context. The context may be shared between runs.
pub fn run_with_context(
    program: &Program,
    context: &Context,
    input: &StateInput,
) -> Result<ProgramOutput, EngineError> {
    let missing_dependencies: Vec<String> = program
        .dependencies
        .iter()
        .filter(|key| !input.provides(key))
        .cloned()
        .collect();
    if !missing_dependencies.is_empty() {
        debug!(
            program = %program.id,
            missing = ?missing_dependencies,
            "profile lacks declared dependencies"
        );
    }

    let mut overrides = StateInputOverrides::default();
    let mut clauses = Vec::with_capacity(program.clauses.len());

    for (index, clause) in program.clauses.iter().enumerate() {
        let output = match clause {
            Clause::Output(clause) => {
                let effective = input.with_overrides(&overrides);
                let state = state::evaluate(context, &clause.state, &effective)?;
                let similarity = state.similarity();
                debug!(
                    program = %program.id,
                    clause = index,
                    similarity,
                    "output clause evaluated"
                );
                ClauseOutput::Output(OutputClauseOutput {
                    state,
                    weight: clause.weight,
                    decisive: clause.decisive,
                    similarity,
                })
            }
            Clause::Eval(clause) => {
                let contributors = clause
                    .contributors
                    .iter()
                    .map(|contributor| contribute(context, contributor, input, &mut overrides))
                    .collect::<Result<Vec<_>, _>>()?;
                debug!(
                    program = %program.id,
                    clause = index,
                    points = ?overrides.points,
                    "eval clause evaluated"
                );
                ClauseOutput::Eval(EvalClauseOutput {
                    contributors,
                    state_input_overrides: overrides.clone(),
                })
            }
        };
        clauses.push(output);
    }

    let similarity = overall_similarity(&clauses);
    info!(program = %program.id, similarity, "program evaluated");

    Ok(ProgramOutput {
        id: program.id.clone(),
        dependencies: program.dependencies.clone(),
        clauses,
        similarity,
        state_input_overrides: overrides,
        missing_dependencies,
    })
}

/// Surface configuration errors by running against an empty profile.
///
/// Empty filter or aggregation sets fail regardless of data, so this catches them without a
/// real applicant. Reference strings are already checked when the program is deserialized.
pub fn validate(program: &Program) -> Result<(), EngineError> {
    run(program, &ContextInput::default(), &StateInput::default()).map(|_| ())
}

/// Weighted mean of output clauses, capped by any decisive clause scoring below 1.
fn overall_similarity(clauses: &[ClauseOutput]) -> f64 {
    let outputs: Vec<&OutputClauseOutput> = clauses
        .iter()
        .filter_map(|clause| match clause {
            ClauseOutput::Output(output) => Some(output),
            ClauseOutput::Eval(_) => None,
        })
        .collect();

    let total_weight: f64 = outputs.iter().map(|output| weight_of(output)).sum();
    if outputs.is_empty() || total_weight <= 0.0 {
        return 0.0;
    }

    let weighted: f64 = outputs
        .iter()
        .map(|output| weight_of(output) * output.similarity)
        .sum();
    let mean = weighted / total_weight;

    let decisive_floor = outputs
        .iter()
        .filter(|output| output.decisive && output.similarity < 1.0)
        .map(|output| output.similarity)
        .reduce(f64::min);

    let similarity = match decisive_floor {
        Some(floor) => mean.min(floor),
        None => mean,
    };
    clamp_similarity(similarity)
}

fn weight_of(output: &OutputClauseOutput) -> f64 {
    output.weight.unwrap_or(DEFAULT_WEIGHT)
}
