//! Eligibility program engine.
//!
//! A [`Program`] is an ordered list of clauses. `output` clauses score a [`State`] tree against
//! the applicant profile; `eval` clauses run contributors that adjust a per-run point total read
//! back by later clauses. [`run`] returns the whole program echoed with observed values and a
//! similarity on every node.

pub mod context;
pub mod contributor;
pub mod currency;
pub mod domain;
pub mod english;
pub mod occupation;
pub mod program;
pub mod reference;
pub mod similarity;
pub mod state;
pub mod tables;

#[cfg(test)]
mod tests;

pub use context::{Context, ContextInput};
pub use contributor::{Contributor, ContributorOutput, PointsContributor};
pub use domain::{StateInput, StateInputOverrides};
pub use program::{run, run_with_context, validate, Clause, ClauseOutput, Program, ProgramOutput};
pub use state::{evaluate, State, StateOutput};
