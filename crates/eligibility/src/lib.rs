//! Similarity-scored eligibility evaluation.
//!
//! Programs are trees of states combined with AND/OR logic plus contributors that adjust a
//! running point total. Every predicate yields a similarity in `[0, 1]`, so incomplete
//! profiles still receive a graded, explainable result.

pub mod config;
pub mod error;
pub mod programs;
pub mod telemetry;
