use serde_json::json;

use super::common::*;
use crate::error::EngineError;
use crate::programs::program::{run, validate, ClauseOutput, Program};

fn program(value: serde_json::Value) -> Program {
    serde_json::from_value(value).expect("program deserializes")
}

#[test]
fn failing_decisive_clause_caps_the_weighted_mean() {
    let program = program(json!({
        "id": "decisive",
        "clauses": [
            {
                "kind": "output",
                "weight": 2,
                "state": {"kind": "age", "op": ">=", "expected": 18}
            },
            {
                "kind": "output",
                "decisive": true,
                "state": {"kind": "citizenship", "op": "in", "expected": ["NZ"]}
            }
        ]
    }));

    let output = run(&program, &context_input(), &profile()).expect("program runs");
    assert_eq!(output.similarity, 0.0);
}

#[test]
fn non_decisive_clauses_average_by_weight() {
    let program = program(json!({
        "id": "weighted",
        "clauses": [
            {
                "kind": "output",
                "weight": 2,
                "state": {"kind": "age", "op": ">=", "expected": 18}
            },
            {
                "kind": "output",
                "state": {"kind": "citizenship", "op": "in", "expected": ["NZ"]}
            }
        ]
    }));

    let output = run(&program, &context_input(), &profile()).expect("program runs");
    assert!((output.similarity - 2.0 / 3.0).abs() < 1e-9);
}

#[test]
fn passing_decisive_clause_does_not_clamp() {
    let program = program(json!({
        "id": "decisive-pass",
        "clauses": [
            {
                "kind": "output",
                "decisive": true,
                "state": {"kind": "citizenship", "op": "in", "expected": ["IN"]}
            },
            {
                "kind": "output",
                "state": {"kind": "age", "op": "<=", "expected": 36}
            }
        ]
    }));

    let output = run(&program, &context_input(), &profile()).expect("program runs");
    // (1.0 + 36 / 45) / 2
    assert!((output.similarity - 0.9).abs() < 1e-9);
}

#[test]
fn program_without_output_clauses_scores_zero() {
    let program = program(json!({
        "id": "eval-only",
        "clauses": [{
            "kind": "eval",
            "contributors": [{
                "kind": "points",
                "op": "+",
                "value": 10,
                "expected_state": {"kind": "age", "op": ">=", "expected": 18}
            }]
        }]
    }));

    let output = run(&program, &context_input(), &profile()).expect("program runs");
    assert_eq!(output.similarity, 0.0);
    assert_eq!(output.state_input_overrides.points, Some(10.0));
}

#[test]
fn eval_clauses_only_affect_later_output_clauses() {
    let program = program(json!({
        "id": "points-test",
        "dependencies": ["age", "points"],
        "clauses": [
            {
                "kind": "output",
                "state": {"kind": "points", "op": ">=", "expected": 65}
            },
            {
                "kind": "eval",
                "contributors": [
                    {
                        "kind": "points",
                        "op": "+",
                        "value": 30,
                        "expected_state": {"kind": "age", "op": "<=", "expected": 45}
                    },
                    {
                        "kind": "or",
                        "contributors": [
                            {
                                "op": "+",
                                "value": 20,
                                "expected_state": {
                                    "kind": "education_experiences",
                                    "op": "contains",
                                    "expected": {"level": {"op": ">=", "expected": "master"}}
                                }
                            },
                            {
                                "op": "+",
                                "value": 15,
                                "expected_state": {
                                    "kind": "education_experiences",
                                    "op": "contains",
                                    "expected": {"level": {"op": ">=", "expected": "bachelor"}}
                                }
                            }
                        ]
                    }
                ]
            },
            {
                "kind": "output",
                "state": {"kind": "points", "op": ">=", "expected": 45}
            }
        ]
    }));

    let output = run(&program, &context_input(), &profile()).expect("program runs");

    let similarities: Vec<f64> = output
        .clauses
        .iter()
        .filter_map(|clause| match clause {
            ClauseOutput::Output(output) => Some(output.similarity),
            ClauseOutput::Eval(_) => None,
        })
        .collect();
    // The first clause runs before any contributor and sees no points at all.
    assert_eq!(similarities, vec![0.1, 1.0]);
    assert_eq!(output.state_input_overrides.points, Some(45.0));
    assert_eq!(output.missing_dependencies, vec!["points".to_string()]);

    let rendered = serde_json::to_value(&output).expect("output serializes");
    assert_eq!(rendered["clauses"][1]["kind"], "eval");
    assert_eq!(
        rendered["clauses"][1]["contributors"][1]["contributors"][1]["is_applied"],
        true
    );
    assert_eq!(rendered["clauses"][2]["state"]["actual"], 45.0);
}

#[test]
fn runs_do_not_share_overrides() {
    let program = program(json!({
        "id": "repeatable",
        "clauses": [
            {
                "kind": "eval",
                "contributors": [{
                    "kind": "points",
                    "op": "+",
                    "value": 10,
                    "expected_state": {"kind": "age", "op": ">=", "expected": 18}
                }]
            },
            {
                "kind": "output",
                "state": {"kind": "points", "op": "==", "expected": 10}
            }
        ]
    }));

    let first = run(&program, &context_input(), &profile()).expect("first run");
    let second = run(&program, &context_input(), &profile()).expect("second run");
    assert_eq!(first.similarity, 1.0);
    assert_eq!(first, second);
}

#[test]
fn validation_surfaces_empty_filter_sets() {
    let program = program(json!({
        "id": "broken",
        "clauses": [{
            "kind": "output",
            "state": {
                "kind": "and",
                "states": [
                    {"kind": "age", "op": ">=", "expected": 18},
                    {"kind": "family_members", "op": "contains", "expected": {}}
                ]
            }
        }]
    }));

    assert_eq!(
        validate(&program).unwrap_err(),
        EngineError::EmptyFilterSet {
            kind: "family_members"
        }
    );
}
