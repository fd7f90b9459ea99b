use super::common::*;
use crate::programs::contributor::{
    contribute, ArithmeticOp, Contributor, ContributorOutput, PointsContributor,
};
use crate::programs::domain::{StateInput, StateInputOverrides};
use crate::programs::state::State;

fn points(op: ArithmeticOp, value: f64, gate: State, threshold: Option<f64>) -> PointsContributor {
    PointsContributor {
        op,
        value,
        expected_state: gate,
        expected_state_similarity: threshold,
    }
}

fn applicant_aged(age: u32) -> StateInput {
    StateInput {
        age: Some(age),
        ..StateInput::default()
    }
}

#[test]
fn threshold_boundary_is_inclusive() {
    // 45 / 56.25 == 0.8
    let contributor = Contributor::Points(points(
        ArithmeticOp::Add,
        10.0,
        age_at_least(56.25),
        Some(0.8),
    ));
    let mut overrides = StateInputOverrides::default();

    let output = contribute(&context(), &contributor, &applicant_aged(45), &mut overrides)
        .expect("contributor evaluates");

    assert!(output.is_applied());
    assert_eq!(overrides.points, Some(10.0));
}

#[test]
fn default_threshold_requires_full_match() {
    let contributor =
        Contributor::Points(points(ArithmeticOp::Add, 10.0, age_at_least(50.0), None));
    let mut overrides = StateInputOverrides::default();

    let output = contribute(&context(), &contributor, &applicant_aged(45), &mut overrides)
        .expect("contributor evaluates");

    assert!(!output.is_applied());
    assert_eq!(overrides.points, None);
}

#[test]
fn or_contributor_applies_only_first_qualifying_child() {
    let contributor = Contributor::Or {
        contributors: vec![
            // 45 / 50 == 0.9
            points(ArithmeticOp::Add, 15.0, age_at_least(50.0), Some(0.8)),
            // 45 / 56.25 == 0.8
            points(ArithmeticOp::Add, 25.0, age_at_least(56.25), Some(0.7)),
        ],
    };
    let mut overrides = StateInputOverrides::default();

    let output = contribute(&context(), &contributor, &applicant_aged(45), &mut overrides)
        .expect("contributor evaluates");

    match output {
        ContributorOutput::Or {
            contributors,
            is_applied,
        } => {
            assert!(is_applied);
            assert_eq!(contributors.len(), 2);
            assert!(contributors[0].is_applied);
            assert_eq!(contributors[0].expected_state.similarity(), 0.9);
            assert!(!contributors[1].is_applied);
            assert_eq!(contributors[1].expected_state.similarity(), 0.8);
        }
        other => panic!("expected or output, got {other:?}"),
    }
    assert_eq!(overrides.points, Some(15.0));
}

#[test]
fn operations_start_from_zero_and_chain() {
    let passing = || age_at_least(18.0);
    let mut overrides = StateInputOverrides::default();
    let input = applicant_aged(45);

    for (op, value) in [
        (ArithmeticOp::Subtract, 4.0),
        (ArithmeticOp::Multiply, -5.0),
        (ArithmeticOp::Divide, 4.0),
    ] {
        let contributor = Contributor::Points(points(op, value, passing(), None));
        contribute(&context(), &contributor, &input, &mut overrides)
            .expect("contributor evaluates");
    }

    assert_eq!(overrides.points, Some(5.0));
}

#[test]
fn gates_read_points_written_earlier() {
    let input = StateInput {
        points: Some(40.0),
        ..StateInput::default()
    };
    let mut overrides = StateInputOverrides {
        points: Some(60.0),
    };
    let contributor = Contributor::Points(points(
        ArithmeticOp::Add,
        5.0,
        points_at_least(60.0),
        None,
    ));

    let output = contribute(&context(), &contributor, &input, &mut overrides)
        .expect("contributor evaluates");

    assert!(output.is_applied());
    assert_eq!(overrides.points, Some(65.0));
}

#[test]
fn contributors_deserialize_from_wire_shape() {
    let contributor: Contributor = serde_json::from_value(serde_json::json!({
        "kind": "or",
        "contributors": [{
            "op": "+",
            "value": 10,
            "expected_state": {"kind": "age", "op": "between", "expected": {"min": 25, "max": 32}},
            "expected_state_similarity": 0.9
        }]
    }))
    .expect("contributor deserializes");

    match contributor {
        Contributor::Or { contributors } => {
            assert_eq!(contributors[0].op, ArithmeticOp::Add);
            assert_eq!(contributors[0].threshold(), 0.9);
        }
        other => panic!("expected or contributor, got {other:?}"),
    }
}
