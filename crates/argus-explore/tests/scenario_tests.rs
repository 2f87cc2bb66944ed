//! End-to-end coverage scenarios against a real solver session.

use argus_explore::{
    enumerate, BranchCoverage, ConstraintModel, CoverageStrategy, PathCoverage, RunLimits,
    StopReason, TestCase, ValueRange,
};
use argus_ir::parse_script;
use argus_smt::{Value, Z3Session};

fn run(
    source: &str,
    strategy: &dyn CoverageStrategy,
    range: Option<ValueRange>,
) -> Vec<TestCase> {
    let model = ConstraintModel::new(parse_script(source).unwrap(), range).unwrap();
    let mut session = Z3Session::new();
    let run = enumerate(
        &model,
        strategy,
        &mut session,
        &RunLimits::default(),
        None,
    )
    .unwrap();
    assert_eq!(run.stop, StopReason::Exhausted);
    run.cases
}

/// One decision gating two abnormal branches; the integer input never
/// bears on it.
const TWO_BRANCH: &str = "\
    (declare-fun b () Bool)\n\
    (declare-fun x () Int)\n\
    (declare-fun temp_1 () Bool)\n\
    (declare-fun ab_1 () Bool)\n\
    (declare-fun ab_2 () Bool)\n\
    (assert (= b b))\n\
    (assert (= x x))\n\
    (assert (or ab_1 (= temp_1 b)))\n\
    (assert (or ab_2 (= temp_1 b)))\n";

/// A nested decision reachable only when the outer one holds; the
/// instrumenter pins the inner predicate when its branch is not reached.
const NESTED: &str = "\
    (declare-fun b () Bool)\n\
    (declare-fun c () Bool)\n\
    (declare-fun temp_1 () Bool)\n\
    (declare-fun temp_2 () Bool)\n\
    (declare-fun ab_1 () Bool)\n\
    (declare-fun ab_2 () Bool)\n\
    (assert (= b b))\n\
    (assert (= c c))\n\
    (assert (or ab_1 (= temp_1 b)))\n\
    (assert (or ab_2 (=> temp_1 (= temp_2 c))))\n\
    (assert (=> (not temp_1) temp_2))\n";

/// One decision over an unbounded integer input.
const UNBOUNDED_INT: &str = "\
    (declare-fun x () Int)\n\
    (declare-fun temp_1 () Bool)\n\
    (declare-fun ab_1 () Bool)\n\
    (assert (= x x))\n\
    (assert (or ab_1 (= temp_1 (> x 0))))\n";

#[test]
fn branch_coverage_emits_one_case_per_decision_outcome() {
    let cases = run(TWO_BRANCH, &BranchCoverage, None);
    assert_eq!(cases.len(), 2);
    // x bears on no decision: the generic default lands in both cases.
    for case in &cases {
        assert_eq!(case.values.len(), 2);
        assert_eq!(case.values[1], Value::Int(0));
    }
    // The two cases differ on the projected decision, so b differs too.
    assert_ne!(cases[0].values[0], cases[1].values[0]);
}

#[test]
fn path_coverage_splits_nested_decisions_into_three_classes() {
    let cases = run(NESTED, &PathCoverage, None);
    assert_eq!(cases.len(), 3);
}

#[test]
fn branch_count_never_exceeds_path_count() {
    let branch = run(NESTED, &BranchCoverage, None);
    let path = run(NESTED, &PathCoverage, None);
    assert_eq!(branch.len(), 2);
    assert!(branch.len() <= path.len());
}

#[test]
fn contradictory_bounds_yield_an_empty_suite() {
    let source = "\
        (declare-fun x () Int)\n\
        (declare-fun temp_1 () Bool)\n\
        (declare-fun ab_1 () Bool)\n\
        (assert (= x x))\n\
        (assert (or ab_1 (= temp_1 (> x 10))))\n\
        (assert temp_1)\n";
    let cases = run(source, &BranchCoverage, Some(ValueRange::new(0, 5).unwrap()));
    assert!(cases.is_empty());
}

#[test]
fn termination_depends_on_projection_size_not_domain_size() {
    // x ranges over all integers, yet branch coverage needs exactly two
    // iterations: the projection set has one boolean.
    let cases = run(UNBOUNDED_INT, &BranchCoverage, None);
    assert_eq!(cases.len(), 2);
}

#[test]
fn bounded_runs_respect_the_value_range() {
    let range = ValueRange::new(0, 5).unwrap();
    let cases = run(UNBOUNDED_INT, &BranchCoverage, Some(range));
    assert_eq!(cases.len(), 2);
    for case in &cases {
        match case.values[0] {
            Value::Int(n) => assert!((0..=5).contains(&n), "x = {n} escapes the range"),
            ref other => panic!("expected an integer, got {other:?}"),
        }
    }
}

#[test]
fn at_most_two_to_the_k_cases_for_k_projected_booleans() {
    // NESTED projects onto two booleans under path coverage.
    let cases = run(NESTED, &PathCoverage, None);
    assert!(cases.len() <= 4);
}

#[test]
fn repeated_runs_agree_on_structure() {
    let first = run(NESTED, &PathCoverage, None);
    let second = run(NESTED, &PathCoverage, None);
    assert_eq!(first.len(), second.len());
    for (a, b) in first.iter().zip(&second) {
        assert_eq!(a.values.len(), b.values.len());
    }
}

#[test]
fn suites_serialize_for_export() {
    let cases = run(TWO_BRANCH, &BranchCoverage, None);
    let json = serde_json::to_string(&cases).unwrap();
    assert!(json.starts_with('['));
    assert!(json.contains('0'));
}
