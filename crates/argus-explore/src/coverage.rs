//! Coverage strategies and the AllSAT enumeration loop.
//!
//! Both criteria share one enumeration algorithm and differ only in the
//! projection set: the decision variables two models must differ on to
//! count as distinct test cases. Branch coverage projects onto the
//! decisions actually consulted by an abnormal wrapper; path coverage
//! projects onto every decision anywhere, one equivalence class per path.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use serde::{Deserialize, Serialize};

use argus_ir::Term;
use argus_smt::{SatResult, Session, SessionError, Value};

use crate::extract::{extract_test_case, TestCase};
use crate::model::ConstraintModel;

/// A coverage criterion. Implementations expose only the projection set;
/// preprocessing state lives in [`ConstraintModel`] and is passed in
/// explicitly.
pub trait CoverageStrategy {
    fn name(&self) -> &'static str;

    /// Decision variables that distinguish equivalence classes of models.
    /// Always computed against the pre-unwrap constraints.
    fn projection_set(&self, model: &ConstraintModel) -> BTreeSet<String>;
}

/// Visit every decision at least once.
pub struct BranchCoverage;

impl CoverageStrategy for BranchCoverage {
    fn name(&self) -> &'static str {
        "branch"
    }

    /// One linear scan. For each unseen marker heading a wrapper, the
    /// wrapped condition's first operand is the branch predicate that gated
    /// the recorded decision; repeated wrappers for the same marker do not
    /// double-count.
    fn projection_set(&self, model: &ConstraintModel) -> BTreeSet<String> {
        let mut projection = BTreeSet::new();
        let mut seen_markers = BTreeSet::new();
        for constraint in model.wrapped() {
            let Some((marker, condition)) = model.abnormal_wrapper(constraint) else {
                continue;
            };
            if !seen_markers.insert(marker.to_string()) {
                continue;
            }
            if let Some(name) = condition.first_operand().and_then(Term::as_var) {
                if model.is_decision(name) {
                    projection.insert(name.to_string());
                }
            }
        }
        projection
    }
}

/// Visit every distinct combination of decisions at least once.
pub struct PathCoverage;

impl CoverageStrategy for PathCoverage {
    fn name(&self) -> &'static str {
        "path"
    }

    /// Every decision variable occurring anywhere in the constraint set.
    fn projection_set(&self, model: &ConstraintModel) -> BTreeSet<String> {
        let mut projection = BTreeSet::new();
        for constraint in model.wrapped() {
            constraint.visit_vars(&mut |name| {
                if model.is_decision(name) {
                    projection.insert(name.to_string());
                }
            });
        }
        projection
    }
}

/// Per-run budgets. Zero means unlimited; no budget is ever applied
/// automatically.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RunLimits {
    /// Maximum satisfy-extract-block iterations.
    pub max_iterations: u64,
    /// Maximum wall-clock seconds for the whole loop.
    pub max_wall_secs: u64,
}

/// Why the enumeration loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The solver reported unsatisfiable: every projection class is covered.
    Exhausted,
    IterationLimit,
    WallClock,
    Cancelled,
}

/// A completed enumeration.
#[derive(Debug)]
pub struct EnumerationRun {
    pub cases: Vec<TestCase>,
    pub iterations: u64,
    pub stop: StopReason,
}

/// Terminal enumeration failures. Test cases appended before the failure
/// were each independently verified satisfiable and travel with the error
/// so callers can flush them.
#[derive(Debug, thiserror::Error)]
pub enum EnumerateError {
    #[error("solver session failed: {source}")]
    Session {
        source: SessionError,
        completed: Vec<TestCase>,
    },

    #[error("solver returned unknown: {reason}")]
    UnknownResult {
        reason: String,
        completed: Vec<TestCase>,
    },
}

impl EnumerateError {
    /// Test cases completed before the failure.
    pub fn completed(&self) -> &[TestCase] {
        match self {
            EnumerateError::Session { completed, .. } => completed,
            EnumerateError::UnknownResult { completed, .. } => completed,
        }
    }
}

/// AllSAT-with-blocking-clauses enumeration.
///
/// Asserts the preprocessed constraints into the exclusively owned session,
/// then repeats satisfy / extract / block until the solver reports
/// unsatisfiable or a budget or the cancellation flag stops the loop. The
/// session is only ever mutated monotonically: blocking clauses are added,
/// nothing is retracted.
pub fn enumerate<S: Session>(
    model: &ConstraintModel,
    strategy: &dyn CoverageStrategy,
    session: &mut S,
    limits: &RunLimits,
    cancel: Option<&AtomicBool>,
) -> Result<EnumerationRun, EnumerateError> {
    let projection = strategy.projection_set(model);
    log::debug!(
        "{} coverage: projection set {:?}",
        strategy.name(),
        projection
    );
    if projection.is_empty() {
        // Degenerate: the first blocking clause is the empty disjunction,
        // so the loop emits at most one test case.
        log::warn!("projection set is empty; at most one test case will be emitted");
    }

    let mut cases: Vec<TestCase> = Vec::new();
    let fail = |source: SessionError, cases: &mut Vec<TestCase>| EnumerateError::Session {
        source,
        completed: std::mem::take(cases),
    };

    for declaration in model.declarations() {
        if let Err(source) = session.declare(&declaration.name, declaration.sort) {
            return Err(fail(source, &mut cases));
        }
    }
    for constraint in model.constraints() {
        if let Err(source) = session.assert(constraint) {
            return Err(fail(source, &mut cases));
        }
    }

    let started = Instant::now();
    let mut iterations = 0u64;
    let stop = loop {
        if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
            break StopReason::Cancelled;
        }
        if limits.max_iterations > 0 && iterations >= limits.max_iterations {
            break StopReason::IterationLimit;
        }
        if limits.max_wall_secs > 0 && started.elapsed().as_secs() >= limits.max_wall_secs {
            break StopReason::WallClock;
        }

        let verdict = match session.check_sat() {
            Ok(verdict) => verdict,
            Err(source) => return Err(fail(source, &mut cases)),
        };
        match verdict {
            SatResult::Unsat => break StopReason::Exhausted,
            SatResult::Unknown(reason) => {
                return Err(EnumerateError::UnknownResult {
                    reason,
                    completed: cases,
                })
            }
            SatResult::Sat => {}
        }

        let sat_model = match session.model() {
            Ok(sat_model) => sat_model,
            Err(source) => return Err(fail(source, &mut cases)),
        };

        // Forbid this projection assignment from ever recurring.
        let blocked: Vec<Term> = projection
            .iter()
            .filter_map(|name| {
                sat_model
                    .get(name)
                    .map(|value| Term::var(name).eq(value_term(value)).not())
            })
            .collect();
        let blocking_clause = Term::or(blocked);

        cases.push(extract_test_case(&sat_model, model.input_variables()));
        if let Err(source) = session.assert(&blocking_clause) {
            return Err(fail(source, &mut cases));
        }
        iterations += 1;
    };

    log::info!(
        "{} coverage enumerated {} test cases in {} iterations ({:?})",
        strategy.name(),
        cases.len(),
        iterations,
        stop
    );
    Ok(EnumerationRun {
        cases,
        iterations,
        stop,
    })
}

fn value_term(value: &Value) -> Term {
    match value {
        Value::Bool(b) => Term::bool(*b),
        Value::Int(n) => Term::int(*n),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ValueRange;
    use argus_ir::parse_script;

    fn preprocessed(source: &str) -> ConstraintModel {
        ConstraintModel::new(parse_script(source).unwrap(), None).unwrap()
    }

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

    #[test]
    fn branch_projection_counts_each_marker_once() {
        let source = "\
            (declare-fun b () Bool)\n\
            (declare-fun temp_1 () Bool)\n\
            (declare-fun ab_1 () Bool)\n\
            (assert (= b b))\n\
            (assert (or ab_1 (= temp_1 b)))\n\
            (assert (or ab_1 (= temp_1 b)))\n";
        let model = preprocessed(source);
        let projection = BranchCoverage.projection_set(&model);
        assert_eq!(projection, BTreeSet::from(["temp_1".to_string()]));
    }

    #[test]
    fn branch_projection_skips_non_decision_heads() {
        let source = "\
            (declare-fun b () Bool)\n\
            (declare-fun temp_1 () Bool)\n\
            (declare-fun ab_1 () Bool)\n\
            (assert (= b b))\n\
            (assert (or ab_1 (=> (not temp_1) b)))\n";
        let model = preprocessed(source);
        // The wrapped condition's first operand is (not temp_1), not a
        // decision variable itself.
        assert!(BranchCoverage.projection_set(&model).is_empty());
    }

    #[test]
    fn path_projection_collects_every_decision() {
        let model = preprocessed(NESTED);
        let projection = PathCoverage.projection_set(&model);
        assert_eq!(
            projection,
            BTreeSet::from(["temp_1".to_string(), "temp_2".to_string()])
        );
    }

    #[test]
    fn path_projection_is_a_superset_of_branch_projection() {
        let model = preprocessed(NESTED);
        let branch = BranchCoverage.projection_set(&model);
        let path = PathCoverage.projection_set(&model);
        assert!(branch.is_subset(&path));
        assert_eq!(branch, BTreeSet::from(["temp_1".to_string()]));
    }

    #[test]
    fn projections_ignore_injected_bounds() {
        let script = parse_script(
            "\
            (declare-fun x () Int)\n\
            (declare-fun temp_1 () Bool)\n\
            (declare-fun ab_1 () Bool)\n\
            (assert (= x x))\n\
            (assert (or ab_1 (= temp_1 (> x 0))))\n",
        )
        .unwrap();
        let bounded =
            ConstraintModel::new(script.clone(), Some(ValueRange::new(0, 5).unwrap())).unwrap();
        let unbounded = ConstraintModel::new(script, None).unwrap();
        assert_eq!(
            BranchCoverage.projection_set(&bounded),
            BranchCoverage.projection_set(&unbounded)
        );
    }
}
