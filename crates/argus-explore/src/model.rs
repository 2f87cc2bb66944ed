//! Constraint preprocessing.
//!
//! Turns the raw parsed script into the shape the enumeration loop needs:
//! the ordered input variables, an explicit role per declared symbol, the
//! pre-unwrap constraint list (projection sets are computed against it) and
//! the solver-ready constraint list (wrappers unwrapped, bounds injected).

use std::collections::BTreeMap;

use serde::Serialize;

use argus_ir::{Declaration, Script, Sort, Term};

/// Instrumenter naming contract: symbols tagging an abnormal control-flow
/// path carry this prefix.
pub const ABNORMAL_PREFIX: &str = "ab_";
/// Instrumenter naming contract: branch-predicate outcome symbols carry
/// this prefix.
pub const DECISION_PREFIX: &str = "temp_";
/// Instrumenter naming contract: the reserved bookkeeping objective symbol.
pub const OBJECTIVE_NAME: &str = "objective";

/// Role of a declared symbol, resolved once at construction from the
/// instrumenter's naming contract and never re-derived from printed syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// An input to the target program; defines one test-case column.
    Input,
    /// Outcome of one branch predicate of the target program.
    Decision,
    /// Marker tagging an abnormal/alternate control-flow path.
    AbnormalMarker,
    /// Bookkeeping symbol, never solved for.
    Synthetic,
}

/// A declared symbol with its resolved role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Variable {
    pub name: String,
    pub sort: Sort,
    pub role: Role,
}

/// Inclusive bound applied to every integer input variable, keeping the
/// search space finite. Never applied automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ValueRange {
    min: i64,
    max: i64,
}

impl ValueRange {
    pub fn new(min: i64, max: i64) -> Result<Self, ModelError> {
        if min > max {
            return Err(ModelError::InvalidRange { min, max });
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> i64 {
        self.min
    }

    pub fn max(&self) -> i64 {
        self.max
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("the constraint file does not declare any input variables")]
    NoInputVariables,

    #[error("declaration constraint {index} does not name a declared variable")]
    MalformedDeclaration { index: usize },

    #[error("constraint references undeclared symbol '{0}'")]
    UndeclaredSymbol(String),

    #[error("invalid value range: min {min} is greater than max {max}")]
    InvalidRange { min: i64, max: i64 },
}

/// Preprocessed constraint set for one enumeration run.
///
/// Built once per run. Running branch and path coverage side by side needs
/// two independently constructed instances, one per solver session.
#[derive(Debug, Clone)]
pub struct ConstraintModel {
    declarations: Vec<Declaration>,
    roles: BTreeMap<String, Role>,
    input_variables: Vec<Variable>,
    /// Post-extraction, pre-unwrap constraints. Projection sets are computed
    /// against these, since unwrapping destroys the marker/branch link.
    wrapped: Vec<Term>,
    /// Solver-ready constraints: wrappers unwrapped, bounds injected.
    constraints: Vec<Term>,
}

impl ConstraintModel {
    pub fn new(script: Script, range: Option<ValueRange>) -> Result<Self, ModelError> {
        let roles = resolve_roles(&script.declarations);
        let sorts: BTreeMap<&str, Sort> = script
            .declarations
            .iter()
            .map(|d| (d.name.as_str(), d.sort))
            .collect();

        // Declaration block: scan from the front; the block ends at the
        // first disjunction headed by an abnormal marker.
        let mut constraints = script.constraints;
        let mut input_variables = Vec::new();
        let mut block_len = constraints.len();
        for (index, constraint) in constraints.iter().enumerate() {
            if wrapper_parts(constraint, &roles).is_some() && constraint.is_or() {
                block_len = index;
                break;
            }
            let name = constraint
                .first_operand()
                .and_then(Term::as_var)
                .ok_or(ModelError::MalformedDeclaration { index })?;
            let sort = *sorts
                .get(name)
                .ok_or_else(|| ModelError::UndeclaredSymbol(name.to_string()))?;
            input_variables.push(Variable {
                name: name.to_string(),
                sort,
                role: Role::Input,
            });
        }
        if input_variables.is_empty() {
            return Err(ModelError::NoInputVariables);
        }
        let mut remaining = constraints.split_off(block_len);

        // The trailing synthetic objective is bookkeeping, never solved.
        let is_objective = |term: &Term| {
            term.first_operand()
                .and_then(Term::as_var)
                .is_some_and(|name| roles.get(name) == Some(&Role::Synthetic))
        };
        if remaining.last().is_some_and(is_objective) {
            remaining.pop();
        }

        // Unwrap abnormal wrappers; keep the wrapped originals around for
        // projection-set computation.
        let wrapped = remaining.clone();
        let mut solver_constraints: Vec<Term> = remaining
            .into_iter()
            .map(|term| match wrapper_parts(&term, &roles) {
                Some((_, condition)) => condition.clone(),
                None => term,
            })
            .collect();

        if let Some(range) = range {
            for input in input_variables.iter().filter(|v| v.sort == Sort::Int) {
                solver_constraints.push(Term::and(vec![
                    Term::var(&input.name).ge(Term::int(range.min())),
                    Term::var(&input.name).le(Term::int(range.max())),
                ]));
            }
        }

        log::debug!(
            "preprocessed model: {} input variables, {} constraints ({} wrapped)",
            input_variables.len(),
            solver_constraints.len(),
            wrapped.len(),
        );

        Ok(Self {
            declarations: script.declarations,
            roles,
            input_variables,
            wrapped,
            constraints: solver_constraints,
        })
    }

    /// All declared symbols, as the session must declare them.
    pub fn declarations(&self) -> &[Declaration] {
        &self.declarations
    }

    /// Input variables in declaration order; defines test-case columns.
    pub fn input_variables(&self) -> &[Variable] {
        &self.input_variables
    }

    /// Pre-unwrap constraints, for projection-set computation.
    pub fn wrapped(&self) -> &[Term] {
        &self.wrapped
    }

    /// Solver-ready constraints.
    pub fn constraints(&self) -> &[Term] {
        &self.constraints
    }

    pub fn role(&self, name: &str) -> Option<Role> {
        self.roles.get(name).copied()
    }

    pub fn is_decision(&self, name: &str) -> bool {
        self.roles.get(name) == Some(&Role::Decision)
    }

    /// Marker and gated condition of an abnormal wrapper, if this constraint
    /// is one.
    pub fn abnormal_wrapper<'t>(&self, term: &'t Term) -> Option<(&'t str, &'t Term)> {
        wrapper_parts(term, &self.roles)
    }
}

fn resolve_roles(declarations: &[Declaration]) -> BTreeMap<String, Role> {
    declarations
        .iter()
        .map(|d| {
            let role = if d.name.starts_with(ABNORMAL_PREFIX) {
                Role::AbnormalMarker
            } else if d.name.starts_with(DECISION_PREFIX) {
                Role::Decision
            } else if d.name == OBJECTIVE_NAME {
                Role::Synthetic
            } else {
                Role::Input
            };
            (d.name.clone(), role)
        })
        .collect()
}

/// A wrapper pairs a marker with the condition that gated the path: a
/// composite term with at least two operands, the first of which is an
/// abnormal-marker symbol.
fn wrapper_parts<'t>(
    term: &'t Term,
    roles: &BTreeMap<String, Role>,
) -> Option<(&'t str, &'t Term)> {
    let operands = term.operands();
    if operands.len() < 2 {
        return None;
    }
    let marker = operands[0].as_var()?;
    if roles.get(marker) != Some(&Role::AbnormalMarker) {
        return None;
    }
    Some((marker, operands[1]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use argus_ir::parse_script;

    fn model_from(source: &str, range: Option<ValueRange>) -> Result<ConstraintModel, ModelError> {
        ConstraintModel::new(parse_script(source).unwrap(), range)
    }

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

    #[test]
    fn roles_follow_the_naming_contract() {
        let model = model_from(TWO_BRANCH, None).unwrap();
        assert_eq!(model.role("b"), Some(Role::Input));
        assert_eq!(model.role("x"), Some(Role::Input));
        assert_eq!(model.role("temp_1"), Some(Role::Decision));
        assert_eq!(model.role("ab_1"), Some(Role::AbnormalMarker));
        assert_eq!(model.role("nope"), None);
    }

    #[test]
    fn declaration_block_fixes_input_order() {
        let model = model_from(TWO_BRANCH, None).unwrap();
        let names: Vec<&str> = model
            .input_variables()
            .iter()
            .map(|v| v.name.as_str())
            .collect();
        assert_eq!(names, vec!["b", "x"]);
        assert_eq!(model.input_variables()[1].sort, Sort::Int);
    }

    #[test]
    fn wrappers_are_unwrapped_in_place() {
        let model = model_from(TWO_BRANCH, None).unwrap();
        let expected = Term::var("temp_1").eq(Term::var("b"));
        assert_eq!(model.constraints(), &[expected.clone(), expected]);
        // The wrapped originals survive for projection computation.
        assert!(model.wrapped().iter().all(Term::is_or));
    }

    #[test]
    fn trailing_objective_is_stripped() {
        let source = format!(
            "{TWO_BRANCH}\
             (declare-fun objective () Int)\n\
             (assert (>= objective 0))\n"
        );
        let model = model_from(&source, None).unwrap();
        assert_eq!(model.constraints().len(), 2);
        assert_eq!(model.wrapped().len(), 2);
    }

    #[test]
    fn bounds_are_injected_for_integer_inputs_only() {
        let range = ValueRange::new(0, 5).unwrap();
        let model = model_from(TWO_BRANCH, Some(range)).unwrap();
        // Two unwrapped constraints plus one bound for x (b is boolean).
        assert_eq!(model.constraints().len(), 3);
        assert_eq!(
            model.constraints()[2],
            Term::and(vec![
                Term::var("x").ge(Term::int(0)),
                Term::var("x").le(Term::int(5)),
            ])
        );
    }

    #[test]
    fn empty_declaration_block_is_rejected() {
        let source = "\
            (declare-fun temp_1 () Bool)\n\
            (declare-fun ab_1 () Bool)\n\
            (assert (or ab_1 (= temp_1 true)))\n";
        assert!(matches!(
            model_from(source, None),
            Err(ModelError::NoInputVariables)
        ));
    }

    #[test]
    fn declaration_without_variable_is_rejected() {
        let source = "(assert (= 1 1))";
        assert!(matches!(
            model_from(source, None),
            Err(ModelError::MalformedDeclaration { index: 0 })
        ));
    }

    #[test]
    fn inverted_range_is_rejected() {
        assert!(matches!(
            ValueRange::new(10, 0),
            Err(ModelError::InvalidRange { min: 10, max: 0 })
        ));
    }
}
