//! Solver session contract.
//!
//! A session is exclusively owned by one enumeration run, start to finish.
//! Assertions are monotonic: nothing is ever retracted, the constraint set
//! only grows until the solver reports unsatisfiable.

use std::collections::BTreeMap;

use serde::Serialize;

use argus_ir::{Sort, Term};

/// Result of a satisfiability check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SatResult {
    Sat,
    Unsat,
    /// The solver gave up; the payload is its reason. The enumeration loop
    /// treats this as fatal.
    Unknown(String),
}

/// A concrete literal value from a model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
        }
    }
}

/// One satisfying assignment, valid only immediately after a `Sat` result
/// and invalidated by any subsequent assertion.
///
/// Variables the solver left uninterpreted are absent; the test-case
/// extractor substitutes generic defaults for them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Model {
    pub values: BTreeMap<String, Value>,
}

impl Model {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self.values.get(name) {
            Some(Value::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn get_int(&self, name: &str) -> Option<i64> {
        match self.values.get(name) {
            Some(Value::Int(n)) => Some(*n),
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("unknown variable '{0}'")]
    UnknownVariable(String),

    #[error("sort mismatch: {0}")]
    SortMismatch(String),

    #[error("no model available: {0}")]
    ModelUnavailable(String),

    #[error("solver backend error: {0}")]
    Backend(String),
}

/// Adapter contract over the external incremental constraint solver.
pub trait Session {
    /// Declare a symbol before it appears in an assertion.
    fn declare(&mut self, name: &str, sort: Sort) -> Result<(), SessionError>;

    /// Assert a boolean term. Irrevocable.
    fn assert(&mut self, term: &Term) -> Result<(), SessionError>;

    /// Check satisfiability of everything asserted so far.
    fn check_sat(&mut self) -> Result<SatResult, SessionError>;

    /// The model for the last `Sat` result.
    fn model(&mut self) -> Result<Model, SessionError>;
}
