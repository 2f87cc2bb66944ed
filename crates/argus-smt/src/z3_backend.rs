//! Z3-backed solver session.

use std::collections::HashMap;

use argus_ir::{Sort, Term};

use crate::session::{Model, SatResult, Session, SessionError, Value};

/// Session over an in-process Z3 solver.
///
/// Declared symbols are tracked per sort so terms can be translated and
/// models read back. Model extraction deliberately evaluates without model
/// completion: a variable the solver never interpreted stays absent, which
/// is what lets the extractor substitute generic defaults downstream.
pub struct Z3Session {
    solver: z3::Solver,
    int_vars: HashMap<String, z3::ast::Int>,
    bool_vars: HashMap<String, z3::ast::Bool>,
    _params: Option<z3::Params>,
}

impl Z3Session {
    pub fn new() -> Self {
        Self {
            solver: z3::Solver::new(),
            int_vars: HashMap::new(),
            bool_vars: HashMap::new(),
            _params: None,
        }
    }

    /// Session with a per-check solver timeout. A timeout of zero means no
    /// limit.
    pub fn with_timeout_ms(timeout_ms: u64) -> Self {
        if timeout_ms == 0 {
            return Self::new();
        }
        let solver = z3::Solver::new();
        let mut params = z3::Params::new();
        params.set_u32("timeout", timeout_ms as u32);
        solver.set_params(&params);
        Self {
            solver,
            int_vars: HashMap::new(),
            bool_vars: HashMap::new(),
            _params: Some(params),
        }
    }

    fn translate(&self, term: &Term) -> Result<Z3Term, SessionError> {
        match term {
            Term::Var(name) => {
                if let Some(v) = self.int_vars.get(name) {
                    Ok(Z3Term::Int(v.clone()))
                } else if let Some(v) = self.bool_vars.get(name) {
                    Ok(Z3Term::Bool(v.clone()))
                } else {
                    Err(SessionError::UnknownVariable(name.clone()))
                }
            }
            Term::IntLit(n) => Ok(Z3Term::Int(z3::ast::Int::from_i64(*n))),
            Term::BoolLit(b) => Ok(Z3Term::Bool(z3::ast::Bool::from_bool(*b))),
            Term::Not(inner) => {
                let b = self.translate(inner)?.into_bool()?;
                Ok(Z3Term::Bool(b.not()))
            }
            Term::And(terms) => {
                if terms.is_empty() {
                    return Ok(Z3Term::Bool(z3::ast::Bool::from_bool(true)));
                }
                let bools: Vec<z3::ast::Bool> = terms
                    .iter()
                    .map(|t| self.translate(t).and_then(Z3Term::into_bool))
                    .collect::<Result<_, _>>()?;
                let refs: Vec<&z3::ast::Bool> = bools.iter().collect();
                Ok(Z3Term::Bool(z3::ast::Bool::and(&refs)))
            }
            Term::Or(terms) => {
                // The empty disjunction is false; blocking clauses rely on it.
                if terms.is_empty() {
                    return Ok(Z3Term::Bool(z3::ast::Bool::from_bool(false)));
                }
                let bools: Vec<z3::ast::Bool> = terms
                    .iter()
                    .map(|t| self.translate(t).and_then(Z3Term::into_bool))
                    .collect::<Result<_, _>>()?;
                let refs: Vec<&z3::ast::Bool> = bools.iter().collect();
                Ok(Z3Term::Bool(z3::ast::Bool::or(&refs)))
            }
            Term::Implies(lhs, rhs) => {
                let l = self.translate(lhs)?.into_bool()?;
                let r = self.translate(rhs)?.into_bool()?;
                Ok(Z3Term::Bool(l.implies(&r)))
            }
            Term::Ite(cond, then, els) => {
                let c = self.translate(cond)?.into_bool()?;
                let t = self.translate(then)?;
                let e = self.translate(els)?;
                match (t, e) {
                    (Z3Term::Int(ti), Z3Term::Int(ei)) => Ok(Z3Term::Int(c.ite(&ti, &ei))),
                    (Z3Term::Bool(tb), Z3Term::Bool(eb)) => Ok(Z3Term::Bool(c.ite(&tb, &eb))),
                    _ => Err(SessionError::SortMismatch("ite branches".into())),
                }
            }
            Term::Eq(lhs, rhs) => {
                let l = self.translate(lhs)?;
                let r = self.translate(rhs)?;
                match (l, r) {
                    (Z3Term::Int(li), Z3Term::Int(ri)) => Ok(Z3Term::Bool(li.eq(&ri))),
                    (Z3Term::Bool(lb), Z3Term::Bool(rb)) => Ok(Z3Term::Bool(lb.eq(&rb))),
                    _ => Err(SessionError::SortMismatch("equality operands".into())),
                }
            }
            Term::Lt(lhs, rhs) => {
                let l = self.translate(lhs)?.into_int()?;
                let r = self.translate(rhs)?.into_int()?;
                Ok(Z3Term::Bool(l.lt(&r)))
            }
            Term::Le(lhs, rhs) => {
                let l = self.translate(lhs)?.into_int()?;
                let r = self.translate(rhs)?.into_int()?;
                Ok(Z3Term::Bool(l.le(&r)))
            }
            Term::Gt(lhs, rhs) => {
                let l = self.translate(lhs)?.into_int()?;
                let r = self.translate(rhs)?.into_int()?;
                Ok(Z3Term::Bool(l.gt(&r)))
            }
            Term::Ge(lhs, rhs) => {
                let l = self.translate(lhs)?.into_int()?;
                let r = self.translate(rhs)?.into_int()?;
                Ok(Z3Term::Bool(l.ge(&r)))
            }
            Term::Add(lhs, rhs) => {
                let l = self.translate(lhs)?.into_int()?;
                let r = self.translate(rhs)?.into_int()?;
                Ok(Z3Term::Int(&l + &r))
            }
            Term::Sub(lhs, rhs) => {
                let l = self.translate(lhs)?.into_int()?;
                let r = self.translate(rhs)?.into_int()?;
                Ok(Z3Term::Int(&l - &r))
            }
            Term::Mul(lhs, rhs) => {
                let l = self.translate(lhs)?.into_int()?;
                let r = self.translate(rhs)?.into_int()?;
                Ok(Z3Term::Int(&l * &r))
            }
        }
    }
}

enum Z3Term {
    Int(z3::ast::Int),
    Bool(z3::ast::Bool),
}

impl Z3Term {
    fn into_int(self) -> Result<z3::ast::Int, SessionError> {
        match self {
            Z3Term::Int(i) => Ok(i),
            Z3Term::Bool(_) => Err(SessionError::SortMismatch("expected Int, got Bool".into())),
        }
    }

    fn into_bool(self) -> Result<z3::ast::Bool, SessionError> {
        match self {
            Z3Term::Bool(b) => Ok(b),
            Z3Term::Int(_) => Err(SessionError::SortMismatch("expected Bool, got Int".into())),
        }
    }
}

impl Default for Z3Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session for Z3Session {
    fn declare(&mut self, name: &str, sort: Sort) -> Result<(), SessionError> {
        match sort {
            Sort::Int => {
                let v = z3::ast::Int::new_const(name);
                self.int_vars.insert(name.to_string(), v);
            }
            Sort::Bool => {
                let v = z3::ast::Bool::new_const(name);
                self.bool_vars.insert(name.to_string(), v);
            }
        }
        Ok(())
    }

    fn assert(&mut self, term: &Term) -> Result<(), SessionError> {
        let translated = self.translate(term)?.into_bool()?;
        self.solver.assert(&translated);
        Ok(())
    }

    fn check_sat(&mut self) -> Result<SatResult, SessionError> {
        let verdict = self.solver.check();
        log::debug!("check-sat -> {verdict:?}");
        match verdict {
            z3::SatResult::Sat => Ok(SatResult::Sat),
            z3::SatResult::Unsat => Ok(SatResult::Unsat),
            z3::SatResult::Unknown => Ok(SatResult::Unknown(
                self.solver
                    .get_reason_unknown()
                    .unwrap_or_else(|| "solver returned unknown".to_string()),
            )),
        }
    }

    fn model(&mut self) -> Result<Model, SessionError> {
        let z3_model = self
            .solver
            .get_model()
            .ok_or_else(|| SessionError::ModelUnavailable("no prior sat result".into()))?;

        let mut model = Model::default();
        for (name, v) in &self.bool_vars {
            // No model completion: uninterpreted variables stay absent.
            if let Some(val) = z3_model.eval::<z3::ast::Bool>(v, false) {
                if let Some(b) = val.as_bool() {
                    model.values.insert(name.clone(), Value::Bool(b));
                }
            }
        }
        for (name, v) in &self.int_vars {
            if let Some(val) = z3_model.eval::<z3::ast::Int>(v, false) {
                if let Some(n) = val.as_i64() {
                    model.values.insert(name.clone(), Value::Int(n));
                }
            }
        }
        Ok(model)
    }
}
