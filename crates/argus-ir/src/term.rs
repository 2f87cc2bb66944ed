use serde::{Deserialize, Serialize};

/// Sort of a declared symbol. The constraint encodings this system consumes
/// only ever declare booleans and mathematical integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sort {
    Bool,
    Int,
}

impl std::fmt::Display for Sort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Sort::Bool => write!(f, "Bool"),
            Sort::Int => write!(f, "Int"),
        }
    }
}

/// Solver-agnostic formula term.
///
/// Covers the fragment the instrumenter emits: quantifier-free boolean
/// structure over equalities, linear integer comparisons and arithmetic.
#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    /// Variable reference by name.
    Var(String),
    /// Integer literal.
    IntLit(i64),
    /// Boolean literal.
    BoolLit(bool),

    // Boolean logic
    Not(Box<Term>),
    And(Vec<Term>),
    Or(Vec<Term>),
    Implies(Box<Term>, Box<Term>),
    Ite(Box<Term>, Box<Term>, Box<Term>),

    // Comparison
    Eq(Box<Term>, Box<Term>),
    Lt(Box<Term>, Box<Term>),
    Le(Box<Term>, Box<Term>),
    Gt(Box<Term>, Box<Term>),
    Ge(Box<Term>, Box<Term>),

    // Arithmetic
    Add(Box<Term>, Box<Term>),
    Sub(Box<Term>, Box<Term>),
    Mul(Box<Term>, Box<Term>),
}

#[allow(clippy::should_implement_trait)]
impl Term {
    pub fn var(name: impl Into<String>) -> Self {
        Term::Var(name.into())
    }

    pub fn int(n: i64) -> Self {
        Term::IntLit(n)
    }

    pub fn bool(b: bool) -> Self {
        Term::BoolLit(b)
    }

    pub fn not(self) -> Self {
        Term::Not(Box::new(self))
    }

    pub fn and(terms: Vec<Term>) -> Self {
        Term::And(terms)
    }

    pub fn or(terms: Vec<Term>) -> Self {
        Term::Or(terms)
    }

    pub fn implies(self, other: Term) -> Self {
        Term::Implies(Box::new(self), Box::new(other))
    }

    pub fn eq(self, other: Term) -> Self {
        Term::Eq(Box::new(self), Box::new(other))
    }

    pub fn lt(self, other: Term) -> Self {
        Term::Lt(Box::new(self), Box::new(other))
    }

    pub fn le(self, other: Term) -> Self {
        Term::Le(Box::new(self), Box::new(other))
    }

    pub fn gt(self, other: Term) -> Self {
        Term::Gt(Box::new(self), Box::new(other))
    }

    pub fn ge(self, other: Term) -> Self {
        Term::Ge(Box::new(self), Box::new(other))
    }

    pub fn add(self, other: Term) -> Self {
        Term::Add(Box::new(self), Box::new(other))
    }

    pub fn sub(self, other: Term) -> Self {
        Term::Sub(Box::new(self), Box::new(other))
    }

    pub fn mul(self, other: Term) -> Self {
        Term::Mul(Box::new(self), Box::new(other))
    }

    /// The variable name if this term is a plain reference.
    pub fn as_var(&self) -> Option<&str> {
        match self {
            Term::Var(name) => Some(name),
            _ => None,
        }
    }

    pub fn is_or(&self) -> bool {
        matches!(self, Term::Or(_))
    }

    /// Immediate subterms, in operator-argument order.
    pub fn operands(&self) -> Vec<&Term> {
        match self {
            Term::Var(_) | Term::IntLit(_) | Term::BoolLit(_) => vec![],
            Term::Not(a) => vec![a],
            Term::And(args) | Term::Or(args) => args.iter().collect(),
            Term::Implies(a, b)
            | Term::Eq(a, b)
            | Term::Lt(a, b)
            | Term::Le(a, b)
            | Term::Gt(a, b)
            | Term::Ge(a, b)
            | Term::Add(a, b)
            | Term::Sub(a, b)
            | Term::Mul(a, b) => vec![a, b],
            Term::Ite(c, t, e) => vec![c, t, e],
        }
    }

    /// First operand of a composite term, if any.
    pub fn first_operand(&self) -> Option<&Term> {
        self.operands().first().copied()
    }

    /// Visit every variable reference in the term, depth-first.
    pub fn visit_vars(&self, visit: &mut impl FnMut(&str)) {
        if let Term::Var(name) = self {
            visit(name);
        }
        for operand in self.operands() {
            operand.visit_vars(visit);
        }
    }
}

impl std::fmt::Display for Term {
    /// Renders the term in SMT-LIB syntax, for diagnostics.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn write_app(
            f: &mut std::fmt::Formatter<'_>,
            op: &str,
            args: &[&Term],
        ) -> std::fmt::Result {
            write!(f, "({op}")?;
            for arg in args {
                write!(f, " {arg}")?;
            }
            write!(f, ")")
        }

        match self {
            Term::Var(name) => write!(f, "{name}"),
            Term::IntLit(n) if *n < 0 => write!(f, "(- {})", n.unsigned_abs()),
            Term::IntLit(n) => write!(f, "{n}"),
            Term::BoolLit(b) => write!(f, "{b}"),
            Term::And(args) if args.is_empty() => write!(f, "true"),
            Term::Or(args) if args.is_empty() => write!(f, "false"),
            Term::Not(_) => write_app(f, "not", &self.operands()),
            Term::And(_) => write_app(f, "and", &self.operands()),
            Term::Or(_) => write_app(f, "or", &self.operands()),
            Term::Implies(_, _) => write_app(f, "=>", &self.operands()),
            Term::Ite(_, _, _) => write_app(f, "ite", &self.operands()),
            Term::Eq(_, _) => write_app(f, "=", &self.operands()),
            Term::Lt(_, _) => write_app(f, "<", &self.operands()),
            Term::Le(_, _) => write_app(f, "<=", &self.operands()),
            Term::Gt(_, _) => write_app(f, ">", &self.operands()),
            Term::Ge(_, _) => write_app(f, ">=", &self.operands()),
            Term::Add(_, _) => write_app(f, "+", &self.operands()),
            Term::Sub(_, _) => write_app(f, "-", &self.operands()),
            Term::Mul(_, _) => write_app(f, "*", &self.operands()),
        }
    }
}
