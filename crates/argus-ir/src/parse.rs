//! Structural parser for the constraint file.
//!
//! The instrumenter hands over an SMT-LIB 2 script. The solver owns the full
//! language; preprocessing only needs the structure back out of it, namely
//! the ordered symbol declarations and the ordered assert terms. Script
//! commands that carry no structure (`set-logic`, `check-sat`, ...) are
//! skipped.

use crate::term::{Sort, Term};

#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    #[error("unexpected end of input")]
    UnexpectedEof,

    #[error("unexpected token '{0}'")]
    UnexpectedToken(String),

    #[error("unsupported sort '{0}'")]
    UnsupportedSort(String),

    #[error("unsupported command '{0}'")]
    UnsupportedCommand(String),

    #[error("malformed term: {0}")]
    MalformedTerm(String),
}

/// A declared symbol, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub name: String,
    pub sort: Sort,
}

/// The structural content of a constraint file: ordered declarations and
/// ordered assert terms.
#[derive(Debug, Clone, PartialEq)]
pub struct Script {
    pub declarations: Vec<Declaration>,
    pub constraints: Vec<Term>,
}

pub fn parse_script(input: &str) -> Result<Script, ScriptError> {
    let tokens = tokenize(input);
    let mut reader = Reader {
        tokens: &tokens,
        pos: 0,
    };

    let mut script = Script {
        declarations: Vec::new(),
        constraints: Vec::new(),
    };

    while !reader.at_end() {
        let sexpr = reader.read()?;
        apply_command(&sexpr, &mut script)?;
    }

    Ok(script)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    LParen,
    RParen,
    Atom(String),
}

fn tokenize(input: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            ';' => {
                // Comment to end of line.
                for c in chars.by_ref() {
                    if c == '\n' {
                        break;
                    }
                }
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            c if c.is_whitespace() => {
                chars.next();
            }
            _ => {
                let mut atom = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_whitespace() || c == '(' || c == ')' || c == ';' {
                        break;
                    }
                    atom.push(c);
                    chars.next();
                }
                tokens.push(Token::Atom(atom));
            }
        }
    }

    tokens
}

#[derive(Debug, Clone, PartialEq)]
enum SExpr {
    Atom(String),
    List(Vec<SExpr>),
}

impl SExpr {
    fn atom(&self) -> Option<&str> {
        match self {
            SExpr::Atom(s) => Some(s),
            SExpr::List(_) => None,
        }
    }
}

struct Reader<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl Reader<'_> {
    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn read(&mut self) -> Result<SExpr, ScriptError> {
        match self.tokens.get(self.pos) {
            None => Err(ScriptError::UnexpectedEof),
            Some(Token::Atom(s)) => {
                self.pos += 1;
                Ok(SExpr::Atom(s.clone()))
            }
            Some(Token::RParen) => Err(ScriptError::UnexpectedToken(")".into())),
            Some(Token::LParen) => {
                self.pos += 1;
                let mut items = Vec::new();
                loop {
                    match self.tokens.get(self.pos) {
                        None => return Err(ScriptError::UnexpectedEof),
                        Some(Token::RParen) => {
                            self.pos += 1;
                            return Ok(SExpr::List(items));
                        }
                        Some(_) => items.push(self.read()?),
                    }
                }
            }
        }
    }
}

fn apply_command(sexpr: &SExpr, script: &mut Script) -> Result<(), ScriptError> {
    let SExpr::List(items) = sexpr else {
        return Err(ScriptError::MalformedTerm(format!(
            "top-level atom '{}'",
            sexpr.atom().unwrap_or_default()
        )));
    };
    let head = items
        .first()
        .and_then(SExpr::atom)
        .ok_or(ScriptError::UnexpectedEof)?;

    match head {
        "declare-fun" => {
            // (declare-fun name () Sort) — only nullary symbols occur.
            let [_, name, args, sort] = items.as_slice() else {
                return Err(ScriptError::MalformedTerm("declare-fun arity".into()));
            };
            if !matches!(args, SExpr::List(a) if a.is_empty()) {
                return Err(ScriptError::UnsupportedCommand(
                    "declare-fun with parameters".into(),
                ));
            }
            script.declarations.push(parse_declaration(name, sort)?);
        }
        "declare-const" => {
            let [_, name, sort] = items.as_slice() else {
                return Err(ScriptError::MalformedTerm("declare-const arity".into()));
            };
            script.declarations.push(parse_declaration(name, sort)?);
        }
        "assert" => {
            let [_, body] = items.as_slice() else {
                return Err(ScriptError::MalformedTerm("assert arity".into()));
            };
            script.constraints.push(parse_term(body)?);
        }
        // No structural content.
        "set-logic" | "set-option" | "set-info" | "check-sat" | "get-model" | "get-value"
        | "exit" => {}
        other => return Err(ScriptError::UnsupportedCommand(other.to_string())),
    }
    Ok(())
}

fn parse_declaration(name: &SExpr, sort: &SExpr) -> Result<Declaration, ScriptError> {
    let name = name
        .atom()
        .ok_or_else(|| ScriptError::MalformedTerm("declaration name".into()))?;
    let sort = match sort.atom() {
        Some("Bool") => Sort::Bool,
        Some("Int") => Sort::Int,
        Some(other) => return Err(ScriptError::UnsupportedSort(other.to_string())),
        None => return Err(ScriptError::UnsupportedSort(format!("{sort:?}"))),
    };
    Ok(Declaration {
        name: name.to_string(),
        sort,
    })
}

fn parse_term(sexpr: &SExpr) -> Result<Term, ScriptError> {
    match sexpr {
        SExpr::Atom(atom) => Ok(parse_atom(atom)),
        SExpr::List(items) => {
            let head = items
                .first()
                .and_then(SExpr::atom)
                .ok_or_else(|| ScriptError::MalformedTerm("application head".into()))?;
            let args: Vec<Term> = items[1..]
                .iter()
                .map(parse_term)
                .collect::<Result<_, _>>()?;
            parse_application(head, args)
        }
    }
}

fn parse_atom(atom: &str) -> Term {
    match atom {
        "true" => Term::BoolLit(true),
        "false" => Term::BoolLit(false),
        _ => match atom.parse::<i64>() {
            Ok(n) => Term::IntLit(n),
            Err(_) => Term::Var(atom.to_string()),
        },
    }
}

fn parse_application(op: &str, mut args: Vec<Term>) -> Result<Term, ScriptError> {
    let arity = |n: usize, args: &[Term]| {
        if args.len() == n {
            Ok(())
        } else {
            Err(ScriptError::MalformedTerm(format!(
                "'{op}' expects {n} operands, got {}",
                args.len()
            )))
        }
    };

    match op {
        "not" => {
            arity(1, &args)?;
            Ok(args.remove(0).not())
        }
        "and" => Ok(Term::And(args)),
        "or" => Ok(Term::Or(args)),
        "=>" => binary(op, args, Term::implies),
        "ite" => {
            arity(3, &args)?;
            let e = Box::new(args.remove(2));
            let t = Box::new(args.remove(1));
            let c = Box::new(args.remove(0));
            Ok(Term::Ite(c, t, e))
        }
        "=" => binary(op, args, Term::eq),
        "distinct" => Ok(binary(op, args, Term::eq)?.not()),
        "<" => binary(op, args, Term::lt),
        "<=" => binary(op, args, Term::le),
        ">" => binary(op, args, Term::gt),
        ">=" => binary(op, args, Term::ge),
        "+" => fold_left(op, args, Term::add),
        "*" => fold_left(op, args, Term::mul),
        "-" => match args.len() {
            // Unary minus: a negative literal or 0 - t.
            1 => Ok(match args.remove(0) {
                Term::IntLit(n) => Term::IntLit(-n),
                t => Term::int(0).sub(t),
            }),
            _ => fold_left(op, args, Term::sub),
        },
        other => Err(ScriptError::MalformedTerm(format!(
            "unknown operator '{other}'"
        ))),
    }
}

fn binary(
    op: &str,
    mut args: Vec<Term>,
    build: impl Fn(Term, Term) -> Term,
) -> Result<Term, ScriptError> {
    if args.len() != 2 {
        return Err(ScriptError::MalformedTerm(format!(
            "'{op}' expects 2 operands, got {}",
            args.len()
        )));
    }
    let rhs = args.pop();
    let lhs = args.pop();
    match (lhs, rhs) {
        (Some(lhs), Some(rhs)) => Ok(build(lhs, rhs)),
        _ => unreachable!("length checked above"),
    }
}

fn fold_left(
    op: &str,
    args: Vec<Term>,
    build: impl Fn(Term, Term) -> Term,
) -> Result<Term, ScriptError> {
    let mut iter = args.into_iter();
    let first = iter
        .next()
        .ok_or_else(|| ScriptError::MalformedTerm(format!("'{op}' expects operands")))?;
    Ok(iter.fold(first, build))
}
