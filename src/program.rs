//! Candidate programs wrapped for memoized evaluation and equivalence checks.
use crate::engine::{evaluate, unparse, EvalContext, EvalError, Expr};
use crate::parser::{parse_program, ParseError};
use crate::value::Value;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Description shared by every ground-truth program. Never equal to anything.
pub const GROUND_TRUTH: &str = "GT";
pub const NULL_DESCRIPTION: &str = "NULL";

/// The capability every program offers to scoring and symbol state.
pub trait Executable {
    fn arity(&self) -> usize;

    /// Output for `inputs`, or `Value::Missing` when the program cannot produce one.
    fn evaluate(&self, inputs: &[Value]) -> Value;

    /// Structural description used for equivalence.
    fn description(&self) -> &str;
}

pub type NativeFn = Rc<dyn Fn(&[Value]) -> Result<Value, EvalError>>;

#[derive(Clone)]
pub enum ProgramBody {
    Lambda(Expr),
    Native(NativeFn),
    Constant(Value),
}

#[derive(Clone)]
pub struct CachedProgram {
    body: ProgramBody,
    arity: usize,
    description: String,
    constant: Option<Value>,
    memo: RefCell<FxHashMap<SmallVec<[Value; 2]>, Value>>,
}

impl CachedProgram {
    pub fn new(expr: Expr) -> Self {
        let arity = expr.arity();
        let description = unparse(&expr);
        let constant = if arity == 0 {
            let mut ctx = EvalContext::default();
            evaluate(&expr, &[], &mut ctx).ok()
        } else {
            None
        };
        Self::with_body(ProgramBody::Lambda(expr), arity, description, constant)
    }

    pub fn parse(text: &str) -> Result<Self, ParseError> {
        parse_program(text).map(Self::new)
    }

    pub fn constant(value: Value) -> Self {
        let description = value.to_string();
        Self::with_body(ProgramBody::Constant(value.clone()), 0, description, Some(value))
    }

    /// A reference implementation supplied by the domain. Used for pinned symbols
    /// and accuracy diagnostics; it never takes part in equivalence merges.
    pub fn ground_truth<F>(arity: usize, f: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, EvalError> + 'static,
    {
        let f: NativeFn = Rc::new(f);
        let constant = if arity == 0 { f(&[]).ok() } else { None };
        Self::with_body(ProgramBody::Native(f), arity, GROUND_TRUTH.to_string(), constant)
    }

    fn with_body(body: ProgramBody, arity: usize, description: String, constant: Option<Value>) -> Self {
        Self {
            body,
            arity,
            description,
            constant: constant.filter(|v| !v.is_missing()),
            memo: RefCell::new(FxHashMap::default()),
        }
    }

    pub fn expr(&self) -> Option<&Expr> {
        match &self.body {
            ProgramBody::Lambda(e) => Some(e),
            _ => None,
        }
    }

    pub fn body(&self) -> &ProgramBody {
        &self.body
    }

    pub fn constant_value(&self) -> Option<&Value> {
        self.constant.as_ref()
    }

    pub fn is_ground_truth(&self) -> bool {
        self.description == GROUND_TRUTH
    }

    /// Short name: the constant value, or `fn`.
    pub fn name(&self) -> String {
        match &self.constant {
            Some(v) => v.to_string(),
            None => "fn".to_string(),
        }
    }

    pub fn memo_len(&self) -> usize {
        self.memo.borrow().len()
    }

    fn run(&self, inputs: &[Value]) -> Result<Value, EvalError> {
        match &self.body {
            ProgramBody::Lambda(expr) => {
                let mut ctx = EvalContext::default();
                evaluate(expr, inputs, &mut ctx)
            }
            ProgramBody::Native(f) => f(inputs),
            ProgramBody::Constant(v) => Ok(v.clone()),
        }
    }
}

impl Executable for CachedProgram {
    fn arity(&self) -> usize {
        self.arity
    }

    fn evaluate(&self, inputs: &[Value]) -> Value {
        if inputs.len() != self.arity || inputs.iter().any(Value::is_missing) {
            return Value::Missing;
        }
        if let Some(v) = self.memo.borrow().get(inputs) {
            return v.clone();
        }
        let out = match self.run(inputs) {
            Ok(v) => v,
            Err(err) => {
                log::trace!("{} failed on {:?}: {}", self.description, inputs, err);
                Value::Missing
            }
        };
        let key: SmallVec<[Value; 2]> = inputs.iter().cloned().collect();
        self.memo.borrow_mut().insert(key, out.clone());
        out
    }

    fn description(&self) -> &str {
        &self.description
    }
}

impl PartialEq for CachedProgram {
    fn eq(&self, other: &Self) -> bool {
        if self.arity != other.arity {
            return false;
        }
        if let (Some(a), Some(b)) = (&self.constant, &other.constant) {
            return a == b;
        }
        if self.is_ground_truth() || other.is_ground_truth() {
            return false;
        }
        self.description == other.description
    }
}

impl fmt::Display for CachedProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name(), self.description)
    }
}

impl fmt::Debug for CachedProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CachedProgram({}, arity={})", self.description, self.arity)
    }
}

/// A symbol's current explanation: nothing yet, or a wrapped program.
#[derive(Clone, Debug, Default)]
pub enum Program {
    #[default]
    Null,
    Cached(CachedProgram),
}

impl Program {
    pub fn is_null(&self) -> bool {
        matches!(self, Program::Null)
    }

    pub fn as_cached(&self) -> Option<&CachedProgram> {
        match self {
            Program::Cached(p) => Some(p),
            Program::Null => None,
        }
    }

    /// Intensional equivalence; the null program is equivalent to nothing.
    pub fn equivalent(&self, other: &Program) -> bool {
        match (self, other) {
            (Program::Cached(a), Program::Cached(b)) => a == b,
            _ => false,
        }
    }
}

impl From<CachedProgram> for Program {
    fn from(p: CachedProgram) -> Self {
        Program::Cached(p)
    }
}

impl Executable for Program {
    fn arity(&self) -> usize {
        match self {
            Program::Null => 0,
            Program::Cached(p) => p.arity(),
        }
    }

    fn evaluate(&self, inputs: &[Value]) -> Value {
        match self {
            Program::Null if inputs.is_empty() => Value::Empty,
            Program::Null => Value::Missing,
            Program::Cached(p) => p.evaluate(inputs),
        }
    }

    fn description(&self) -> &str {
        match self {
            Program::Null => NULL_DESCRIPTION,
            Program::Cached(p) => p.description(),
        }
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Program::Null => f.write_str(NULL_DESCRIPTION),
            Program::Cached(p) => fmt::Display::fmt(p, f),
        }
    }
}
