use crate::engine::primitives::Primitive;
use crate::engine::Expr;
use crate::value::Value;
use std::rc::Rc;
use thiserror::Error;

pub const DEFAULT_STEP_LIMIT: usize = 20_000;
pub const DEFAULT_DEPTH_LIMIT: usize = 200;

/// Why an evaluation produced no value. Callers outside the engine only ever
/// see these collapsed to `Value::Missing`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("expected {expected} arguments, got {found}")]
    ArityMismatch { expected: usize, found: usize },
    #[error("type mismatch in {0}")]
    TypeMismatch(&'static str),
    #[error("depth limit {0} exceeded")]
    DepthExceeded(usize),
    #[error("step limit {0} exceeded")]
    StepLimit(usize),
    #[error("index out of range in {0}")]
    IndexOutOfRange(&'static str),
    #[error("division by zero")]
    DivisionByZero,
    #[error("arithmetic overflow")]
    Overflow,
    #[error("unbound variable ${0}")]
    UnboundIndex(usize),
    #[error("missing input")]
    MissingInput,
}

pub struct EvalContext {
    pub step_limit: usize,
    pub steps: usize,
    pub depth: usize,
    pub depth_limit: usize,
}

impl Default for EvalContext {
    fn default() -> Self {
        Self {
            step_limit: DEFAULT_STEP_LIMIT,
            steps: 0,
            depth: 0,
            depth_limit: DEFAULT_DEPTH_LIMIT,
        }
    }
}

impl EvalContext {
    pub fn tick(&mut self) -> Result<(), EvalError> {
        self.steps += 1;
        if self.steps > self.step_limit {
            return Err(EvalError::StepLimit(self.step_limit));
        }
        Ok(())
    }

    pub fn enter(&mut self) -> Result<(), EvalError> {
        self.depth += 1;
        if self.depth > self.depth_limit {
            return Err(EvalError::DepthExceeded(self.depth_limit));
        }
        Ok(())
    }

    pub fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }
}

/// Runtime values inside the evaluator.
#[derive(Clone, Debug)]
pub enum RtValue {
    Int(i64),
    Bool(bool),
    List(Rc<Vec<i64>>),
    /// The empty-argument marker passed through unchanged; any primitive that
    /// inspects it fails.
    Empty,
    Closure { body: Rc<Expr>, env: Env },
    Partial { prim: Primitive, args: Vec<RtValue> },
    /// Recursive handle produced by `fix`: applying it to `x` re-enters `fix x f`.
    Recur(Rc<RtValue>),
}

impl RtValue {
    pub fn from_value(v: &Value) -> Result<Self, EvalError> {
        match v {
            Value::Int(i) => Ok(RtValue::Int(*i)),
            Value::Tuple(xs) => Ok(RtValue::List(Rc::new(xs.clone()))),
            Value::Empty => Ok(RtValue::Empty),
            Value::Missing => Err(EvalError::MissingInput),
        }
    }

    pub fn into_value(self) -> Result<Value, EvalError> {
        match self {
            RtValue::Int(i) => Ok(Value::Int(i)),
            RtValue::List(xs) => Ok(Value::Tuple(Rc::try_unwrap(xs).unwrap_or_else(|rc| (*rc).clone()))),
            RtValue::Empty => Ok(Value::Empty),
            RtValue::Bool(_) => Err(EvalError::TypeMismatch("boolean result")),
            _ => Err(EvalError::TypeMismatch("function result")),
        }
    }

    pub fn as_int(&self, site: &'static str) -> Result<i64, EvalError> {
        match self {
            RtValue::Int(i) => Ok(*i),
            _ => Err(EvalError::TypeMismatch(site)),
        }
    }

    pub fn as_bool(&self, site: &'static str) -> Result<bool, EvalError> {
        match self {
            RtValue::Bool(b) => Ok(*b),
            _ => Err(EvalError::TypeMismatch(site)),
        }
    }

    pub fn as_list(&self, site: &'static str) -> Result<&Rc<Vec<i64>>, EvalError> {
        match self {
            RtValue::List(xs) => Ok(xs),
            _ => Err(EvalError::TypeMismatch(site)),
        }
    }
}

/// De Bruijn environment; `$0` is the most recently bound value.
#[derive(Clone, Debug, Default)]
pub struct Env {
    frames: Rc<Vec<RtValue>>,
}

impl Env {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&self, v: RtValue) -> Env {
        let mut frames = (*self.frames).clone();
        frames.push(v);
        Env { frames: Rc::new(frames) }
    }

    pub fn lookup(&self, index: usize) -> Result<RtValue, EvalError> {
        let len = self.frames.len();
        if index >= len {
            return Err(EvalError::UnboundIndex(index));
        }
        Ok(self.frames[len - 1 - index].clone())
    }
}
