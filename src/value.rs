//! Observed values: scalars, fixed-length tuples and the two sentinels.
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

/// A single observed value.
///
/// `Empty` marks an absent argument in an input tuple (the "empty" marker of the
/// upstream parser). `Missing` is the failure sentinel returned whenever a
/// program cannot produce an output.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Value {
    Int(i64),
    Tuple(Vec<i64>),
    Empty,
    Missing,
}

impl Value {
    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    pub fn is_empty_marker(&self) -> bool {
        matches!(self, Value::Empty)
    }

    pub fn is_tuple(&self) -> bool {
        matches!(self, Value::Tuple(_))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<Vec<i64>> for Value {
    fn from(v: Vec<i64>) -> Self {
        Value::Tuple(v)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::Tuple(vs) => {
                f.write_str("(")?;
                for (idx, v) in vs.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                if vs.len() == 1 {
                    f.write_str(",")?;
                }
                f.write_str(")")
            }
            Value::Empty => f.write_str("EMPTY"),
            Value::Missing => f.write_str("MISSING"),
        }
    }
}

/// Input tuple of a symbol application. Most symbols take at most two arguments.
pub type Inputs = SmallVec<[Value; 2]>;

/// Build an `Inputs` tuple from anything convertible to `Value`.
pub fn inputs<I, V>(values: I) -> Inputs
where
    I: IntoIterator<Item = V>,
    V: Into<Value>,
{
    values.into_iter().map(Into::into).collect()
}

/// One observed `(inputs, output)` pair.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Example {
    pub inputs: Inputs,
    pub output: Value,
}

impl Example {
    pub fn new(inputs: Inputs, output: impl Into<Value>) -> Self {
        Self { inputs, output: output.into() }
    }

    pub fn arity(&self) -> usize {
        self.inputs.len()
    }
}

impl fmt::Display for Example {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (idx, v) in self.inputs.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", v)?;
        }
        write!(f, ") -> {}", self.output)
    }
}
