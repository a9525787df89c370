use crate::types::Type;
use crate::value::Example;
use std::fmt;

/// A typed input/output problem handed to the synthesis oracle.
///
/// The name is the owning symbol's index, so results can be routed back.
#[derive(Clone, Debug, PartialEq)]
pub struct Task {
    pub name: String,
    pub request: Type,
    pub examples: Vec<Example>,
}

impl Task {
    pub fn new(name: impl Into<String>, request: Type, examples: Vec<Example>) -> Self {
        Self { name: name.into(), request, examples }
    }

    pub fn for_symbol(idx: usize, request: Type, examples: Vec<Example>) -> Self {
        Self::new(idx.to_string(), request, examples)
    }

    pub fn symbol_idx(&self) -> Option<usize> {
        self.name.parse().ok()
    }

    pub fn arity(&self) -> usize {
        self.request.arity()
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.symbol_idx() {
            Some(idx) => write!(f, "Symbol-{:02} ({}), Samples: {:3}", idx, self.request, self.examples.len())?,
            None => write!(f, "{} ({}), Samples: {:3}", self.name, self.request, self.examples.len())?,
        }
        for ex in self.examples.iter().take(10) {
            write!(f, " {}", ex)?;
        }
        Ok(())
    }
}
