pub mod engine;
pub mod error;
pub mod grammar;
pub mod learner;
pub mod likelihood;
pub mod oracle;
pub mod parser;
pub mod program;
pub mod semantics;
pub mod task;
pub mod types;
pub mod value;

pub use error::{Result, SemanticsError};
pub use learner::{Learner, LearnerConfig, RoundReport, SymbolSpec, Vocabulary};
pub use program::{CachedProgram, Executable, Program};
pub use semantics::{SavedSemantics, Semantics};
pub use value::{Example, Value};
