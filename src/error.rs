use crate::parser::ParseError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SemanticsError {
    #[error("saved model has {found} symbols, learner has {expected}")]
    ModelShape { expected: usize, found: usize },
    #[error("saved program does not parse: {0}")]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SemanticsError>;
