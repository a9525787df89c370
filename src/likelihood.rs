use crate::program::Executable;
use crate::value::Example;

/// Divisor scale for the small-sample penalty: a program of arity `a` scored on
/// `n` examples is divided by `max(1, penalty * a / n)`.
pub const DEFAULT_ARITY_PENALTY: f64 = 10.0;

#[derive(Clone, Debug, PartialEq)]
pub struct Score {
    pub likelihood: f64,
    /// Per-example exact-match flags, `None` for an empty example set.
    pub correct: Option<Vec<bool>>,
}

impl Score {
    pub fn empty() -> Self {
        Self { likelihood: 0.0, correct: None }
    }

    pub fn n_incorrect(&self) -> usize {
        self.correct
            .as_ref()
            .map(|c| c.iter().filter(|ok| !**ok).count())
            .unwrap_or(0)
    }
}

pub fn score<P: Executable + ?Sized>(program: &P, examples: &[Example], weighted: bool) -> Score {
    let penalty = if weighted { Some(DEFAULT_ARITY_PENALTY) } else { None };
    score_with_penalty(program, examples, penalty)
}

/// Fraction of examples the program reproduces exactly, optionally discounted
/// for high arity on few examples.
pub fn score_with_penalty<P: Executable + ?Sized>(
    program: &P,
    examples: &[Example],
    arity_penalty: Option<f64>,
) -> Score {
    if examples.is_empty() {
        return Score::empty();
    }
    let correct: Vec<bool> = examples
        .iter()
        .map(|ex| program.evaluate(&ex.inputs) == ex.output)
        .collect();
    let hits = correct.iter().filter(|ok| **ok).count();
    let mut likelihood = hits as f64 / examples.len() as f64;
    if let Some(penalty) = arity_penalty {
        let coef = (penalty * program.arity() as f64 / examples.len() as f64).max(1.0);
        likelihood /= coef;
    }
    Score { likelihood, correct: Some(correct) }
}
