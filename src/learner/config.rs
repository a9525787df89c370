use crate::engine::Expr;
use crate::learner::policy::{EveryNth, ForbiddenMarkers, PromotionGuard, Schedule};
use crate::likelihood::DEFAULT_ARITY_PENALTY;
use crate::oracle::FeatureExtractor;
use crate::parser::parse_program;
use std::default::Default;
use std::time::Duration;

/// Thresholds governing one symbol's evidence and acceptance rules.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SemanticsConfig {
    // Multiplier applied to every cached weight at the start of an update.
    pub decay: f64,
    pub min_confidence: f64,
    // The majority output must hold strictly more than this share of the weight.
    pub majority_share: f64,
    pub solved_threshold: f64,
    pub min_task_examples: usize,
    pub max_task_examples: usize,
    pub arity_penalty: f64,
    // Above this likelihood `apply` trusts the program over the raw cache.
    pub sample_threshold: f64,
}

impl Default for SemanticsConfig {
    fn default() -> Self {
        Self {
            decay: 0.5,
            min_confidence: 1.0,
            majority_share: 0.5,
            solved_threshold: 0.95,
            min_task_examples: 1,
            max_task_examples: 100,
            arity_penalty: DEFAULT_ARITY_PENALTY,
            sample_threshold: 0.5,
        }
    }
}

pub struct LearnerConfig {
    pub seed: u64,
    pub schedule: Box<dyn Schedule>,
    pub promotion_guard: Box<dyn PromotionGuard>,
    pub update_grammar: bool,
    // Keep `fix` in the base grammar.
    pub y_combinator: bool,
    pub rescore_frontiers: bool,
    // Oracle budget when some task has arguments, and when all are constants.
    pub long_timeout: Duration,
    pub short_timeout: Duration,
    pub iterations: usize,
    pub maximum_frontier: usize,
    pub feature_extractor: FeatureExtractor,
    pub canonical_add: Expr,
    pub canonical_minus0: Expr,
    pub semantics: SemanticsConfig,
}

impl Default for LearnerConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            schedule: Box::new(EveryNth(5)),
            promotion_guard: Box::new(ForbiddenMarkers::default()),
            update_grammar: false,
            y_combinator: true,
            rescore_frontiers: false,
            long_timeout: Duration::from_secs(300),
            short_timeout: Duration::from_secs(5),
            iterations: 1,
            maximum_frontier: 5,
            feature_extractor: FeatureExtractor::Learned { hidden: 64 },
            canonical_add: canonical_add(),
            canonical_minus0: canonical_minus0(),
            semantics: SemanticsConfig::default(),
        }
    }
}

/// `add x y = x + y`
pub fn canonical_add() -> Expr {
    parse_program("(lambda (lambda (+ $1 $0)))").unwrap_or_else(|_| Expr::int(0))
}

/// `minus0 x y = max(x - y, 0)`
pub fn canonical_minus0() -> Expr {
    parse_program("(lambda (lambda (if (gt? $1 $0) (- $1 $0) 0)))").unwrap_or_else(|_| Expr::int(0))
}
