//! The synthesis oracle boundary: what the learner sends, what comes back.
use crate::engine::Expr;
use crate::grammar::Grammar;
use crate::task::Task;
use crate::types::Type;
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("oracle unavailable: {0}")]
    Unavailable(String),
    #[error("oracle timed out")]
    Timeout,
}

/// Recognition model the oracle may use to guide search. Passed through untouched.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FeatureExtractor {
    Learned { hidden: usize },
    None,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SearchConfig {
    pub enumeration_timeout: Duration,
    pub iterations: usize,
    pub maximum_frontier: usize,
    pub feature_extractor: FeatureExtractor,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            enumeration_timeout: Duration::from_secs(5),
            iterations: 1,
            maximum_frontier: 5,
            feature_extractor: FeatureExtractor::None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct FrontierEntry {
    pub program: Expr,
    pub log_prior: f64,
    pub log_likelihood: f64,
}

impl FrontierEntry {
    pub fn new(program: Expr, log_prior: f64, log_likelihood: f64) -> Self {
        Self { program, log_prior, log_likelihood }
    }

    pub fn log_posterior(&self) -> f64 {
        self.log_prior + self.log_likelihood
    }
}

/// Ranked candidate programs for one task.
#[derive(Clone, Debug)]
pub struct Frontier {
    pub task: String,
    pub request: Type,
    pub entries: Vec<FrontierEntry>,
}

impl Frontier {
    pub fn empty(task: &Task) -> Self {
        Self { task: task.name.clone(), request: task.request.clone(), entries: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn best_posterior(&self) -> Option<&FrontierEntry> {
        self.entries
            .iter()
            .max_by(|a, b| a.log_posterior().total_cmp(&b.log_posterior()))
    }

    /// Sort best-first and keep at most `n` entries.
    pub fn keep_best(&mut self, n: usize) {
        self.entries
            .sort_by(|a, b| b.log_posterior().total_cmp(&a.log_posterior()));
        self.entries.truncate(n);
    }
}

/// Programs the oracle found while exploring, reusable by later calls as long
/// as neither the grammar nor the set of requested types has changed.
#[derive(Clone, Debug)]
pub struct ExplorationSamples {
    pub grammar_version: u64,
    pub requests: BTreeSet<Type>,
    pub programs: Vec<Expr>,
}

impl ExplorationSamples {
    pub fn is_valid_for(&self, grammar: &Grammar, requests: &BTreeSet<Type>) -> bool {
        self.grammar_version == grammar.version() && &self.requests == requests
    }
}

#[derive(Clone, Debug, Default)]
pub struct SearchResult {
    /// Frontiers of tasks that received at least one program, keyed by task name.
    pub task_solutions: BTreeMap<String, Frontier>,
    pub all_frontiers: BTreeMap<String, Frontier>,
    pub exploration: Option<ExplorationSamples>,
}

pub trait SynthesisOracle {
    fn search(
        &mut self,
        grammar: &Grammar,
        tasks: &[Task],
        config: &SearchConfig,
        exploration: Option<&ExplorationSamples>,
    ) -> Result<SearchResult, OracleError>;
}

/// Set of request types across a batch of tasks.
pub fn requests(tasks: &[Task]) -> BTreeSet<Type> {
    tasks.iter().map(|t| t.request.clone()).collect()
}
