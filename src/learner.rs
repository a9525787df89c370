//! The online learning loop over a fixed vocabulary of symbols.
pub mod config;
pub mod policy;
pub mod search;

pub use config::{LearnerConfig, SemanticsConfig};
pub use search::{EnumerativeConfig, EnumerativeOracle};

use crate::engine::Expr;
use crate::error::{Result, SemanticsError};
use crate::grammar::{base_primitives, Grammar};
use crate::likelihood::score_with_penalty;
use crate::oracle::{requests, ExplorationSamples, Frontier, SearchConfig, SynthesisOracle};
use crate::program::{CachedProgram, Executable, Program};
use crate::semantics::{SavedSemantics, Semantics};
use crate::task::Task;
use crate::value::Example;
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::BTreeMap;

/// Frontier entries scoring below this on the new examples are dropped.
const RESCORE_FLOOR: f64 = 0.1;

/// One symbol of the vocabulary.
pub struct SymbolSpec {
    pub name: String,
    pub arity: usize,
    pub ground_truth: Option<CachedProgram>,
    pub learnable: bool,
}

impl SymbolSpec {
    pub fn learnable(name: impl Into<String>, arity: usize) -> Self {
        Self { name: name.into(), arity, ground_truth: None, learnable: true }
    }

    /// A symbol whose program is known and never learned. The program's arity
    /// becomes the symbol's arity.
    pub fn pinned(name: impl Into<String>, program: CachedProgram) -> Self {
        Self { name: name.into(), arity: program.arity(), ground_truth: Some(program), learnable: false }
    }

    pub fn with_ground_truth(mut self, program: CachedProgram) -> Self {
        self.ground_truth = Some(program);
        self
    }
}

#[derive(Default)]
pub struct Vocabulary {
    pub symbols: Vec<SymbolSpec>,
}

impl Vocabulary {
    pub fn new(symbols: Vec<SymbolSpec>) -> Self {
        Self { symbols }
    }

    pub fn push(&mut self, symbol: SymbolSpec) {
        self.symbols.push(symbol);
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

/// Summary of one `learn` call.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RoundReport {
    pub round: u64,
    pub tasks: usize,
    pub updated: usize,
    pub merged: usize,
    pub solved: usize,
    pub grammar_version: u64,
}

pub struct Learner {
    semantics: Vec<Semantics>,
    names: Vec<String>,
    base_primitives: Vec<Expr>,
    grammar: Grammar,
    frontiers: BTreeMap<String, Frontier>,
    exploration: Option<ExplorationSamples>,
    round: u64,
    rng: StdRng,
    config: LearnerConfig,
}

impl Learner {
    pub fn new(vocab: Vocabulary, config: LearnerConfig) -> Self {
        let mut semantics = Vec::with_capacity(vocab.len());
        let mut names = Vec::with_capacity(vocab.len());
        for (idx, symbol) in vocab.symbols.into_iter().enumerate() {
            let smt = match (symbol.learnable, symbol.ground_truth) {
                (false, Some(gt)) => Semantics::pinned(idx, gt, config.semantics),
                (_, gt) => {
                    let smt = Semantics::new(idx, symbol.arity, config.semantics);
                    match gt {
                        Some(gt) => smt.with_ground_truth(gt),
                        None => smt,
                    }
                }
            };
            semantics.push(smt);
            names.push(symbol.name);
        }
        let base_primitives = base_primitives(config.y_combinator);
        let grammar = Grammar::uniform(base_primitives.clone(), 0);
        Self {
            semantics,
            names,
            base_primitives,
            grammar,
            frontiers: BTreeMap::new(),
            exploration: None,
            round: 0,
            rng: StdRng::seed_from_u64(config.seed),
            config,
        }
    }

    pub fn semantics(&self) -> &[Semantics] {
        &self.semantics
    }

    pub fn semantics_mut(&mut self) -> &mut [Semantics] {
        &mut self.semantics
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    pub fn frontiers(&self) -> &BTreeMap<String, Frontier> {
        &self.frontiers
    }

    pub fn exploration(&self) -> Option<&ExplorationSamples> {
        self.exploration.as_ref()
    }

    pub fn round(&self) -> u64 {
        self.round
    }

    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    pub fn config(&self) -> &LearnerConfig {
        &self.config
    }

    /// One round: absorb observations, and on due rounds ask the oracle for
    /// better programs. `dataset[i]` holds this round's observations of symbol `i`.
    pub fn learn(&mut self, dataset: &[Vec<Example>], oracle: &mut dyn SynthesisOracle) -> RoundReport {
        self.round += 1;
        let due = self.config.schedule.is_due(self.round);

        let mut tasks = Vec::new();
        for smt in self.semantics.iter_mut().filter(|s| s.learnable) {
            let observed = dataset.get(smt.idx).map(Vec::as_slice).unwrap_or(&[]);
            smt.update_examples(observed);
            if due {
                if let Some(task) = smt.make_task(&mut self.rng) {
                    tasks.push(task);
                }
            }
        }

        let mut report = RoundReport { round: self.round, tasks: tasks.len(), ..RoundReport::default() };
        if tasks.is_empty() {
            info!("Round {}: no tasks", self.round);
            return self.finish(report);
        }
        for task in &tasks {
            debug!("{}", task);
        }

        let timeout = if tasks.iter().any(|t| t.arity() > 0) {
            self.config.long_timeout
        } else {
            self.config.short_timeout
        };
        if self.config.update_grammar {
            self.update_grammar();
        }
        if self.config.rescore_frontiers {
            self.rescore_frontiers(&tasks);
        }

        let current = requests(&tasks);
        if let Some(ex) = &self.exploration {
            if !ex.is_valid_for(&self.grammar, &current) {
                debug!("Dropping exploration samples from grammar v{}", ex.grammar_version);
                self.exploration = None;
            }
        }

        let search = SearchConfig {
            enumeration_timeout: timeout,
            iterations: self.config.iterations,
            maximum_frontier: self.config.maximum_frontier,
            feature_extractor: self.config.feature_extractor,
        };
        let result = match oracle.search(&self.grammar, &tasks, &search, self.exploration.as_ref()) {
            Ok(result) => result,
            Err(err) => {
                warn!("Round {}: oracle failed: {}", self.round, err);
                return self.finish(report);
            }
        };

        for (name, frontier) in &result.task_solutions {
            let (Some(idx), Some(best)) = (name.parse::<usize>().ok(), frontier.best_posterior()) else {
                continue;
            };
            let Some(smt) = self.semantics.get_mut(idx) else {
                warn!("Oracle returned a solution for unknown task {}", name);
                continue;
            };
            if smt.update_program(CachedProgram::new(best.program.clone())) {
                report.updated += 1;
            }
        }
        self.frontiers = result.all_frontiers;
        if result.exploration.is_some() {
            self.exploration = result.exploration;
        }

        report.merged = self.remove_equivalent_semantics();
        self.finish(report)
    }

    fn finish(&self, mut report: RoundReport) -> RoundReport {
        report.solved = self.semantics.iter().filter(|s| s.solved()).count();
        report.grammar_version = self.grammar.version();
        self.log_semantics();
        report
    }

    /// Promote solved binary programs into the grammar. Programs that agree
    /// with a canonical form on every confident example are replaced by it.
    /// Returns whether the grammar changed.
    pub fn update_grammar(&mut self) -> bool {
        let mut components = self.base_primitives.clone();
        let add = CachedProgram::new(self.config.canonical_add.clone());
        let minus0 = CachedProgram::new(self.config.canonical_minus0.clone());

        for smt in &self.semantics {
            if !smt.learnable || !smt.solved() || smt.arity != 2 {
                continue;
            }
            let Some(program) = smt.program().as_cached() else { continue; };
            let Some(expr) = program.expr() else { continue; };
            if !self.config.promotion_guard.permits(program.description()) {
                continue;
            }
            let promoted = if agrees(smt, &add) {
                self.config.canonical_add.clone()
            } else if agrees(smt, &minus0) {
                self.config.canonical_minus0.clone()
            } else {
                expr.clone()
            };
            components.push(Expr::invented(promoted));
        }

        let candidate = Grammar::uniform(components, self.grammar.version() + 1);
        if candidate == self.grammar {
            return false;
        }
        self.install_grammar(candidate);
        true
    }

    fn install_grammar(&mut self, grammar: Grammar) {
        info!("{}", grammar);
        self.grammar = grammar;
        self.frontiers.clear();
        self.exploration = None;
    }

    /// Clear one symbol of every pair whose programs are equivalent. The symbol
    /// with fewer confident examples loses; on a tie the later one. Pinned
    /// symbols are never cleared. Returns the number of symbols cleared.
    pub fn remove_equivalent_semantics(&mut self) -> usize {
        let mut cleared = 0;
        for i in 0..self.semantics.len() {
            for j in (i + 1)..self.semantics.len() {
                if self.semantics[i].program().is_null() {
                    break;
                }
                let (a, b) = (&self.semantics[i], &self.semantics[j]);
                if b.program().is_null() || !a.program().equivalent(b.program()) {
                    continue;
                }
                let loser = match (a.learnable, b.learnable) {
                    (false, false) => continue,
                    (false, true) => j,
                    (true, false) => i,
                    (true, true) if a.examples().len() < b.examples().len() => i,
                    (true, true) => j,
                };
                debug!(
                    "Symbol-{:02} and Symbol-{:02} share {}; clearing Symbol-{:02}",
                    i,
                    j,
                    a.program().description(),
                    loser
                );
                self.semantics[loser].clear();
                cleared += 1;
                if loser == i {
                    break;
                }
            }
        }
        cleared
    }

    /// Freeze every existing symbol and add a new few-shot learnable one of
    /// the given arity. Frozen programs with arguments become base components.
    /// Returns the new symbol's index.
    pub fn extend(&mut self, arity: usize) -> usize {
        for smt in self.semantics.iter_mut() {
            smt.freeze();
            let Some(expr) = smt.program().as_cached().and_then(|p| p.expr()) else { continue; };
            if expr.arity() > 0 {
                self.base_primitives.push(Expr::invented(expr.clone()));
            }
        }
        let idx = self.semantics.len();
        self.semantics
            .push(Semantics::new(idx, arity, self.config.semantics).with_fewshot(true));
        self.names.push(format!("symbol-{}", idx));

        let grammar = Grammar::uniform(self.base_primitives.clone(), self.grammar.version() + 1);
        if grammar != self.grammar {
            self.install_grammar(grammar);
        }
        idx
    }

    /// Re-score stored frontiers against the current tasks' examples. Entries
    /// that no longer explain the data are dropped, and tasks without a stored
    /// frontier get an empty one.
    pub fn rescore_frontiers(&mut self, tasks: &[Task]) {
        let penalty = Some(self.config.semantics.arity_penalty);
        for task in tasks {
            let frontier = self
                .frontiers
                .entry(task.name.clone())
                .or_insert_with(|| Frontier::empty(task));
            frontier.entries.retain_mut(|entry| {
                let program = CachedProgram::new(entry.program.clone());
                let s = score_with_penalty(&program, &task.examples, penalty);
                entry.log_likelihood = s.likelihood.ln();
                s.likelihood >= RESCORE_FLOOR
            });
        }
    }

    pub fn save(&self) -> Vec<SavedSemantics> {
        self.semantics.iter().map(Semantics::save).collect()
    }

    /// Restore from a saved model; `None` leaves the learner untouched.
    pub fn load(&mut self, model: Option<&[SavedSemantics]>) -> Result<()> {
        let Some(model) = model else {
            return Ok(());
        };
        if model.len() != self.semantics.len() {
            return Err(SemanticsError::ModelShape { expected: self.semantics.len(), found: model.len() });
        }
        for (smt, saved) in self.semantics.iter_mut().zip(model) {
            smt.load(saved)?;
        }
        Ok(())
    }

    fn log_semantics(&self) {
        let solved = self.semantics.iter().filter(|s| s.solved()).count();
        let learnable = self.semantics.iter().filter(|s| s.learnable).count();
        info!(
            "Round {}: Semantics: total {}, solved {}, learn {}",
            self.round,
            self.semantics.len(),
            solved,
            learnable
        );
        for (smt, name) in self.semantics.iter().zip(&self.names) {
            debug!(
                "Symbol-{:02} {:>8} {} {:.2} {}",
                smt.idx,
                name,
                if smt.solved() { "solved" } else { "      " },
                smt.likelihood(),
                smt.program()
            );
        }
    }
}

/// Whether `smt`'s program matches `canonical` on every confident example,
/// counting examples where the symbol's own output is missing as agreement.
fn agrees(smt: &Semantics, canonical: &CachedProgram) -> bool {
    let program: &Program = smt.program();
    smt.examples().iter().all(|ex| {
        let ours = program.evaluate(&ex.inputs);
        let theirs = canonical.evaluate(&ex.inputs);
        ours.is_missing() || ours == theirs
    })
}
