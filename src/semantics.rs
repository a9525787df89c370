//! Per-symbol semantics: noisy observation statistics, the confident example
//! set derived from them, and the currently accepted program.
use crate::error::Result;
use crate::learner::config::SemanticsConfig;
use crate::likelihood::{score, score_with_penalty};
use crate::program::{CachedProgram, Executable, Program};
use crate::task::Task;
use crate::types::Type;
use crate::value::{Example, Inputs, Value};
use log::debug;
use rand::distributions::WeightedIndex;
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Persisted form of one symbol.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SavedSemantics {
    pub idx: usize,
    pub solved: bool,
    pub likelihood: f64,
    pub arity: usize,
    pub program: Option<String>,
}

pub struct Semantics {
    pub idx: usize,
    pub arity: usize,
    pub learnable: bool,
    pub fewshot: bool,
    cache: BTreeMap<Inputs, BTreeMap<Value, f64>>,
    examples: Vec<Example>,
    correct: Option<Vec<bool>>,
    program: Program,
    gt_program: Option<CachedProgram>,
    likelihood: f64,
    solved: bool,
    config: SemanticsConfig,
}

impl Semantics {
    /// A learnable symbol with no program yet.
    pub fn new(idx: usize, arity: usize, config: SemanticsConfig) -> Self {
        Self {
            idx,
            arity,
            learnable: true,
            fewshot: false,
            cache: BTreeMap::new(),
            examples: Vec::new(),
            correct: None,
            program: Program::Null,
            gt_program: None,
            likelihood: 0.0,
            solved: false,
            config,
        }
    }

    /// A symbol pinned to its ground-truth program.
    pub fn pinned(idx: usize, program: CachedProgram, config: SemanticsConfig) -> Self {
        let mut smt = Self::new(idx, program.arity(), config);
        smt.learnable = false;
        smt.program = Program::Cached(program.clone());
        smt.gt_program = Some(program);
        smt.likelihood = 1.0;
        smt.solved = true;
        smt
    }

    pub fn with_ground_truth(mut self, gt: CachedProgram) -> Self {
        self.gt_program = Some(gt);
        self
    }

    pub fn with_fewshot(mut self, fewshot: bool) -> Self {
        self.fewshot = fewshot;
        self
    }

    /// Stop learning this symbol and trust its current program.
    pub fn freeze(&mut self) {
        self.learnable = false;
        self.likelihood = 1.0;
        self.check_solved();
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn ground_truth(&self) -> Option<&CachedProgram> {
        self.gt_program.as_ref()
    }

    pub fn likelihood(&self) -> f64 {
        self.likelihood
    }

    pub fn solved(&self) -> bool {
        self.solved
    }

    pub fn examples(&self) -> &[Example] {
        &self.examples
    }

    pub fn correct(&self) -> Option<&[bool]> {
        self.correct.as_deref()
    }

    pub fn config(&self) -> &SemanticsConfig {
        &self.config
    }

    /// Accumulated weight of `output` at `inputs`; 0 when never observed.
    pub fn weight(&self, inputs: &[Value], output: &Value) -> f64 {
        self.cache
            .get(inputs)
            .and_then(|ys| ys.get(output))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn n_observed_inputs(&self) -> usize {
        self.cache.len()
    }

    /// Fold one round of raw observations into the cache and rebuild the
    /// confident example set.
    pub fn update_examples(&mut self, raw: &[Example]) {
        let examples: Vec<&Example> = raw.iter().filter(|e| e.arity() == self.arity).collect();

        for ys in self.cache.values_mut() {
            for w in ys.values_mut() {
                *w *= self.config.decay;
            }
        }

        for ex in &examples {
            *self
                .cache
                .entry(ex.inputs.clone())
                .or_default()
                .entry(ex.output.clone())
                .or_insert(0.0) += 1.0;
        }

        let mut confident = Vec::new();
        for (x, ys) in &self.cache {
            let Some((y, w)) = majority(ys) else { continue; };
            let total: f64 = ys.values().sum();
            if w >= self.config.min_confidence && w / total > self.config.majority_share {
                confident.push(Example { inputs: x.clone(), output: y.clone() });
            }
        }
        self.examples = confident;

        if self.learnable {
            let s = score_with_penalty(&self.program, &self.examples, Some(self.config.arity_penalty));
            self.likelihood = s.likelihood;
            self.correct = s.correct;
        }
        self.check_solved();

        if let Some(gt) = &self.gt_program {
            let observed: Vec<Example> = examples.iter().map(|e| (*e).clone()).collect();
            let acc = score(gt, &observed, false).likelihood;
            let acc_conf = score(gt, &self.examples, false).likelihood;
            debug!(
                "Symbol-{:02}: arity: {}, examples (conf): {} ({}), accuracy (conf): {:.2} ({:.2})",
                self.idx,
                self.arity,
                observed.len(),
                self.examples.len(),
                acc * 100.0,
                acc_conf * 100.0
            );
        }
    }

    /// Offer a candidate program. Returns whether it replaced the current one.
    pub fn update_program(&mut self, candidate: CachedProgram) -> bool {
        if !self.learnable {
            return false;
        }
        let s = score_with_penalty(&candidate, &self.examples, Some(self.config.arity_penalty));
        let better = s.likelihood > self.likelihood;
        let shorter = s.likelihood == self.likelihood
            && candidate.to_string().len() < self.program.to_string().len();
        if !(better || shorter) {
            return false;
        }
        self.program = Program::Cached(candidate);
        self.likelihood = s.likelihood;
        self.correct = s.correct;
        self.check_solved();
        true
    }

    /// Unsolved -> Solved once the likelihood reaches the threshold. Only
    /// `clear` moves a symbol back to Unsolved.
    pub fn check_solved(&mut self) {
        if !self.learnable {
            self.solved = true;
            return;
        }
        if self.program.is_null() {
            self.solved = false;
            return;
        }
        if self.solved {
            return;
        }
        // Few-shot symbols use the same threshold.
        self.solved = self.likelihood >= self.config.solved_threshold;
    }

    /// Build a synthesis task from the confident examples, or `None` when the
    /// symbol has nothing to learn.
    pub fn make_task<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Task> {
        if self.examples.len() < self.config.min_task_examples || self.solved || !self.learnable {
            return None;
        }
        let data_type = match &self.examples.first()?.output {
            Value::Tuple(_) => Type::list(Type::Int),
            _ => Type::Int,
        };
        let request = Type::arrow(vec![data_type; self.arity + 1]);
        let max = self.config.max_task_examples;
        let examples = if self.examples.len() > max {
            self.subsample(max, rng)
        } else {
            self.examples.clone()
        };
        Some(Task::for_symbol(self.idx, request, examples))
    }

    /// Keep every currently-incorrect example, top up with correct ones.
    fn subsample<R: Rng + ?Sized>(&self, max: usize, rng: &mut R) -> Vec<Example> {
        let mut wrong: Vec<&Example> = Vec::new();
        let mut right: Vec<&Example> = Vec::new();
        for (i, ex) in self.examples.iter().enumerate() {
            let ok = self.correct.as_ref().and_then(|c| c.get(i)).copied().unwrap_or(false);
            if ok {
                right.push(ex);
            } else {
                wrong.push(ex);
            }
        }

        let mut picked: Vec<Example> = if wrong.len() >= max {
            wrong.choose_multiple(rng, max).map(|e| (*e).clone()).collect()
        } else {
            let need = max - wrong.len();
            let mut v: Vec<Example> = wrong.into_iter().cloned().collect();
            v.extend(right.choose_multiple(rng, need).map(|e| (*e).clone()));
            v
        };
        picked.shuffle(rng);
        picked
    }

    /// The symbol used as a function on concrete inputs. `Empty` arguments are
    /// dropped first. Falls back to sampling observed outputs by weight while
    /// the program is not yet trustworthy.
    pub fn apply<R: Rng + ?Sized>(&self, inputs: &[Value], rng: &mut R) -> Value {
        let inputs: Inputs = inputs.iter().filter(|v| !v.is_empty_marker()).cloned().collect();
        if self.likelihood > self.config.sample_threshold {
            return self.program.evaluate(&inputs);
        }
        let Some(ys) = self.cache.get(&inputs) else {
            return Value::Missing;
        };
        let (outputs, weights): (Vec<&Value>, Vec<f64>) = ys.iter().map(|(y, w)| (y, *w)).unzip();
        match WeightedIndex::new(&weights) {
            Ok(dist) => outputs[dist.sample(rng)].clone(),
            Err(_) => Value::Missing,
        }
    }

    /// Values observed at `position` that, with every other argument equal to
    /// `inputs`, produced an acceptable majority output. The empty value is
    /// included when substituting it at `position` also yields an acceptable
    /// output.
    pub fn solve<R: Rng + ?Sized>(
        &self,
        position: usize,
        inputs: &[Value],
        acceptable: &[Value],
        rng: &mut R,
    ) -> Vec<Value> {
        if inputs.len() != self.arity || position >= self.arity || acceptable.is_empty() {
            return Vec::new();
        }

        let mut candidates = Vec::new();
        for (xs, ys) in &self.cache {
            let Some((y, _)) = majority(ys) else { continue; };
            if acceptable.contains(y) && same_except(xs, inputs, position) {
                candidates.push(xs[position].clone());
            }
        }

        let mut probe: Vec<Value> = inputs.to_vec();
        let empty = match &acceptable[0] {
            Value::Tuple(_) => {
                probe[position] = Value::Tuple(Vec::new());
                Value::Tuple(Vec::new())
            }
            _ => {
                probe.remove(position);
                Value::Empty
            }
        };
        if acceptable.contains(&self.apply(&probe, rng)) {
            candidates.push(empty);
        }
        candidates
    }

    /// Forget everything learned for this symbol.
    pub fn clear(&mut self) {
        self.examples.clear();
        self.correct = None;
        self.program = Program::Null;
        self.solved = false;
        self.likelihood = 0.0;
        self.cache.clear();
    }

    pub fn save(&self) -> SavedSemantics {
        SavedSemantics {
            idx: self.idx,
            solved: self.solved,
            likelihood: self.likelihood,
            arity: self.arity,
            program: match &self.program {
                Program::Null => None,
                Program::Cached(p) => Some(p.description().to_string()),
            },
        }
    }

    /// Restore saved state. Pinned symbols keep their own program.
    pub fn load(&mut self, model: &SavedSemantics) -> Result<()> {
        self.idx = model.idx;
        self.solved = model.solved;
        self.likelihood = model.likelihood;
        self.arity = model.arity;
        if self.learnable {
            self.program = match &model.program {
                Some(text) => Program::Cached(CachedProgram::parse(text)?),
                None => Program::Null,
            };
        }
        Ok(())
    }
}

/// Highest-weight output; ties go to the smallest output.
fn majority(ys: &BTreeMap<Value, f64>) -> Option<(&Value, f64)> {
    let mut best: Option<(&Value, f64)> = None;
    for (y, w) in ys {
        match best {
            Some((_, bw)) if *w <= bw => {}
            _ => best = Some((y, *w)),
        }
    }
    best
}

fn same_except(a: &[Value], b: &[Value], pos: usize) -> bool {
    a.len() == b.len() && a.iter().zip(b).enumerate().all(|(j, (x, y))| j == pos || x == y)
}
