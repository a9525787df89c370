//! Reference oracle: bounded bottom-up enumeration with observational
//! equivalence pruning.
use crate::engine::{eval, EvalContext, Expr, RtValue};
use crate::engine::types::Env;
use crate::grammar::{Component, Grammar};
use crate::oracle::{
    requests, ExplorationSamples, Frontier, FrontierEntry, OracleError, SearchConfig, SearchResult,
    SynthesisOracle,
};
use crate::task::Task;
use crate::value::{Example, Value};
use log::debug;
use rustc_hash::FxHashSet;
use std::time::Instant;

/// Log-likelihood charged per example a program gets wrong.
const MISS_PENALTY: f64 = 100.0;

pub struct EnumerativeConfig {
    pub max_cost: usize,
    pub max_terms: usize,
    pub step_limit: usize,
}

impl Default for EnumerativeConfig {
    fn default() -> Self {
        Self {
            max_cost: 7,
            max_terms: 20_000,
            step_limit: 2_000,
        }
    }
}

/// Observed result of a term on one example.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum Sig {
    Int(i64),
    Bool(bool),
    List(Vec<i64>),
    Fail,
}

impl Sig {
    fn of(v: Result<RtValue, crate::engine::EvalError>) -> Option<Sig> {
        match v {
            Ok(RtValue::Int(i)) => Some(Sig::Int(i)),
            Ok(RtValue::Bool(b)) => Some(Sig::Bool(b)),
            Ok(RtValue::List(xs)) => Some(Sig::List(xs.to_vec())),
            // Unsaturated terms are never stored.
            Ok(RtValue::Closure { .. }) | Ok(RtValue::Partial { .. }) | Ok(RtValue::Recur(_)) => None,
            Ok(RtValue::Empty) | Err(_) => Some(Sig::Fail),
        }
    }

    fn matches(&self, v: &Value) -> bool {
        match (self, v) {
            (Sig::Int(a), Value::Int(b)) => a == b,
            (Sig::List(a), Value::Tuple(b)) => a == b,
            _ => false,
        }
    }
}

struct Term {
    expr: Expr,
    cost: usize,
    sig: Vec<Sig>,
}

/// Term bank for one task: every stored term is observationally distinct on
/// the task's inputs.
struct Bank<'a> {
    examples: &'a [Example],
    envs: Vec<Env>,
    terms: Vec<Term>,
    by_cost: Vec<Vec<usize>>,
    seen: FxHashSet<Vec<Sig>>,
    step_limit: usize,
}

impl<'a> Bank<'a> {
    fn new(examples: &'a [Example], max_cost: usize, step_limit: usize) -> Self {
        let envs = examples
            .iter()
            .map(|ex| {
                ex.inputs.iter().fold(Env::new(), |env, v| match RtValue::from_value(v) {
                    Ok(x) => env.bind(x),
                    Err(_) => env.bind(RtValue::Empty),
                })
            })
            .collect();
        Self {
            examples,
            envs,
            terms: Vec::new(),
            by_cost: vec![Vec::new(); max_cost + 1],
            seen: FxHashSet::default(),
            step_limit,
        }
    }

    fn signature(&self, expr: &Expr) -> Option<Vec<Sig>> {
        let mut sig = Vec::with_capacity(self.envs.len());
        for env in &self.envs {
            let mut ctx = EvalContext { step_limit: self.step_limit, ..EvalContext::default() };
            sig.push(Sig::of(eval(expr, env, &mut ctx))?);
        }
        Some(sig)
    }

    /// Store `expr` unless it always fails or behaves like a stored term.
    fn offer(&mut self, expr: Expr, cost: usize) -> Option<usize> {
        let sig = self.signature(&expr)?;
        if sig.iter().all(|s| *s == Sig::Fail) || self.seen.contains(&sig) {
            return None;
        }
        self.seen.insert(sig.clone());
        let id = self.terms.len();
        self.terms.push(Term { expr, cost, sig });
        self.by_cost[cost].push(id);
        Some(id)
    }

    fn hits(&self, id: usize) -> usize {
        self.terms[id]
            .sig
            .iter()
            .zip(self.examples)
            .filter(|(s, ex)| s.matches(&ex.output))
            .count()
    }
}

/// Cost tuples of `parts` positive entries summing to `total`.
fn compositions(total: usize, parts: usize) -> Vec<Vec<usize>> {
    let mut out = Vec::new();
    if parts == 0 {
        if total == 0 {
            out.push(Vec::new());
        }
        return out;
    }
    let mut stack: Vec<(Vec<usize>, usize)> = vec![(Vec::new(), total)];
    while let Some((prefix, left)) = stack.pop() {
        let slots = parts - prefix.len();
        if slots == 1 {
            if left >= 1 {
                let mut done = prefix;
                done.push(left);
                out.push(done);
            }
            continue;
        }
        for c in 1..=left.saturating_sub(slots - 1) {
            let mut next = prefix.clone();
            next.push(c);
            stack.push((next, left - c));
        }
    }
    out
}

#[derive(Default)]
pub struct EnumerativeOracle {
    pub config: EnumerativeConfig,
}

impl EnumerativeOracle {
    pub fn new(config: EnumerativeConfig) -> Self {
        Self { config }
    }

    fn solve_task(
        &self,
        grammar: &Grammar,
        task: &Task,
        seeds: &[Expr],
        maximum_frontier: usize,
        deadline: Instant,
    ) -> Frontier {
        let arity = task.arity();
        let mut bank = Bank::new(&task.examples, self.config.max_cost, self.config.step_limit);
        let mut frontier = Frontier::empty(task);

        // Reused programs are scored as-is, outside the bank.
        for seed in seeds.iter().filter(|e| e.arity() == arity) {
            let body = strip_lambdas(seed, arity);
            if let Some(id) = bank.offer(body, 1) {
                record_hit(&bank, id, arity, &mut frontier);
            }
        }

        let (leaves, ops): (Vec<&Component>, Vec<&Component>) = grammar
            .components()
            .iter()
            .filter(|c| c.is_first_order())
            .partition(|c| c.arity() == 0);

        for i in 0..arity {
            if let Some(id) = bank.offer(Expr::var(i), 1) {
                record_hit(&bank, id, arity, &mut frontier);
            }
        }
        for c in &leaves {
            if let Some(id) = bank.offer(c.expr.clone(), 1) {
                record_hit(&bank, id, arity, &mut frontier);
            }
        }

        'cost: for cost in 2..=self.config.max_cost {
            for op in &ops {
                for costs in compositions(cost - 1, op.arity()) {
                    let pools: Vec<Vec<usize>> = costs.iter().map(|c| bank.by_cost[*c].clone()).collect();
                    if pools.iter().any(|p| p.is_empty()) {
                        continue;
                    }
                    let mut odometer = vec![0usize; pools.len()];
                    loop {
                        if Instant::now() >= deadline || bank.terms.len() >= self.config.max_terms {
                            break 'cost;
                        }
                        let args = odometer
                            .iter()
                            .zip(&pools)
                            .map(|(i, pool)| bank.terms[pool[*i]].expr.clone());
                        let candidate = Expr::apply(op.expr.clone(), args);
                        if let Some(id) = bank.offer(candidate, cost) {
                            record_hit(&bank, id, arity, &mut frontier);
                        }

                        let mut k = 0;
                        while k < odometer.len() {
                            odometer[k] += 1;
                            if odometer[k] < pools[k].len() {
                                break;
                            }
                            odometer[k] = 0;
                            k += 1;
                        }
                        if k == odometer.len() {
                            break;
                        }
                    }
                }
            }
        }

        frontier.keep_best(maximum_frontier);
        debug!("{}: {} terms, {} candidates", task.name, bank.terms.len(), frontier.entries.len());
        frontier
    }
}

fn record_hit(bank: &Bank<'_>, id: usize, arity: usize, frontier: &mut Frontier) {
    let hits = bank.hits(id);
    if hits == 0 {
        return;
    }
    let term = &bank.terms[id];
    let misses = bank.examples.len() - hits;
    frontier.entries.push(FrontierEntry::new(
        Expr::lambdas(arity, term.expr.clone()),
        -(term.cost as f64),
        -(misses as f64) * MISS_PENALTY,
    ));
}

fn strip_lambdas(expr: &Expr, n: usize) -> Expr {
    let mut curr = expr;
    for _ in 0..n {
        match curr {
            Expr::Abstraction(body) => curr = body,
            _ => break,
        }
    }
    curr.clone()
}

impl SynthesisOracle for EnumerativeOracle {
    fn search(
        &mut self,
        grammar: &Grammar,
        tasks: &[Task],
        config: &SearchConfig,
        exploration: Option<&ExplorationSamples>,
    ) -> Result<SearchResult, OracleError> {
        let start = Instant::now();
        let seeds: &[Expr] = exploration.map(|e| e.programs.as_slice()).unwrap_or(&[]);
        let mut result = SearchResult::default();
        let mut found = Vec::new();

        for (k, task) in tasks.iter().enumerate() {
            let elapsed = start.elapsed();
            if elapsed >= config.enumeration_timeout {
                if k == 0 {
                    return Err(OracleError::Timeout);
                }
                result.all_frontiers.insert(task.name.clone(), Frontier::empty(task));
                continue;
            }
            let share = (config.enumeration_timeout - elapsed) / (tasks.len() - k) as u32;
            let frontier = self.solve_task(grammar, task, seeds, config.maximum_frontier, Instant::now() + share);
            if !frontier.is_empty() {
                found.extend(frontier.entries.iter().map(|e| e.program.clone()));
                result.task_solutions.insert(task.name.clone(), frontier.clone());
            }
            result.all_frontiers.insert(task.name.clone(), frontier);
        }

        result.exploration = Some(ExplorationSamples {
            grammar_version: grammar.version(),
            requests: requests(tasks),
            programs: found,
        });
        Ok(result)
    }
}
