use semantics::grammar::Grammar;
use semantics::learner::policy::{Always, EveryNth, PermitAll};
use semantics::learner::{EnumerativeConfig, EnumerativeOracle, LearnerConfig};
use semantics::oracle::{
    ExplorationSamples, Frontier, FrontierEntry, OracleError, SearchConfig, SearchResult, SynthesisOracle,
};
use semantics::parser::parse_program;
use semantics::task::Task;
use semantics::value::{inputs, Example};
use semantics::{CachedProgram, Executable, Learner, SemanticsError, SymbolSpec, Vocabulary};
use std::time::Duration;

/// Answers every task with a fixed program per task name and records what it saw.
#[derive(Default)]
struct ScriptedOracle {
    answers: Vec<(String, &'static str)>,
    calls: Vec<Vec<String>>,
    timeouts: Vec<Duration>,
    grammar_versions: Vec<u64>,
    saw_exploration: Vec<bool>,
    fail: bool,
}

impl ScriptedOracle {
    fn answering(answers: &[(usize, &'static str)]) -> Self {
        Self {
            answers: answers.iter().map(|(i, p)| (i.to_string(), *p)).collect(),
            ..Self::default()
        }
    }
}

impl SynthesisOracle for ScriptedOracle {
    fn search(
        &mut self,
        grammar: &Grammar,
        tasks: &[Task],
        config: &SearchConfig,
        exploration: Option<&ExplorationSamples>,
    ) -> Result<SearchResult, OracleError> {
        self.calls.push(tasks.iter().map(|t| t.name.clone()).collect());
        self.timeouts.push(config.enumeration_timeout);
        self.grammar_versions.push(grammar.version());
        self.saw_exploration.push(exploration.is_some());
        if self.fail {
            return Err(OracleError::Unavailable("scripted failure".into()));
        }
        let mut result = SearchResult::default();
        for task in tasks {
            let mut frontier = Frontier::empty(task);
            if let Some((_, text)) = self.answers.iter().find(|(name, _)| *name == task.name) {
                if let Ok(program) = parse_program(text) {
                    frontier.entries.push(FrontierEntry::new(program, -1.0, 0.0));
                }
            }
            if !frontier.is_empty() {
                result.task_solutions.insert(task.name.clone(), frontier.clone());
            }
            result.all_frontiers.insert(task.name.clone(), frontier);
        }
        result.exploration = Some(ExplorationSamples {
            grammar_version: grammar.version(),
            requests: semantics::oracle::requests(tasks),
            programs: Vec::new(),
        });
        Ok(result)
    }
}

fn every_round() -> LearnerConfig {
    LearnerConfig { schedule: Box::new(Always), ..LearnerConfig::default() }
}

fn unary_data(f: impl Fn(i64) -> i64) -> Vec<Example> {
    (0..12i64).map(|x| Example::new(inputs([x]), f(x))).collect()
}

fn binary_data(f: impl Fn(i64, i64) -> i64) -> Vec<Example> {
    let mut out = Vec::new();
    for x in 0..5i64 {
        for y in 0..5i64 {
            out.push(Example::new(inputs([x, y]), f(x, y)));
        }
    }
    out
}

fn pair_data() -> Vec<Example> {
    binary_data(|_, _| 0)
        .into_iter()
        .map(|ex| {
            let output = ex.inputs.iter().filter_map(|v| match v {
                semantics::Value::Int(i) => Some(*i),
                _ => None,
            });
            Example::new(ex.inputs.clone(), output.collect::<Vec<i64>>())
        })
        .collect()
}

#[test]
fn test_learn_accepts_oracle_programs() {
    let vocab = Vocabulary::new(vec![SymbolSpec::learnable("double", 1), SymbolSpec::learnable("succ", 1)]);
    let mut learner = Learner::new(vocab, every_round());
    let mut oracle = ScriptedOracle::answering(&[(0, "(lambda (* $0 2))"), (1, "(lambda (incr $0))")]);

    let dataset = vec![unary_data(|x| x * 2), unary_data(|x| x + 1)];
    let report = learner.learn(&dataset, &mut oracle);
    assert_eq!(report.round, 1);
    assert_eq!(report.tasks, 2);
    assert_eq!(report.updated, 2);
    assert_eq!(report.solved, 2);
    assert_eq!(oracle.timeouts, vec![Duration::from_secs(300)]);

    // Solved symbols produce no further tasks.
    let report = learner.learn(&dataset, &mut oracle);
    assert_eq!(report.tasks, 0);
    assert_eq!(oracle.calls.len(), 1);
}

#[test]
fn test_schedule_gates_the_oracle() {
    let vocab = Vocabulary::new(vec![SymbolSpec::learnable("double", 1)]);
    let config = LearnerConfig { schedule: Box::new(EveryNth(3)), ..LearnerConfig::default() };
    let mut learner = Learner::new(vocab, config);
    let mut oracle = ScriptedOracle::default();
    let dataset = vec![unary_data(|x| x * 2)];
    for _ in 0..6 {
        learner.learn(&dataset, &mut oracle);
    }
    assert_eq!(oracle.calls.len(), 2);
    assert_eq!(learner.round(), 6);
}

#[test]
fn test_constant_tasks_use_short_timeout() {
    let vocab = Vocabulary::new(vec![SymbolSpec::learnable("three", 0)]);
    let mut learner = Learner::new(vocab, every_round());
    let mut oracle = ScriptedOracle::answering(&[(0, "(incr (incr (incr 0)))")]);
    let dataset = vec![vec![Example::new(inputs(Vec::<i64>::new()), 3i64)]];
    let report = learner.learn(&dataset, &mut oracle);
    assert_eq!(oracle.timeouts, vec![Duration::from_secs(5)]);
    assert_eq!(report.updated, 1);
    assert_eq!(learner.semantics()[0].program().as_cached().map(|p| p.name()), Some("3".to_string()));
}

#[test]
fn test_oracle_failure_is_a_no_op_round() {
    let vocab = Vocabulary::new(vec![SymbolSpec::learnable("double", 1)]);
    let mut learner = Learner::new(vocab, every_round());
    let mut oracle = ScriptedOracle { fail: true, ..ScriptedOracle::default() };
    let report = learner.learn(&[unary_data(|x| x * 2)], &mut oracle);
    assert_eq!(report.tasks, 1);
    assert_eq!(report.updated, 0);
    assert!(learner.semantics()[0].program().is_null());
    assert_eq!(learner.semantics()[0].examples().len(), 12);
}

#[test]
fn test_equivalent_symbols_are_merged() {
    let vocab = Vocabulary::new(vec![SymbolSpec::learnable("a", 1), SymbolSpec::learnable("b", 1)]);
    let mut learner = Learner::new(vocab, every_round());
    let mut oracle = ScriptedOracle::answering(&[(0, "(lambda (incr $0))"), (1, "(lambda (incr $0))")]);

    let mut fewer = unary_data(|x| x + 1);
    fewer.truncate(11);
    let report = learner.learn(&[unary_data(|x| x + 1), fewer], &mut oracle);
    assert_eq!(report.merged, 1);

    let smts = learner.semantics();
    assert_eq!(smts[0].program().description(), "(lambda (incr $0))");
    assert!(smts[1].program().is_null());
    assert_eq!(smts[1].likelihood(), 0.0);
    assert!(!smts[1].solved());
}

#[test]
fn test_merge_tie_clears_later_symbol() {
    let vocab = Vocabulary::new(vec![SymbolSpec::learnable("a", 1), SymbolSpec::learnable("b", 1)]);
    let mut learner = Learner::new(vocab, every_round());
    let mut oracle = ScriptedOracle::answering(&[(0, "(lambda (incr $0))"), (1, "(lambda (incr $0))")]);
    learner.learn(&[unary_data(|x| x + 1), unary_data(|x| x + 1)], &mut oracle);
    assert!(!learner.semantics()[0].program().is_null());
    assert!(learner.semantics()[1].program().is_null());
}

#[test]
fn test_pinned_symbol_survives_merge() {
    let pinned = CachedProgram::parse("(lambda (incr $0))").unwrap();
    let vocab = Vocabulary::new(vec![SymbolSpec::pinned("succ", pinned), SymbolSpec::learnable("b", 1)]);
    let mut learner = Learner::new(vocab, every_round());
    let mut oracle = ScriptedOracle::answering(&[(1, "(lambda (incr $0))")]);
    let report = learner.learn(&[Vec::new(), unary_data(|x| x + 1)], &mut oracle);
    assert_eq!(report.merged, 1);
    assert!(learner.semantics()[0].solved());
    assert_eq!(learner.semantics()[0].program().description(), "(lambda (incr $0))");
    assert!(learner.semantics()[1].program().is_null());
}

#[test]
fn test_update_grammar_promotes_and_versions() {
    let vocab = Vocabulary::new(vec![SymbolSpec::learnable("pair", 2), SymbolSpec::learnable("plus", 2)]);
    let config = LearnerConfig { update_grammar: true, ..every_round() };
    let mut learner = Learner::new(vocab, config);
    let mut oracle = ScriptedOracle::answering(&[(0, "(lambda (lambda (cons $1 (cons $0 empty))))"), (1, "(lambda (lambda (+ $1 $0)))")]);

    let pairs = pair_data();
    let data = vec![pairs, binary_data(|x, y| x + y)];
    learner.learn(&data, &mut oracle);
    assert_eq!(learner.grammar().version(), 0);
    assert!(learner.semantics().iter().all(|s| s.solved()));

    assert!(learner.update_grammar());
    assert_eq!(learner.grammar().version(), 1);
    assert!(learner.grammar().contains("#(lambda (lambda (cons $1 (cons $0 empty))))"));
    // Raw arithmetic is kept out by the default guard.
    assert!(!learner.grammar().contains("#(lambda (lambda (+ $1 $0)))"));
    assert!(learner.frontiers().is_empty());
    assert!(learner.exploration().is_none());

    // Unchanged component set: no new version.
    assert!(!learner.update_grammar());
    assert_eq!(learner.grammar().version(), 1);
}

#[test]
fn test_update_grammar_substitutes_canonical_forms() {
    let vocab = Vocabulary::new(vec![SymbolSpec::learnable("plus", 2), SymbolSpec::learnable("monus", 2)]);
    let config = LearnerConfig { promotion_guard: Box::new(PermitAll), ..every_round() };
    let mut learner = Learner::new(vocab, config);
    let mut oracle = ScriptedOracle::answering(&[
        (0, "(lambda (lambda (+ $0 $1)))"),
        (1, "(lambda (lambda (if (gt? $0 $1) 0 (- $1 $0))))"),
    ]);
    learner.learn(&[binary_data(|x, y| x + y), binary_data(|x, y| (x - y).max(0))], &mut oracle);
    assert!(learner.semantics().iter().all(|s| s.solved()));

    assert!(learner.update_grammar());
    let invented: Vec<&str> = learner.grammar().invented().map(|c| c.description()).collect();
    assert_eq!(
        invented,
        vec![
            "#(lambda (lambda (+ $1 $0)))",
            "#(lambda (lambda (if (gt? $1 $0) (- $1 $0) 0)))",
        ]
    );
}

#[test]
fn test_list_program_is_not_replaced_by_add() {
    let vocab = Vocabulary::new(vec![SymbolSpec::learnable("prepend", 2)]);
    let config = LearnerConfig { promotion_guard: Box::new(PermitAll), ..every_round() };
    let mut learner = Learner::new(vocab, config);
    let mut oracle = ScriptedOracle::answering(&[(0, "(lambda (lambda (cons $1 $0)))")]);
    let mut data = Vec::new();
    for x in 0..5i64 {
        for y in 0..5i64 {
            let args = inputs([semantics::Value::Int(x), semantics::Value::Tuple(vec![y])]);
            data.push(Example::new(args, vec![x, y]));
        }
    }
    learner.learn(&[data], &mut oracle);
    assert!(learner.semantics()[0].solved());

    // `add` fails on every list input, which must not count as agreement.
    assert!(learner.update_grammar());
    let invented: Vec<&str> = learner.grammar().invented().map(|c| c.description()).collect();
    assert_eq!(invented, vec!["#(lambda (lambda (cons $1 $0)))"]);
}

#[test]
fn test_frontiers_hold_only_the_latest_search() {
    let vocab = Vocabulary::new(vec![SymbolSpec::learnable("double", 1), SymbolSpec::learnable("succ", 1)]);
    let mut learner = Learner::new(vocab, every_round());
    let mut oracle = ScriptedOracle::answering(&[(0, "(lambda (* $0 2))")]);
    let data = vec![unary_data(|x| x * 2), unary_data(|x| x + 1)];

    learner.learn(&data, &mut oracle);
    assert_eq!(learner.frontiers().keys().collect::<Vec<_>>(), vec!["0", "1"]);

    learner.learn(&data, &mut oracle);
    assert_eq!(oracle.calls.last(), Some(&vec!["1".to_string()]));
    assert_eq!(learner.frontiers().keys().collect::<Vec<_>>(), vec!["1"]);
}

#[test]
fn test_exploration_dropped_when_grammar_changes() {
    let vocab = Vocabulary::new(vec![SymbolSpec::learnable("double", 1), SymbolSpec::learnable("pair", 2)]);
    let mut learner = Learner::new(vocab, every_round());
    let mut oracle = ScriptedOracle::answering(&[(1, "(lambda (lambda (cons $1 (cons $0 empty))))")]);
    let pairs = pair_data();
    let data = vec![unary_data(|x| x * 2), pairs];

    learner.learn(&data, &mut oracle);
    assert!(learner.exploration().is_some());
    learner.learn(&data, &mut oracle);
    assert_eq!(oracle.saw_exploration, vec![false, false]);

    learner.learn(&data, &mut oracle);
    assert_eq!(oracle.saw_exploration, vec![false, false, true]);

    assert!(learner.update_grammar());
    learner.learn(&data, &mut oracle);
    assert_eq!(oracle.saw_exploration.last(), Some(&false));
    assert_eq!(oracle.grammar_versions.last(), Some(&1));
}

#[test]
fn test_extend_freezes_and_adds_fewshot_symbol() {
    let vocab = Vocabulary::new(vec![SymbolSpec::learnable("succ", 1)]);
    let mut learner = Learner::new(vocab, every_round());
    let mut oracle = ScriptedOracle::answering(&[(0, "(lambda (incr $0))")]);
    learner.learn(&[unary_data(|x| x + 1)], &mut oracle);

    let idx = learner.extend(2);
    assert_eq!(idx, 1);
    let smts = learner.semantics();
    assert!(!smts[0].learnable && smts[0].solved());
    assert_eq!(smts[0].likelihood(), 1.0);
    assert!(smts[1].learnable && smts[1].fewshot);
    assert_eq!(smts[1].arity, 2);
    assert!(learner.grammar().contains("#(lambda (incr $0))"));
    assert_eq!(learner.grammar().version(), 1);
}

#[test]
fn test_extend_trusts_frozen_programs() {
    let vocab = Vocabulary::new(vec![SymbolSpec::learnable("double", 1), SymbolSpec::learnable("idle", 1)]);
    let mut learner = Learner::new(vocab, every_round());
    let mut oracle = ScriptedOracle::answering(&[(0, "(lambda (incr $0))")]);
    learner.learn(&[unary_data(|x| x * 2)], &mut oracle);
    assert!(learner.semantics()[0].likelihood() < 0.95);

    learner.extend(1);
    for smt in &learner.semantics()[..2] {
        assert!(!smt.learnable && smt.solved());
        assert_eq!(smt.likelihood(), 1.0);
    }
}

#[test]
fn test_rescore_frontiers_drops_poor_entries() {
    let vocab = Vocabulary::new(vec![SymbolSpec::learnable("double", 1)]);
    let config = LearnerConfig { rescore_frontiers: true, ..every_round() };
    let mut learner = Learner::new(vocab, config);
    let mut oracle = ScriptedOracle::answering(&[(0, "(lambda (incr $0))")]);
    learner.learn(&[unary_data(|x| x * 2)], &mut oracle);
    assert_eq!(learner.frontiers()["0"].entries.len(), 1);

    let task = Task::for_symbol(0, semantics::types::Type::arrow(vec![semantics::types::Type::Int; 2]), unary_data(|x| x * 2));
    learner.rescore_frontiers(&[task.clone()]);
    assert!(learner.frontiers()["0"].is_empty());

    let fresh = Task::for_symbol(7, task.request.clone(), Vec::new());
    learner.rescore_frontiers(&[fresh]);
    assert!(learner.frontiers().contains_key("7"));
}

#[test]
fn test_save_load_round_trip() {
    let vocab = || Vocabulary::new(vec![SymbolSpec::learnable("double", 1), SymbolSpec::learnable("unused", 1)]);
    let mut learner = Learner::new(vocab(), every_round());
    let mut oracle = ScriptedOracle::answering(&[(0, "(lambda (* $0 2))")]);
    learner.learn(&[unary_data(|x| x * 2)], &mut oracle);

    let saved = learner.save();
    let json = serde_json::to_string(&saved).unwrap();
    let restored: Vec<semantics::SavedSemantics> = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, saved);
    assert_eq!(restored[1].program, None);

    let mut fresh = Learner::new(vocab(), every_round());
    fresh.load(Some(&restored)).unwrap();
    assert_eq!(fresh.semantics()[0].program().description(), "(lambda (* $0 2))");
    assert!(fresh.semantics()[0].solved());
    assert!(fresh.semantics()[1].program().is_null());

    fresh.load(None).unwrap();
    assert!(fresh.semantics()[0].solved());
}

#[test]
fn test_load_rejects_wrong_shape() {
    let mut learner = Learner::new(Vocabulary::new(vec![SymbolSpec::learnable("a", 1)]), every_round());
    let err = learner.load(Some(&[])).unwrap_err();
    assert!(matches!(err, SemanticsError::ModelShape { expected: 1, found: 0 }));
}

#[test]
fn test_load_keeps_pinned_programs() {
    let pinned = CachedProgram::parse("(lambda (incr $0))").unwrap();
    let mut learner = Learner::new(Vocabulary::new(vec![SymbolSpec::pinned("succ", pinned)]), every_round());
    let mut saved = learner.save();
    saved[0].program = Some("(lambda (decr $0))".into());
    learner.load(Some(&saved)).unwrap();
    assert_eq!(learner.semantics()[0].program().description(), "(lambda (incr $0))");
}

#[test]
fn test_enumerative_oracle_end_to_end() {
    let vocab = Vocabulary::new(vec![SymbolSpec::learnable("double", 1), SymbolSpec::learnable("two", 0)]);
    let config = LearnerConfig {
        long_timeout: Duration::from_secs(10),
        short_timeout: Duration::from_secs(10),
        y_combinator: false,
        ..every_round()
    };
    let mut learner = Learner::new(vocab, config);
    let mut oracle = EnumerativeOracle::new(EnumerativeConfig { max_cost: 4, ..EnumerativeConfig::default() });
    let data = vec![unary_data(|x| x * 2), vec![Example::new(inputs(Vec::<i64>::new()), 2i64)]];
    let report = learner.learn(&data, &mut oracle);
    assert_eq!(report.updated, 2);
    let double = &learner.semantics()[0];
    assert!(double.solved());
    assert_eq!(double.program().evaluate(&inputs([21i64])), semantics::Value::Int(42));
    assert_eq!(learner.semantics()[1].program().as_cached().and_then(|p| p.constant_value().cloned()), Some(semantics::Value::Int(2)));
}
