use rand::prelude::*;
use rand::rngs::StdRng;
use semantics::learner::policy::EveryNth;
use semantics::learner::EnumerativeOracle;
use semantics::value::inputs;
use semantics::{CachedProgram, Example, Executable, Learner, LearnerConfig, SymbolSpec, Value, Vocabulary};
use std::fs::File;
use std::io::BufWriter;
use std::time::Duration;

const ROUNDS: u64 = 12;
const OBSERVATIONS: usize = 24;
const NOISE: f64 = 0.1;

fn int_fn<F>(arity: usize, f: F) -> CachedProgram
where
    F: Fn(&[i64]) -> i64 + 'static,
{
    CachedProgram::ground_truth(arity, move |xs| {
        let mut args = Vec::with_capacity(xs.len());
        for x in xs {
            match x {
                Value::Int(v) => args.push(*v),
                _ => return Ok(Value::Missing),
            }
        }
        Ok(Value::Int(f(&args)))
    })
}

fn vocabulary() -> Vocabulary {
    let mut vocab = Vocabulary::default();
    for digit in 0..5i64 {
        vocab.push(SymbolSpec::learnable(digit.to_string(), 0).with_ground_truth(int_fn(0, move |_| digit)));
    }
    vocab.push(SymbolSpec::learnable("double", 1).with_ground_truth(int_fn(1, |xs| xs[0] * 2)));
    vocab.push(SymbolSpec::learnable("plus", 2).with_ground_truth(int_fn(2, |xs| xs[0] + xs[1])));
    vocab.push(SymbolSpec::learnable("minus", 2).with_ground_truth(int_fn(2, |xs| (xs[0] - xs[1]).max(0))));
    vocab.push(SymbolSpec::pinned("succ", int_fn(1, |xs| xs[0] + 1)));
    vocab
}

/// One round of observations: ground truth outputs, a fraction replaced by noise.
fn observe(learner: &Learner, rng: &mut StdRng) -> Vec<Vec<Example>> {
    learner
        .semantics()
        .iter()
        .map(|smt| {
            let Some(gt) = smt.ground_truth() else { return Vec::new(); };
            (0..OBSERVATIONS)
                .map(|_| {
                    let xs = inputs((0..smt.arity).map(|_| rng.gen_range(0..10i64)));
                    let y = if rng.gen_bool(NOISE) {
                        Value::Int(rng.gen_range(0..20))
                    } else {
                        gt.evaluate(&xs)
                    };
                    Example::new(xs, y)
                })
                .collect()
        })
        .collect()
}

fn main() -> semantics::Result<()> {
    env_logger::init();
    let out = std::env::args().nth(1).unwrap_or_else(|| "semantics.json".to_string());

    let config = LearnerConfig {
        schedule: Box::new(EveryNth(2)),
        update_grammar: true,
        y_combinator: false,
        long_timeout: Duration::from_secs(3),
        short_timeout: Duration::from_secs(1),
        ..LearnerConfig::default()
    };
    let mut learner = Learner::new(vocabulary(), config);
    let mut oracle = EnumerativeOracle::default();
    let mut rng = StdRng::seed_from_u64(7);

    for _ in 0..ROUNDS {
        let dataset = observe(&learner, &mut rng);
        let report = learner.learn(&dataset, &mut oracle);
        println!(
            "round {:2}: tasks {}, updated {}, merged {}, solved {}/{}",
            report.round,
            report.tasks,
            report.updated,
            report.merged,
            report.solved,
            learner.semantics().len()
        );
    }

    for (smt, name) in learner.semantics().iter().zip(learner.names()) {
        println!("{:>8}: {:.2} {}", name, smt.likelihood(), smt.program());
    }

    let writer = BufWriter::new(File::create(&out)?);
    serde_json::to_writer_pretty(writer, &learner.save())?;
    println!("checkpoint written to {}", out);
    Ok(())
}
